use super::*;

use std::time::Duration;

use crate::cache::FOLDER_CACHE_NAME;
use crate::config::Settings;
use crate::pool::ResourceClass;
use crate::testutil::{folder_cache, single_cache, survey_scans, write_file, FolderMember};

fn populated_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let scans: Vec<(i32, f32)> = survey_scans().into_iter().map(|(s, rt)| (s, rt as f32)).collect();
    let records = [(400.0, 10.0, 2), (401.0, 20.0, 3)];
    write_file(dir.path(), "run_a.rch", &single_cache(&scans, &records));
    write_file(dir.path(), "nested/run_b.RCH", &single_cache(&scans, &records));
    // same name in a deeper directory, the first registration wins
    write_file(dir.path(), "nested/deeper/run_a.rch", &single_cache(&scans, &records));

    let members = [
        FolderMember { id: 1, name: "pool_1", scans: survey_scans() },
        FolderMember { id: 2, name: "pool_2", scans: survey_scans() },
    ];
    let folder_records = [(400.0, 5.0, 2, 1), (400.5, 6.0, 2, 2)];
    write_file(
        dir.path(),
        &format!("batch/{FOLDER_CACHE_NAME}"),
        &folder_cache(&members, &folder_records),
    );

    // vendor directories are skipped entirely
    write_file(dir.path(), "agilent.d/inner.rch", &single_cache(&scans, &records));
    write_file(dir.path(), "notes.txt", b"not an acquisition");
    write_file(dir.path(), "broken.rch", b"garbage");
    dir
}

#[test]
fn test_init_registers_caches() {
    let dir = populated_root();
    let registry = Registry::init(Settings::with_roots([dir.path()])).unwrap();

    for name in ["run_a", "run_b", "pool_1", "pool_2", "broken"] {
        assert!(registry.resolve(name, true).is_some(), "{name}");
    }
    assert!(registry.resolve("inner", true).is_none());
    assert!(registry.resolve("run_a", false).is_none());
    assert_eq!(
        registry.resolve("run_a", true).unwrap().path(),
        dir.path().join("run_a.rch")
    );
}

#[test]
fn test_resolve_normalizes_to_stem() {
    let dir = populated_root();
    let registry = Registry::init(Settings::with_roots([dir.path()])).unwrap();
    assert!(registry.resolve("C:/data/run_a.raw", true).is_some());
    assert!(registry.resolve(" run_b ", true).is_some());
}

#[test]
fn test_missing_root_is_an_error() {
    let result = Registry::init(Settings::with_roots(["/nonexistent/mzrange-root"]));
    assert!(matches!(result, Err(RegistryError::MissingRoot(_))));
}

#[test]
fn test_cache_disabled_registers_nothing() {
    let dir = populated_root();
    let mut settings = Settings::with_roots([dir.path()]);
    settings.service.cache_enabled = false;
    let registry = Registry::init(settings).unwrap();
    assert_eq!(registry.counts(), (0, 0));
}

#[test]
fn test_broken_cache_fails_only_on_use() {
    let dir = populated_root();
    let registry = Registry::init(Settings::with_roots([dir.path()])).unwrap();
    let entry = registry.resolve("broken", true).unwrap();
    let result = registry.pool().with_source(&entry, |s| s.scan_from_rt(1.0));
    assert!(result.is_err());
    assert!(!entry.is_active());
}

#[test]
fn test_sweep_releases_unreferenced_folders() {
    let dir = populated_root();
    let mut settings = Settings::with_roots([dir.path()]);
    settings.service.idle_timeout_minutes = 0;
    let registry = Registry::init(settings).unwrap();

    let entry = registry.resolve("pool_1", true).unwrap();
    registry.pool().activate(&entry).unwrap();
    let store = Arc::clone(entry.folder().unwrap());
    assert!(store.is_loaded());

    // an open member keeps the indices
    assert_eq!(registry.sweep(), SweepReport { closed: 0, released: 0 });
    assert!(store.is_loaded());

    registry.pool().close(&entry);
    assert_eq!(registry.sweep().released, 1);
    assert!(!store.is_loaded());
}

#[test]
fn test_rescan_closes_everything() {
    let dir = populated_root();
    let registry = Registry::init(Settings::with_roots([dir.path()])).unwrap();
    let entry = registry.resolve("run_a", true).unwrap();
    registry.pool().activate(&entry).unwrap();
    assert_eq!(registry.pool().active_count(ResourceClass::Cache), 1);

    write_file(dir.path(), "late.rch", &single_cache(&[], &[]));
    let count = registry.rescan().unwrap();
    assert_eq!(count, 6);
    assert_eq!(registry.pool().active_count(ResourceClass::Cache), 0);
    assert!(!entry.is_active());
    assert!(registry.resolve("late", true).is_some());
}

#[test]
fn test_sweeper_thread_stops_on_drop() {
    let registry = Arc::new(Registry::new(Settings::default()));
    let sweeper = Sweeper::spawn(Arc::clone(&registry), Duration::from_millis(5)).unwrap();
    std::thread::sleep(Duration::from_millis(20));
    drop(sweeper);
    assert_eq!(Arc::strong_count(&registry), 1);
}

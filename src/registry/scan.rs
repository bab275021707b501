//! Directory discovery.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use super::RegistryError;
use crate::cache::{FolderIndexedStore, FOLDER_CACHE_NAME};
use crate::config::ServiceSettings;
use crate::pool::{Entry, EntrySource, ResourceClass};

/// Every acquisition known to the registry
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    pub(crate) raw: HashMap<String, Arc<Entry>>,
    pub(crate) cached: HashMap<String, Arc<Entry>>,
    pub(crate) folders: Vec<Arc<FolderIndexedStore>>,
}

impl Catalog {
    /// Insert an entry unless its name is taken; the first registration wins
    pub(crate) fn insert(&mut self, entry: Entry, cache: bool) -> bool {
        let map = if cache { &mut self.cached } else { &mut self.raw };
        if let Some(existing) = map.get(entry.name()) {
            warn!(
                "Duplicate acquisition name {}: keeping {}, ignoring {}",
                entry.name(),
                existing.path().display(),
                entry.path().display()
            );
            return false;
        }
        map.insert(entry.name().to_string(), Arc::new(entry));
        true
    }

    pub(crate) fn add_folder(&mut self, store: Arc<FolderIndexedStore>) -> usize {
        let mut added = 0;
        for record in store.files() {
            let entry = Entry::new(
                record.name.clone(),
                store.path(),
                ResourceClass::Cache,
                EntrySource::FolderMember(Arc::clone(&store)),
            );
            if self.insert(entry, true) {
                added += 1;
            }
        }
        self.folders.push(store);
        added
    }
}

/// Acquisition name of a path: its file stem
pub(crate) fn stem_of(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

/// Walk every root and build a catalog of what was found
pub(crate) fn scan_roots(settings: &ServiceSettings) -> Result<Catalog, RegistryError> {
    let mut catalog = Catalog::default();
    for root in &settings.roots {
        if !root.is_dir() {
            return Err(RegistryError::MissingRoot(root.clone()));
        }
        scan_root(root, settings, &mut catalog);
    }
    info!(
        "Registered {} raw and {} cached acquisitions ({} folder caches)",
        catalog.raw.len(),
        catalog.cached.len(),
        catalog.folders.len()
    );
    Ok(catalog)
}

fn scan_root(root: &Path, settings: &ServiceSettings, catalog: &mut Catalog) {
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let listing = match fs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Skipping unreadable directory {}: {e}", dir.display());
                continue;
            }
        };
        let mut children: Vec<PathBuf> = listing.filter_map(|e| e.ok().map(|e| e.path())).collect();
        // deterministic order so "first wins" is stable across scans
        children.sort();
        for path in children {
            if path.is_dir() {
                if has_extension(&path, "d") {
                    // Agilent and Bruker .d directories need a custom reader
                    debug!("Skipping unsupported vendor directory {}", path.display());
                } else {
                    stack.push(path);
                }
                continue;
            }
            register_file(&path, settings, catalog);
        }
    }
}

fn register_file(path: &Path, settings: &ServiceSettings, catalog: &mut Catalog) {
    let Some(name) = stem_of(path) else {
        return;
    };
    let is_folder_cache = path
        .file_name()
        .is_some_and(|f| f.to_string_lossy().eq_ignore_ascii_case(FOLDER_CACHE_NAME));

    if is_folder_cache {
        if !settings.cache_enabled {
            return;
        }
        match FolderIndexedStore::open(path) {
            Ok(store) => {
                catalog.add_folder(Arc::new(store));
            }
            Err(e) => warn!("Skipping folder cache {}: {e}", path.display()),
        }
    } else if has_extension(path, "rch") {
        if settings.cache_enabled {
            catalog.insert(
                Entry::new(name, path, ResourceClass::Cache, EntrySource::SingleCache),
                true,
            );
        }
    } else if has_extension(path, "mzml") {
        if settings.mzml_enabled {
            register_mzml(name, path, catalog);
        }
    } else if has_extension(path, "raw") && settings.thermo_enabled {
        register_thermo(name, path, catalog);
    }
}

#[cfg(feature = "mzml")]
fn register_mzml(name: String, path: &Path, catalog: &mut Catalog) {
    catalog.insert(
        Entry::new(name, path, ResourceClass::MzML, EntrySource::MzML),
        false,
    );
}

#[cfg(not(feature = "mzml"))]
fn register_mzml(_name: String, path: &Path, _catalog: &mut Catalog) {
    debug!("Skipping {}: built without mzML support", path.display());
}

#[cfg(feature = "thermo")]
fn register_thermo(name: String, path: &Path, catalog: &mut Catalog) {
    catalog.insert(
        Entry::new(name, path, ResourceClass::Thermo, EntrySource::Thermo),
        false,
    );
}

#[cfg(not(feature = "thermo"))]
fn register_thermo(_name: String, path: &Path, _catalog: &mut Catalog) {
    debug!("Skipping {}: built without Thermo support", path.display());
}

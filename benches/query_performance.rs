use std::path::Path;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mzrange::cache::{BinaryIndexedStore, FOLDER_CACHE_NAME};
use mzrange::config::Settings;
use mzrange::registry::Registry;
use mzrange::service::{BatchArgs, MsDataService};
use mzrange::source::{MsSource, Window};
use tempfile::TempDir;

const SCANS: i32 = 2000;

fn push_string(out: &mut Vec<u8>, s: &str) {
    // names stay under 128 bytes, one length byte
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
}

/// Deterministic peak masses spread over 200..1200
fn masses(count: usize) -> impl Iterator<Item = f64> {
    (0..count).map(|i| 200.0 + (i as f64 * 0.618_033_988_75).fract() * 1000.0)
}

/// Write an `RCH0` cache with `count` records over [`SCANS`] survey scans
fn create_single_cache(path: &Path, count: usize) {
    let mut records: Vec<(f64, f32, i32)> = masses(count)
        .enumerate()
        .map(|(i, mass)| (mass, (i % 1000) as f32 + 1.0, (i as i32 % SCANS) + 1))
        .collect();
    records.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut out = Vec::new();
    push_string(&mut out, "RCH0");
    out.extend_from_slice(&SCANS.to_le_bytes());
    for scan in 1..=SCANS {
        out.extend_from_slice(&scan.to_le_bytes());
        out.extend_from_slice(&(scan as f32 * 0.05).to_le_bytes());
    }
    let pages: Vec<_> = records.chunks(65536 / 16).collect();
    out.extend_from_slice(&(pages.len() as i32).to_le_bytes());
    for page in &pages {
        out.extend_from_slice(&page[0].0.to_le_bytes());
    }
    for (mass, intensity, scan) in &records {
        out.extend_from_slice(&mass.to_le_bytes());
        out.extend_from_slice(&intensity.to_le_bytes());
        out.extend_from_slice(&(*scan as f32).to_le_bytes());
    }
    std::fs::write(path, out).unwrap();
}

/// Write an `RCH1` folder cache with `members` acquisitions
fn create_folder_cache(path: &Path, members: i32, count: usize) {
    let mut records: Vec<(f64, f32, i32, i32)> = masses(count)
        .enumerate()
        .map(|(i, mass)| {
            let i = i as i32;
            (mass, (i % 1000) as f32 + 1.0, (i % SCANS) + 1, i % members + 1)
        })
        .collect();
    records.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut out = Vec::new();
    push_string(&mut out, "RCH1");
    out.extend_from_slice(&members.to_le_bytes());
    for id in 1..=members {
        out.extend_from_slice(&id.to_le_bytes());
        push_string(&mut out, &format!("run_{id:03}.raw"));
        out.extend_from_slice(&SCANS.to_le_bytes());
        for scan in 1..=SCANS {
            out.extend_from_slice(&scan.to_le_bytes());
            out.extend_from_slice(&(f64::from(scan) * 0.05).to_le_bytes());
        }
    }
    let pages: Vec<_> = records.chunks(64000 / 20).collect();
    out.extend_from_slice(&(pages.len() as i32).to_le_bytes());
    for page in &pages {
        out.extend_from_slice(&page[0].0.to_le_bytes());
    }
    for (mass, intensity, scan, id) in &records {
        out.extend_from_slice(&mass.to_le_bytes());
        out.extend_from_slice(&intensity.to_le_bytes());
        out.extend_from_slice(&scan.to_le_bytes());
        out.extend_from_slice(&id.to_le_bytes());
    }
    std::fs::write(path, out).unwrap();
}

/// Benchmark single-cache window queries of growing m/z width
fn bench_window_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_query");

    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("bench.rch");
    create_single_cache(&file_path, 2_000_000);

    for width in [0.02, 1.0, 50.0] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}Da")),
            &width,
            |b, &width| {
                let mut store = BinaryIndexedStore::open(&file_path).unwrap();
                let window = Window::new(600.0, 600.0 + width, 0.0, 100.0);

                b.iter(|| {
                    let points = store.points(black_box(window)).unwrap();
                    black_box(points);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark compacted chromatogram extraction
fn bench_chromatogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("chromatogram");

    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("bench.rch");
    create_single_cache(&file_path, 2_000_000);

    for rt_span in [1.0, 10.0, 100.0] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{rt_span}min")),
            &rt_span,
            |b, &rt_span| {
                let mut store = BinaryIndexedStore::open(&file_path).unwrap();
                let window = Window::new(445.10, 445.15, 0.0, rt_span);

                b.iter(|| {
                    let trace = store.trace(black_box(window)).unwrap();
                    black_box(trace);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark pooled folder batches against one query per item
fn bench_folder_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("folder_batch");

    let temp_dir = TempDir::new().unwrap();
    create_folder_cache(&temp_dir.path().join(FOLDER_CACHE_NAME), 20, 1_000_000);
    let registry = Arc::new(Registry::init(Settings::with_roots([temp_dir.path()])).unwrap());
    let service = MsDataService::with_registry(registry).unwrap();

    for items in [10usize, 100] {
        group.throughput(Throughput::Elements(items as u64));

        let names: Vec<String> = (0..items).map(|i| format!("run_{:03}", i % 20 + 1)).collect();
        let mz_low: Vec<f64> = (0..items).map(|i| 300.0 + i as f64 * 3.7).collect();
        let mz_high: Vec<f64> = mz_low.iter().map(|m| m + 0.05).collect();
        let rt_low = vec![0.0; items];
        let rt_high = vec![100.0; items];
        let args = BatchArgs {
            names: &names,
            mz_low: &mz_low,
            mz_high: &mz_high,
            rt_low: &rt_low,
            rt_high: &rt_high,
        };

        group.bench_with_input(BenchmarkId::new("pooled", items), &args, |b, args| {
            b.iter(|| black_box(service.chromatogram_array(*args, true).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("individual", items), &args, |b, args| {
            b.iter(|| {
                for i in 0..args.names.len() {
                    let window = Window::new(args.mz_low[i], args.mz_high[i], args.rt_low[i], args.rt_high[i]);
                    black_box(service.chromatogram(&args.names[i], window, true).unwrap());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_window_query,
    bench_chromatogram,
    bench_folder_batch,
);
criterion_main!(benches);

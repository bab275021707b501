//! # Binary Cache Module
//!
//! Read-side implementation of the two precomputed cache formats:
//!
//! - [`BinaryIndexedStore`]: one acquisition per file (`*.rch`)
//! - [`FolderIndexedStore`]: every acquisition of a folder in one
//!   `folder.cache`, served through per-acquisition [`FolderAcquisition`]
//!   handles and the pooled batch scan in [`FolderIndexedStore::run_pooled`]
//!
//! Both formats store centroided survey data sorted by mass in fixed-size
//! pages, with a page index of first masses that bounds every query to the
//! pages that can hold its m/z window.

pub mod codec;
pub mod compaction;
mod folder;
mod index;
mod pooled;
mod store;

pub use compaction::compact_chromatogram;
pub use folder::{FileRecord, FolderAcquisition, FolderIndexedStore, FOLDER_CACHE_NAME};
pub use index::{MassPageIndex, RtIndex};
pub use pooled::merge_intervals;
pub use store::{BinaryIndexedStore, CacheSummary};

use crate::source::{flatten_area, flatten_trace, DataPoint, SourceError, Window};

/// Compact a cache trace and flatten it as (rt, intensity) pairs
pub(crate) fn trace_output(mut points: Vec<DataPoint>, rt_index: &RtIndex, window: Window) -> Vec<f64> {
    compact_chromatogram(&mut points, rt_index, window.mid_mass(), true);
    flatten_trace(&points)
}

/// Flatten cache points as (mass, rt, intensity) triples
pub(crate) fn area_output(points: &[DataPoint]) -> Vec<f64> {
    flatten_area(points)
}

/// Retention time of a scan, provided the cache holds it.
///
/// Caches only index survey scans; a scan that does not map back to itself
/// through its own RT is an MS/MS scan the cache never stored.
pub(crate) fn survey_scan_rt(rt_index: &RtIndex, scan: i32) -> Result<f64, SourceError> {
    let rt = rt_index.rt_at_or_before(scan)?;
    if rt_index.scan_at_or_before(rt)? != scan {
        return Err(SourceError::unavailable(format!(
            "scan {scan} is not a survey scan; MS/MS spectra are not cached, query with cache disabled"
        )));
    }
    Ok(rt)
}

//! Pooled batch execution against a folder cache.
//!
//! Many acquisitions of one folder share the same mass-sorted pages, so a
//! batch of windows is answered with one page scan per merged m/z interval
//! instead of one scan per query. Each record is routed to every query of its
//! acquisition whose own bounds contain it.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use log::{debug, warn};

use super::codec::decode_folder_record;
use super::folder::{resolve_rts, FolderIndexedStore};
use super::index::RtIndex;
use super::{area_output, trace_output};
use crate::dispatch::{BatchQuery, QueryKind};
use crate::source::SourceError;

/// Sort intervals and merge every pair that overlaps or touches
pub fn merge_intervals<I>(intervals: I) -> Vec<(f64, f64)>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut sorted: Vec<(f64, f64)> = intervals.into_iter().filter(|(lo, hi)| lo <= hi).collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
    for (lo, hi) in sorted {
        match merged.last_mut() {
            Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

impl FolderIndexedStore {
    fn owns(&self, query: &BatchQuery) -> bool {
        query
            .folder()
            .is_some_and(|store| std::ptr::eq(Arc::as_ptr(store), self))
    }

    /// Answer every pending chromatogram or slice query that targets this
    /// folder with one scan per merged m/z interval.
    ///
    /// Completed queries get their result set; queries this path cannot serve
    /// (averaged spectra, other stores, missing RT data) are left pending for
    /// individual execution. Returns the number of queries completed.
    pub fn run_pooled(&self, queries: &mut [BatchQuery]) -> Result<usize, SourceError> {
        let mut selected = Vec::new();
        let mut rt_indices: HashMap<i32, Arc<RtIndex>> = HashMap::new();
        for (i, query) in queries.iter_mut().enumerate() {
            if query.completed || query.kind == QueryKind::Spectrum || !self.owns(query) {
                continue;
            }
            let member = query.entry().map(|entry| entry.name());
            let Some(file_id) = member.and_then(|name| self.record(name)).map(|r| r.file_id) else {
                continue;
            };
            let rt_index = match self.rt_index(file_id) {
                Ok(index) => index,
                Err(e) => {
                    debug!("Pooled scan skips {}: {e}", query.name());
                    continue;
                }
            };
            let scans = (
                rt_index.scan_at_or_before(query.window.rt_low),
                rt_index.scan_at_or_before(query.window.rt_high),
            );
            let (Ok(start), Ok(end)) = scans else {
                continue;
            };
            query.start_scan = start;
            query.end_scan = end;
            query.file_id = Some(file_id);
            query.points.clear();
            rt_indices.insert(file_id, rt_index);
            selected.push(i);
        }
        if selected.is_empty() {
            return Ok(0);
        }

        let intervals = merge_intervals(
            selected
                .iter()
                .map(|&i| (queries[i].window.mz_low, queries[i].window.mz_high)),
        );

        // (file id, query index) per interval, sorted by file id
        let mut groups: Vec<Vec<(i32, usize)>> = vec![Vec::new(); intervals.len()];
        for &i in &selected {
            let window = queries[i].window;
            let slot = intervals.partition_point(|iv| iv.1 < window.mz_low);
            if let (Some(group), Some(file_id)) = (groups.get_mut(slot), queries[i].file_id) {
                group.push((file_id, i));
            }
        }
        for group in &mut groups {
            group.sort_by_key(|&(file_id, _)| file_id);
        }

        if let Err(e) = self.scan_intervals(queries, &intervals, &groups) {
            warn!(
                "Pooled scan of {} failed, falling back to single queries: {e}",
                self.path().display()
            );
            for &i in &selected {
                queries[i].points.clear();
            }
            return Err(e);
        }

        for &i in &selected {
            let query = &mut queries[i];
            let Some(rt_index) = query.file_id.and_then(|id| rt_indices.get(&id)) else {
                continue;
            };
            let mut points = std::mem::take(&mut query.points);
            resolve_rts(&mut points, rt_index);
            let result = match query.kind {
                QueryKind::Chromatogram => trace_output(points, rt_index, query.window),
                _ => area_output(&points),
            };
            query.complete(result);
        }
        debug!(
            "Pooled scan of {} answered {} queries over {} intervals",
            self.path().display(),
            selected.len(),
            intervals.len()
        );
        Ok(selected.len())
    }

    fn scan_intervals(
        &self,
        queries: &mut [BatchQuery],
        intervals: &[(f64, f64)],
        groups: &[Vec<(i32, usize)>],
    ) -> Result<(), SourceError> {
        let loaded = self.loaded_mass_index()?;
        let region = self.region();
        let mut reader = BufReader::new(File::open(self.path())?);
        for (&(lo, hi), group) in intervals.iter().zip(groups) {
            let Some(pages) = loaded.pages.page_span(lo, hi) else {
                continue;
            };
            region.scan_pages(&mut reader, pages, |record| {
                let (point, file_id) = decode_folder_record(record);
                if point.mass < lo || point.mass > hi {
                    return;
                }
                let first = group.partition_point(|&(id, _)| id < file_id);
                for &(_, i) in group[first..].iter().take_while(|(id, _)| *id == file_id) {
                    let query = &mut queries[i];
                    if query.window.contains_mass(point.mass)
                        && point.scan >= query.start_scan
                        && point.scan <= query.end_scan
                    {
                        query.points.push(point);
                    }
                }
            })?;
        }
        Ok(())
    }
}

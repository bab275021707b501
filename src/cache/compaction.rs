//! Chromatogram compaction.
//!
//! Cache stores only hold non-zero signal, so a raw trace has gaps wherever a
//! survey scan saw nothing in the window. Compaction turns the scattered
//! points into a plottable trace:
//!
//! 1. one point per retention time, keeping the most intense
//! 2. zero points inserted at every indexed scan without signal, optionally
//!    with one extra zero on each side of the data
//! 3. interior zeros whose neighbours are both zero removed
//! 4. a doubled zero at either edge trimmed to one
//!
//! The result is idempotent: compacting a compacted trace changes nothing.

use super::index::RtIndex;
use crate::source::{sort_points, DataPoint};

/// Compact a chromatogram in place against the acquisition's RT index.
///
/// `fill_mass` is the mass given to inserted zero points; `boundary_zeros`
/// extends the fill by one indexed scan before the first and after the last
/// point.
pub fn compact_chromatogram(
    points: &mut Vec<DataPoint>,
    rt_index: &RtIndex,
    fill_mass: f64,
    boundary_zeros: bool,
) {
    sort_points(points);
    keep_most_intense_per_scan(points);
    if points.is_empty() {
        return;
    }

    let first = points.first().and_then(|p| rt_index.position(p.scan));
    let last = points.last().and_then(|p| rt_index.position(p.scan));
    if let (Some(mut start), Some(mut end)) = (first, last) {
        if boundary_zeros {
            start = start.saturating_sub(1);
            end = (end + 1).min(rt_index.len() - 1);
        }
        fill_missing_scans(points, rt_index, start, end, fill_mass);
    }

    collapse_zero_runs(points);
    trim_zero_edges(points);
}

fn keep_most_intense_per_scan(points: &mut Vec<DataPoint>) {
    points.dedup_by(|next, kept| {
        if next.scan != kept.scan {
            return false;
        }
        if next.intensity > kept.intensity {
            *kept = *next;
        }
        true
    });
}

fn fill_missing_scans(
    points: &mut Vec<DataPoint>,
    rt_index: &RtIndex,
    start: usize,
    end: usize,
    fill_mass: f64,
) {
    let data = std::mem::take(points);
    points.reserve(end + 1 - start);
    let mut next = data.into_iter().peekable();
    for pos in start..=end {
        let Some((scan, rt)) = rt_index.entry(pos) else {
            break;
        };
        while let Some(point) = next.next_if(|p| p.scan < scan) {
            points.push(point);
        }
        match next.next_if(|p| p.scan == scan) {
            Some(point) => points.push(point),
            None => points.push(DataPoint::zero(fill_mass, scan, rt)),
        }
    }
    points.extend(next);
}

/// Drop interior zero points whose neighbours are both zero, so every run
/// of zeros shrinks to its two ends.
pub fn collapse_zero_runs(points: &mut Vec<DataPoint>) {
    let n = points.len();
    if n < 3 {
        return;
    }
    let redundant: Vec<bool> = (0..n)
        .map(|i| {
            i > 0
                && i + 1 < n
                && points[i].is_zero()
                && points[i - 1].is_zero()
                && points[i + 1].is_zero()
        })
        .collect();
    let mut flags = redundant.into_iter();
    points.retain(|_| !flags.next().unwrap_or(false));
}

/// Trim a leading zero followed by a zero and a trailing zero preceded by one
pub fn trim_zero_edges(points: &mut Vec<DataPoint>) {
    if points.len() >= 2 && points[0].is_zero() && points[1].is_zero() {
        points.remove(0);
    }
    let n = points.len();
    if n >= 2 && points[n - 1].is_zero() && points[n - 2].is_zero() {
        points.pop();
    }
}

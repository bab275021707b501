//! In-memory indices loaded from cache headers.

use std::ops::RangeInclusive;

use crate::source::{Range, SourceError};

/// Scan number to retention time map of one acquisition, ordered by scan.
///
/// Cache files only index survey (MS1) scans, so every lookup here is
/// implicitly restricted to MS1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RtIndex {
    scans: Vec<i32>,
    rts: Vec<f64>,
}

impl RtIndex {
    /// Build an index from (scan, rt) pairs. Duplicate scans are rejected.
    pub fn from_pairs(mut pairs: Vec<(i32, f64)>) -> Result<Self, SourceError> {
        pairs.sort_by_key(|&(scan, _)| scan);
        if let Some(w) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(SourceError::parse(format!(
                "duplicate scan {} in RT index",
                w[0].0
            )));
        }
        let (scans, rts) = pairs.into_iter().unzip();
        Ok(Self { scans, rts })
    }

    /// Number of indexed scans
    pub fn len(&self) -> usize {
        self.scans.len()
    }

    /// Whether the index holds no scans
    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    /// Indexed scan numbers in ascending order
    pub fn scans(&self) -> &[i32] {
        &self.scans
    }

    /// (scan, rt) at a position
    pub fn entry(&self, pos: usize) -> Option<(i32, f64)> {
        Some((*self.scans.get(pos)?, *self.rts.get(pos)?))
    }

    /// Position of an exact scan number
    pub fn position(&self, scan: i32) -> Option<usize> {
        self.scans.binary_search(&scan).ok()
    }

    /// Retention time of an exact scan number
    pub fn rt_of(&self, scan: i32) -> Option<f64> {
        self.position(scan).map(|pos| self.rts[pos])
    }

    /// Retention time of the scan, or of the nearest indexed scan before it.
    /// Scans before the first indexed one resolve to the first.
    pub fn rt_at_or_before(&self, scan: i32) -> Result<f64, SourceError> {
        if self.is_empty() {
            return Err(SourceError::unavailable("RT index is empty"));
        }
        let pos = self
            .scans
            .partition_point(|&s| s <= scan)
            .saturating_sub(1);
        Ok(self.rts[pos])
    }

    /// Last scan whose retention time is at or before `rt`.
    ///
    /// Times past the end resolve to the last scan, times before the start to
    /// the first. Retention times are assumed non-decreasing in scan order.
    pub fn scan_at_or_before(&self, rt: f64) -> Result<i32, SourceError> {
        let (Some(&first), Some(&last)) = (self.rts.first(), self.rts.last()) else {
            return Err(SourceError::unavailable("RT index is empty"));
        };
        if rt > last {
            return Ok(self.scans[self.scans.len() - 1]);
        }
        if rt < first {
            return Ok(self.scans[0]);
        }
        let pos = self.rts.partition_point(|&v| v <= rt).saturating_sub(1);
        Ok(self.scans[pos])
    }

    /// Smallest and largest indexed retention time
    pub fn range(&self) -> Range {
        match (self.rts.first(), self.rts.last()) {
            (Some(&low), Some(&high)) => Range::new(low, high),
            _ => Range::default(),
        }
    }
}

/// First mass of every data page, non-decreasing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MassPageIndex {
    first_masses: Vec<f64>,
}

impl MassPageIndex {
    /// Wrap the page index read from a cache header
    pub fn new(first_masses: Vec<f64>) -> Self {
        Self { first_masses }
    }

    /// Number of pages
    pub fn len(&self) -> usize {
        self.first_masses.len()
    }

    /// Whether the index has no pages
    pub fn is_empty(&self) -> bool {
        self.first_masses.is_empty()
    }

    /// First mass of the first page
    pub fn first_mass(&self) -> Option<f64> {
        self.first_masses.first().copied()
    }

    /// Pages that may hold masses in `[mz_low, mz_high]`.
    ///
    /// Starts one page before the first index value `>= mz_low`, since that
    /// page may still end with matching masses, and ends at the last page
    /// whose first mass is `<= mz_high`. `None` for an empty index or an
    /// inverted interval.
    pub fn page_span(&self, mz_low: f64, mz_high: f64) -> Option<RangeInclusive<usize>> {
        if self.first_masses.is_empty() || mz_low > mz_high {
            return None;
        }
        let low = self
            .first_masses
            .partition_point(|&v| v < mz_low)
            .saturating_sub(1);
        let high = self
            .first_masses
            .partition_point(|&v| v <= mz_high)
            .saturating_sub(1);
        Some(low..=high.max(low))
    }
}

//! Scan bookkeeping and point extraction shared by the raw-format readers.

use std::collections::HashMap;

use super::{DataPoint, FragmentationEvent, Range, SourceError, Window};

/// Margin added around the m/z window of a profile scan when looking for its
/// trace intensity, so a peak straddling a narrow window can be interpolated.
pub const PROFILE_TRACE_MARGIN: f64 = 1.0;

/// Per-scan metadata of a raw acquisition
#[derive(Debug, Clone, PartialEq)]
pub struct ScanMeta {
    /// Native scan number
    pub scan: i32,
    /// Retention time in minutes
    pub rt: f64,
    /// MS level (1 for survey scans)
    pub ms_level: i32,
    /// Whether the scan holds profile data
    pub profile: bool,
    /// Selected precursor m/z of MS/MS scans
    pub precursor_mz: Option<f64>,
    /// Reader-specific description (native id, filter string)
    pub description: String,
}

impl ScanMeta {
    /// Whether this is a survey (MS1) scan
    pub fn is_survey(&self) -> bool {
        self.ms_level <= 1
    }
}

/// Scans of one acquisition ordered by retention time
#[derive(Debug, Clone, Default)]
pub struct ScanTable {
    scans: Vec<ScanMeta>,
    by_scan: HashMap<i32, usize>,
}

impl ScanTable {
    /// Build a table; scans are sorted by retention time (stable).
    pub fn new(mut scans: Vec<ScanMeta>) -> Self {
        scans.sort_by(|a, b| a.rt.total_cmp(&b.rt));
        let mut by_scan = HashMap::with_capacity(scans.len());
        for (pos, meta) in scans.iter().enumerate() {
            by_scan.entry(meta.scan).or_insert(pos);
        }
        Self { scans, by_scan }
    }

    /// Number of scans
    pub fn len(&self) -> usize {
        self.scans.len()
    }

    /// Whether the table has no scans
    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    /// Scan at an RT-ordered position
    pub fn get(&self, pos: usize) -> Option<&ScanMeta> {
        self.scans.get(pos)
    }

    /// All scans in RT order
    pub fn iter(&self) -> impl Iterator<Item = &ScanMeta> {
        self.scans.iter()
    }

    /// RT-ordered position of a scan number
    pub fn position(&self, scan: i32) -> Option<usize> {
        self.by_scan.get(&scan).copied()
    }

    /// Survey scan at or before a retention time.
    ///
    /// Before the first survey scan the first one is returned; an acquisition
    /// without survey scans has no answer.
    pub fn survey_scan_at_or_before(&self, rt: f64) -> Result<i32, SourceError> {
        let end = self.scans.partition_point(|m| m.rt <= rt);
        self.scans[..end]
            .iter()
            .rev()
            .chain(self.scans[end..].iter())
            .find(|m| m.is_survey())
            .map(|m| m.scan)
            .ok_or_else(|| SourceError::unavailable("acquisition holds no survey scans"))
    }

    /// Retention time of a scan number
    pub fn rt_of_scan(&self, scan: i32) -> Result<f64, SourceError> {
        self.position(scan)
            .map(|pos| self.scans[pos].rt)
            .ok_or_else(|| SourceError::unavailable(format!("scan {scan} does not exist")))
    }

    /// Positions of the survey scans inside an RT window
    pub fn survey_positions(&self, rt_low: f64, rt_high: f64) -> impl Iterator<Item = usize> + '_ {
        let start = self.scans.partition_point(|m| m.rt < rt_low);
        self.scans[start..]
            .iter()
            .take_while(move |m| m.rt <= rt_high)
            .enumerate()
            .filter(|(_, m)| m.is_survey())
            .map(move |(offset, _)| start + offset)
    }

    /// MS/MS scans inside the RT window whose precursor is inside the mass window
    pub fn fragmentation_events(&self, window: Window) -> Vec<FragmentationEvent> {
        self.scans
            .iter()
            .filter(|m| !m.is_survey() && window.contains_rt(m.rt))
            .filter_map(|m| {
                let parent_mz = m.precursor_mz?;
                window.contains_mass(parent_mz).then(|| FragmentationEvent {
                    rt: m.rt,
                    parent_mz,
                    scan: m.scan,
                    ms_order: m.ms_level,
                    description: m.description.clone(),
                })
            })
            .collect()
    }

    /// First and last retention time, zero when empty
    pub fn rt_range(&self) -> Range {
        match (self.scans.first(), self.scans.last()) {
            (Some(first), Some(last)) => Range::new(first.rt, last.rt),
            _ => Range::default(),
        }
    }

    /// Whether every survey scan holds profile data
    pub fn all_profile(&self) -> bool {
        self.scans.iter().filter(|m| m.is_survey()).all(|m| m.profile)
    }

    /// Whether every survey scan holds centroided data
    pub fn all_centroided(&self) -> bool {
        self.scans.iter().filter(|m| m.is_survey()).all(|m| !m.profile)
    }
}

/// Points of one spectrum whose m/z lies in `[mz_low, mz_high]`
pub fn spectrum_points(mz: &[f64], intensity: &[f64], mz_low: f64, mz_high: f64) -> Vec<DataPoint> {
    mz.iter()
        .zip(intensity)
        .filter(|(m, _)| **m >= mz_low && **m <= mz_high)
        .map(|(m, i)| DataPoint::new(*m, *i as f32, 0))
        .collect()
}

/// Trace intensity of one scan: the maximum inside the m/z window.
///
/// Profile scans are searched with [`PROFILE_TRACE_MARGIN`] on both sides;
/// when no sampled point falls inside the window but two neighbours bracket
/// it, the intensity is linearly interpolated at both bounds and the larger
/// value is taken.
pub fn window_max(mz: &[f64], intensity: &[f64], mz_low: f64, mz_high: f64, profile: bool) -> f64 {
    let margin = if profile { PROFILE_TRACE_MARGIN } else { 0.0 };
    let nearby: Vec<(f64, f64)> = mz
        .iter()
        .zip(intensity)
        .filter(|(m, _)| **m >= mz_low - margin && **m <= mz_high + margin)
        .map(|(m, i)| (*m, *i))
        .collect();

    let max = nearby
        .iter()
        .filter(|(m, _)| *m >= mz_low && *m <= mz_high)
        .fold(0.0f64, |acc, (_, i)| acc.max(*i));
    if max > 0.0 || !profile {
        return max;
    }

    nearby
        .windows(2)
        .find(|pair| pair[0].0 < mz_low && pair[1].0 > mz_high)
        .map(|pair| {
            let ((m0, i0), (m1, i1)) = (pair[0], pair[1]);
            let at = |m: f64| i0 + (i1 - i0) * ((m - m0) / (m1 - m0));
            at(mz_low).max(at(mz_high))
        })
        .unwrap_or(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(scan: i32, rt: f64, ms_level: i32, precursor_mz: Option<f64>) -> ScanMeta {
        ScanMeta {
            scan,
            rt,
            ms_level,
            profile: false,
            precursor_mz,
            description: format!("scan={scan}"),
        }
    }

    fn table() -> ScanTable {
        ScanTable::new(vec![
            meta(3, 1.5, 2, Some(450.0)),
            meta(1, 0.5, 1, None),
            meta(2, 1.0, 1, None),
            meta(4, 2.0, 2, Some(800.0)),
            meta(5, 2.5, 1, None),
        ])
    }

    #[test]
    fn test_table_is_rt_ordered() {
        let scans: Vec<i32> = table().iter().map(|m| m.scan).collect();
        assert_eq!(scans, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_survey_scan_walks_back_over_msms() {
        let table = table();
        assert_eq!(table.survey_scan_at_or_before(2.2).unwrap(), 2);
        assert_eq!(table.survey_scan_at_or_before(2.5).unwrap(), 5);
        assert_eq!(table.survey_scan_at_or_before(0.1).unwrap(), 1);
        assert_eq!(table.survey_scan_at_or_before(99.0).unwrap(), 5);
    }

    #[test]
    fn test_empty_table_has_no_survey_scan() {
        let table = ScanTable::default();
        assert!(table.survey_scan_at_or_before(1.0).is_err());
        assert_eq!(table.rt_range(), Range::default());
    }

    #[test]
    fn test_rt_of_unknown_scan() {
        let table = table();
        assert_eq!(table.rt_of_scan(4).unwrap(), 2.0);
        assert!(matches!(
            table.rt_of_scan(42),
            Err(SourceError::DataUnavailable(_))
        ));
    }

    #[test]
    fn test_survey_positions_skip_msms() {
        let table = table();
        let positions: Vec<usize> = table.survey_positions(0.9, 2.5).collect();
        assert_eq!(positions, vec![1, 4]);
    }

    #[test]
    fn test_fragmentation_events_filter_precursor() {
        let table = table();
        let events = table.fragmentation_events(Window::new(400.0, 500.0, 0.0, 10.0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].scan, 3);
        assert_eq!(events[0].ms_order, 2);
        assert_eq!(events[0].parent_mz, 450.0);
    }

    #[test]
    fn test_window_max_centroid() {
        let mz = [99.0, 100.0, 100.5, 102.0];
        let intensity = [50.0, 10.0, 30.0, 70.0];
        assert_eq!(window_max(&mz, &intensity, 100.0, 101.0, false), 30.0);
        assert_eq!(window_max(&mz, &intensity, 100.6, 101.0, false), 0.0);
    }

    #[test]
    fn test_window_max_interpolates_profile() {
        let mz = [100.0, 101.0];
        let intensity = [10.0, 20.0];
        let max = window_max(&mz, &intensity, 100.25, 100.5, true);
        assert!((max - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_spectrum_points_window() {
        let points = spectrum_points(&[1.0, 2.0, 3.0], &[5.0, 6.0, 7.0], 1.5, 3.0);
        let masses: Vec<f64> = points.iter().map(|p| p.mass).collect();
        assert_eq!(masses, vec![2.0, 3.0]);
    }
}

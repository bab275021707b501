use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;

use super::parser::{MzMLParser, ParsedRun};
use crate::cache::compaction::collapse_zero_runs;
use crate::source::average::averaged_spectrum;
use crate::source::raw::{spectrum_points, window_max, ScanMeta, ScanTable};
use crate::source::{
    flatten_spectrum, flatten_trace, DataPoint, FragmentationEvent, MsSource, Range, SourceError,
    Window,
};

/// Decoded arrays of one spectrum
#[derive(Debug, Clone, Default)]
struct Arrays {
    mz: Vec<f64>,
    intensity: Vec<f64>,
}

/// An mzML acquisition held in memory.
///
/// The document is parsed once at open; `arrays[i]` belongs to the scan at
/// RT-ordered position `i` of `scans`.
#[derive(Debug, Default)]
pub struct MzMLSource {
    name: String,
    scans: ScanTable,
    arrays: Vec<Arrays>,
    mass_range: Range,
}

impl MzMLSource {
    /// Open and parse an mzML file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let name = path.display().to_string();
        let source = Self::from_reader(BufReader::new(file), name)?;
        debug!(
            "Opened mzML {} with {} spectra",
            path.display(),
            source.scans.len()
        );
        Ok(source)
    }

    /// Parse an mzML document from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R, name: impl Into<String>) -> Result<Self, SourceError> {
        let run = MzMLParser::new(reader).parse()?;
        Ok(Self::from_run(run, name.into()))
    }

    fn from_run(run: ParsedRun, name: String) -> Self {
        let mut spectra = run.spectra;
        spectra.sort_by(|a, b| a.meta.rt.total_cmp(&b.meta.rt));

        let mut metas = Vec::with_capacity(spectra.len());
        let mut arrays = Vec::with_capacity(spectra.len());
        let (mut data_low, mut data_high) = (f64::INFINITY, f64::NEG_INFINITY);
        for spectrum in spectra {
            for &mz in &spectrum.mz {
                data_low = data_low.min(mz);
                data_high = data_high.max(mz);
            }
            metas.push(spectrum.meta);
            arrays.push(Arrays {
                mz: spectrum.mz,
                intensity: spectrum.intensity,
            });
        }

        // scan windows when declared, observed data otherwise
        let low = run.lowest_mass.unwrap_or(data_low);
        let high = run.highest_mass.unwrap_or(data_high);
        let mass_range = if low.is_finite() && high.is_finite() {
            Range::new(low, high)
        } else {
            Range::default()
        };

        Self {
            name,
            scans: ScanTable::new(metas),
            arrays,
            mass_range,
        }
    }

    /// Scan metadata in retention time order
    pub fn scans(&self) -> &ScanTable {
        &self.scans
    }

    fn check_representation(&self, meta: &ScanMeta, profile: bool) -> Result<(), SourceError> {
        match (meta.profile, profile) {
            (false, true) => Err(SourceError::unavailable(format!(
                "file {}: spectrum {} contains only centroided data",
                self.name, meta.scan
            ))),
            (true, false) => Err(SourceError::unavailable(format!(
                "file {}: spectrum {} contains only profile data",
                self.name, meta.scan
            ))),
            _ => Ok(()),
        }
    }

    fn scan_at(&self, pos: usize) -> Option<(&ScanMeta, &Arrays)> {
        Some((self.scans.get(pos)?, self.arrays.get(pos)?))
    }
}

impl MsSource for MzMLSource {
    fn trace(&mut self, window: Window) -> Result<Vec<f64>, SourceError> {
        let mid = window.mid_mass();
        let mut points: Vec<DataPoint> = self
            .scans
            .survey_positions(window.rt_low, window.rt_high)
            .filter_map(|pos| self.scan_at(pos))
            .map(|(meta, arrays)| {
                let max = window_max(
                    &arrays.mz,
                    &arrays.intensity,
                    window.mz_low,
                    window.mz_high,
                    meta.profile,
                );
                DataPoint {
                    mass: mid,
                    intensity: max as f32,
                    scan: meta.scan,
                    rt: meta.rt,
                }
            })
            .collect();
        collapse_zero_runs(&mut points);
        Ok(flatten_trace(&points))
    }

    fn spectrum(
        &mut self,
        mz_low: f64,
        mz_high: f64,
        scan: i32,
        profile: bool,
    ) -> Result<Vec<f64>, SourceError> {
        let (meta, arrays) = self
            .scans
            .position(scan)
            .and_then(|pos| self.scan_at(pos))
            .ok_or_else(|| {
                SourceError::unavailable(format!("file {}: scan {scan} does not exist", self.name))
            })?;
        self.check_representation(meta, profile)?;
        let points = spectrum_points(&arrays.mz, &arrays.intensity, mz_low, mz_high);
        Ok(flatten_spectrum(&points))
    }

    fn average_spectrum(&mut self, window: Window, profile: bool) -> Result<Vec<f64>, SourceError> {
        let positions: Vec<usize> = self
            .scans
            .survey_positions(window.rt_low, window.rt_high)
            .collect();
        let profile_data = self.scans.all_profile() && !positions.is_empty();
        let spectra = positions
            .iter()
            .filter_map(|&pos| self.arrays.get(pos))
            .map(|a| (a.mz.as_slice(), a.intensity.as_slice()));
        let points = averaged_spectrum(spectra, profile_data, profile, window.mz_low, window.mz_high)?;
        Ok(flatten_spectrum(&points))
    }

    fn area(&mut self, window: Window, profile: bool) -> Result<Vec<f64>, SourceError> {
        let mut out = Vec::new();
        for pos in self.scans.survey_positions(window.rt_low, window.rt_high) {
            let Some((meta, arrays)) = self.scan_at(pos) else {
                continue;
            };
            self.check_representation(meta, profile)?;
            for point in spectrum_points(&arrays.mz, &arrays.intensity, window.mz_low, window.mz_high) {
                out.push(point.mass);
                out.push(meta.rt);
                out.push(f64::from(point.intensity));
            }
        }
        Ok(out)
    }

    fn fragmentation_events(&mut self, window: Window) -> Result<Vec<FragmentationEvent>, SourceError> {
        Ok(self.scans.fragmentation_events(window))
    }

    fn scan_from_rt(&mut self, rt: f64) -> Result<i32, SourceError> {
        self.scans.survey_scan_at_or_before(rt)
    }

    fn rt_from_scan(&mut self, scan: i32) -> Result<f64, SourceError> {
        self.scans.rt_of_scan(scan)
    }

    fn mass_range(&self) -> Range {
        self.mass_range
    }

    fn rt_range(&self) -> Range {
        self.scans.rt_range()
    }

    fn close(&mut self) {
        self.scans = ScanTable::default();
        self.arrays = Vec::new();
    }
}

use std::path::Path;

use log::debug;
use thermorawfilereader::RawFileReader;

use super::ThermoError;
use crate::cache::compaction::collapse_zero_runs;
use crate::source::average::averaged_spectrum;
use crate::source::raw::{spectrum_points, window_max, ScanMeta, ScanTable};
use crate::source::{
    flatten_spectrum, flatten_trace, DataPoint, FragmentationEvent, MsSource, Range, SourceError,
    Window,
};

/// Check if the current platform supports Thermo RAW file reading.
fn check_platform_support() -> Result<(), ThermoError> {
    // Thermo's RawFileReader .NET assemblies only support x86/x86_64 architectures
    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    {
        return Err(ThermoError::PlatformNotSupported(format!(
            "Current architecture '{}' is not supported",
            std::env::consts::ARCH
        )));
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    Ok(())
}

/// A Thermo RAW acquisition.
///
/// Scan metadata is read once at open; peak data is fetched per query.
/// Native scan numbers are the reader's zero-based index plus one.
pub struct ThermoSource {
    name: String,
    reader: Option<RawFileReader>,
    scans: ScanTable,
    mass_range: Range,
}

impl ThermoSource {
    /// Open a RAW file and index its scans
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        check_platform_support()?;
        let path = path.as_ref();

        if !path.exists() {
            return Err(ThermoError::InvalidPath(format!(
                "File does not exist: {}",
                path.display()
            ))
            .into());
        }

        let mut reader = RawFileReader::open(path)
            .map_err(|e| ThermoError::OpenError(format!("{}: {}", path.display(), e)))?;
        reader.set_signal_loading(true);
        reader.set_centroid_spectra(true);

        let mut metas = Vec::with_capacity(reader.len());
        let (mut low, mut high) = (f64::INFINITY, f64::NEG_INFINITY);
        for idx in 0..reader.len() {
            let Some(spectrum) = reader.get(idx) else {
                debug!("Skipping spectrum {} of {} (read returned None)", idx + 1, path.display());
                continue;
            };
            let ms_level = spectrum.ms_level() as i32;
            if ms_level <= 1 {
                if let Some(data) = spectrum.data() {
                    for &mz in data.mz() {
                        low = low.min(mz);
                        high = high.max(mz);
                    }
                }
            }
            let precursor_mz = spectrum.precursor().map(|p| p.mz());
            metas.push(ScanMeta {
                scan: (spectrum.index() + 1) as i32,
                rt: spectrum.time(),
                ms_level,
                profile: false,
                precursor_mz,
                description: precursor_mz
                    .map(|mz| format!("Parent mass: {mz}"))
                    .unwrap_or_default(),
            });
        }

        let mass_range = if low.is_finite() {
            Range::new(low, high)
        } else {
            Range::default()
        };
        debug!("Opened RAW {} with {} scans", path.display(), metas.len());

        Ok(Self {
            name: path.display().to_string(),
            reader: Some(reader),
            scans: ScanTable::new(metas),
            mass_range,
        })
    }

    /// Centroided peaks of a scan as (m/z, intensity) arrays
    fn peaks(&self, scan: i32) -> Result<(Vec<f64>, Vec<f64>), SourceError> {
        let reader = self
            .reader
            .as_ref()
            .ok_or_else(|| SourceError::unavailable(format!("file {} is closed", self.name)))?;
        let spectrum = usize::try_from(scan - 1)
            .ok()
            .and_then(|idx| reader.get(idx))
            .ok_or_else(|| ThermoError::ReadError(format!("{} scan {scan}", self.name)))?;
        Ok(spectrum
            .data()
            .map(|data| {
                (
                    data.mz().to_vec(),
                    data.intensity().iter().map(|&x| x as f64).collect(),
                )
            })
            .unwrap_or_default())
    }

    fn reject_profile(&self, profile: bool) -> Result<(), SourceError> {
        if profile {
            return Err(SourceError::unavailable(format!(
                "profile data is not available for file {}",
                self.name
            )));
        }
        Ok(())
    }

    fn survey_scans(&self, window: Window) -> Vec<&ScanMeta> {
        self.scans
            .survey_positions(window.rt_low, window.rt_high)
            .filter_map(|pos| self.scans.get(pos))
            .collect()
    }
}

impl MsSource for ThermoSource {
    fn trace(&mut self, window: Window) -> Result<Vec<f64>, SourceError> {
        let mid = window.mid_mass();
        let mut points = Vec::new();
        for meta in self.survey_scans(window) {
            let (mz, intensity) = self.peaks(meta.scan)?;
            let max = window_max(&mz, &intensity, window.mz_low, window.mz_high, false);
            points.push(DataPoint {
                mass: mid,
                intensity: max as f32,
                scan: meta.scan,
                rt: meta.rt,
            });
        }
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
        self.reject_profile(profile)?;
        let (mz, intensity) = self.peaks(scan)?;
        Ok(flatten_spectrum(&spectrum_points(&mz, &intensity, mz_low, mz_high)))
    }

    fn average_spectrum(&mut self, window: Window, profile: bool) -> Result<Vec<f64>, SourceError> {
        let spectra = self
            .survey_scans(window)
            .into_iter()
            .map(|meta| self.peaks(meta.scan))
            .collect::<Result<Vec<_>, _>>()?;
        let points = averaged_spectrum(
            spectra.iter().map(|(mz, i)| (mz.as_slice(), i.as_slice())),
            false,
            profile,
            window.mz_low,
            window.mz_high,
        )?;
        Ok(flatten_spectrum(&points))
    }

    fn area(&mut self, window: Window, profile: bool) -> Result<Vec<f64>, SourceError> {
        self.reject_profile(profile)?;
        let mut out = Vec::new();
        for meta in self.survey_scans(window) {
            let (mz, intensity) = self.peaks(meta.scan)?;
            for point in spectrum_points(&mz, &intensity, window.mz_low, window.mz_high) {
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
        self.reader = None;
        self.scans = ScanTable::default();
    }
}

impl std::fmt::Debug for ThermoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThermoSource")
            .field("name", &self.name)
            .field("scans", &self.scans.len())
            .field("open", &self.reader.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_rejected() {
        let result = ThermoSource::open("/nonexistent/file.raw");
        assert!(result.is_err());
    }
}

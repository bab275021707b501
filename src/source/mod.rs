//! # Data Source Module
//!
//! The common query surface shared by every acquisition backend: the binary
//! cache stores ([`crate::cache`]) and the raw-format readers
//! ([`crate::mzml`], `crate::thermo`).
//!
//! All query operations return flat `Vec<f64>` arrays, the layout the service
//! boundary hands to callers:
//!
//! | Operation | Layout |
//! |-----------|--------|
//! | trace | (rt, intensity) pairs |
//! | spectrum / average spectrum | (mass, intensity) pairs |
//! | area | (mass, rt, intensity) triples |

pub mod average;
pub mod raw;
mod error;
mod types;

pub use error::SourceError;
pub use types::{
    flatten_area, flatten_spectrum, flatten_trace, sort_points, DataPoint, FragmentationEvent,
    Range,
};

/// Rectangular m/z × retention-time window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    /// Lower m/z bound (inclusive)
    pub mz_low: f64,
    /// Upper m/z bound (inclusive)
    pub mz_high: f64,
    /// Lower retention time bound in minutes (inclusive)
    pub rt_low: f64,
    /// Upper retention time bound in minutes (inclusive)
    pub rt_high: f64,
}

impl Window {
    /// Create a new window
    pub fn new(mz_low: f64, mz_high: f64, rt_low: f64, rt_high: f64) -> Self {
        Self {
            mz_low,
            mz_high,
            rt_low,
            rt_high,
        }
    }

    /// Midpoint of the mass bounds, used as the mass of zero-filled points
    pub fn mid_mass(&self) -> f64 {
        (self.mz_low + self.mz_high) / 2.0
    }

    /// Whether a mass lies inside the window's m/z bounds
    pub fn contains_mass(&self, mass: f64) -> bool {
        mass >= self.mz_low && mass <= self.mz_high
    }

    /// Whether a retention time lies inside the window's RT bounds
    pub fn contains_rt(&self, rt: f64) -> bool {
        rt >= self.rt_low && rt <= self.rt_high
    }
}

/// Query interface implemented by every acquisition backend.
///
/// Methods take `&mut self`: a handle is only ever used by one thread at a
/// time, serialized by the owning [`crate::pool::Entry`].
pub trait MsSource: Send {
    /// Chromatogram for the window as (rt, intensity) pairs
    fn trace(&mut self, window: Window) -> Result<Vec<f64>, SourceError>;

    /// Spectrum for one scan as (mass, intensity) pairs
    fn spectrum(
        &mut self,
        mz_low: f64,
        mz_high: f64,
        scan: i32,
        profile: bool,
    ) -> Result<Vec<f64>, SourceError>;

    /// Averaged spectrum over the window's RT bounds as (mass, intensity) pairs
    fn average_spectrum(&mut self, window: Window, profile: bool)
        -> Result<Vec<f64>, SourceError>;

    /// Every point in the window as (mass, rt, intensity) triples
    fn area(&mut self, window: Window, profile: bool) -> Result<Vec<f64>, SourceError>;

    /// Fragmentation events whose precursor falls inside the window
    fn fragmentation_events(
        &mut self,
        window: Window,
    ) -> Result<Vec<FragmentationEvent>, SourceError>;

    /// Nearest survey (MS1) scan at or before the retention time
    fn scan_from_rt(&mut self, rt: f64) -> Result<i32, SourceError>;

    /// Retention time of a scan
    fn rt_from_scan(&mut self, scan: i32) -> Result<f64, SourceError>;

    /// Full m/z range of the acquisition
    fn mass_range(&self) -> Range;

    /// Full retention time range of the acquisition
    fn rt_range(&self) -> Range;

    /// Release the underlying file handles and indices
    fn close(&mut self) {}
}

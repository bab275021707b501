//! # Query Service
//!
//! The transport-facing surface: every operation takes an acquisition name
//! plus plain numeric arguments and answers with flat arrays, or with an
//! error message that has already been logged.
//!
//! A request that asks for cache data together with profile data is served
//! from the raw file, since caches hold centroided survey data only.

use std::sync::Arc;

use log::{error, info};

use crate::config::Settings;
use crate::dispatch::{BatchRequest, BatchResponse, DispatchError, Dispatcher, QueryKind};
use crate::pool::Entry;
use crate::registry::{Registry, RegistryError, Sweeper};
use crate::source::{FragmentationEvent, MsSource, SourceError, Window};

/// Errors raised while starting the service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Directory scan or configuration failure
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Worker pool failure
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The sweeper thread could not be started
    #[error("Failed to start idle sweeper: {0}")]
    Sweeper(#[source] std::io::Error),
}

/// Range-query service over every registered acquisition
pub struct MsDataService {
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    sweeper: Option<Sweeper>,
}

impl MsDataService {
    /// Scan the configured roots and start the worker pool and, when an idle
    /// timeout is set, the background sweeper
    pub fn start(settings: Settings) -> Result<Self, ServiceError> {
        let registry = Arc::new(Registry::init(settings)?);
        let mut service = Self::with_registry(Arc::clone(&registry))?;
        if registry.settings().service.idle_timeout().is_some() {
            let interval = registry.settings().service.sweep_interval();
            service.sweeper =
                Some(Sweeper::spawn(Arc::clone(&registry), interval).map_err(ServiceError::Sweeper)?);
        }
        let (raw, cached) = registry.counts();
        info!("Service started: {raw} raw files, {cached} cached acquisitions");
        Ok(service)
    }

    /// Serve an existing registry without a sweeper
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self, ServiceError> {
        let dispatcher = Dispatcher::new(registry.settings().service.worker_threads)?;
        Ok(Self {
            registry,
            dispatcher,
            sweeper: None,
        })
    }

    /// The underlying registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    fn entry(&self, op: &str, name: &str, cache: bool) -> Result<Arc<Entry>, String> {
        self.registry.resolve(name, cache).ok_or_else(|| {
            let message = format!("{op} request: file {name} has not been found");
            error!("{message}");
            message
        })
    }

    /// Resolve `name` and run `f` on its handle, logging failures
    fn query<T, F>(&self, op: &str, name: &str, cache: bool, params: String, f: F) -> Result<T, String>
    where
        F: FnOnce(&mut dyn MsSource) -> Result<T, SourceError>,
    {
        let entry = self.entry(op, name, cache)?;
        self.registry.pool().with_source(&entry, f).map_err(|e| {
            let message = format!("{op} request failed for {name}: {e}; parameters: {params}");
            error!("{message}");
            message
        })
    }

    /// Chromatogram as (rt, intensity) pairs
    pub fn chromatogram(&self, name: &str, window: Window, cache: bool) -> Result<Vec<f64>, String> {
        self.query("Chromatogram", name, cache, describe(window), |s| s.trace(window))
    }

    /// Spectrum of one scan as (mass, intensity) pairs
    pub fn spectrum_by_scan(
        &self,
        name: &str,
        mz_low: f64,
        mz_high: f64,
        scan: i32,
        cache: bool,
        profile: bool,
    ) -> Result<Vec<f64>, String> {
        let params = format!("MZLow - {mz_low}, MZHigh - {mz_high}, Scan - {scan}");
        self.query("Spectrum", name, cache && !profile, params, |s| {
            s.spectrum(mz_low, mz_high, scan, profile)
        })
    }

    /// Spectrum of the survey scan at or before `rt`
    pub fn spectrum_by_rt(
        &self,
        name: &str,
        mz_low: f64,
        mz_high: f64,
        rt: f64,
        cache: bool,
        profile: bool,
    ) -> Result<Vec<f64>, String> {
        let params = format!("MZLow - {mz_low}, MZHigh - {mz_high}, RT - {rt}");
        self.query("Spectrum", name, cache && !profile, params, |s| {
            let scan = s.scan_from_rt(rt)?;
            s.spectrum(mz_low, mz_high, scan, profile)
        })
    }

    /// Survey scan number at or before a retention time
    pub fn scan_from_rt(&self, name: &str, rt: f64, cache: bool) -> Result<i32, String> {
        self.query("Scan number", name, cache, format!("RT - {rt}"), |s| s.scan_from_rt(rt))
    }

    /// Retention time of a scan
    pub fn rt_from_scan(&self, name: &str, scan: i32, cache: bool) -> Result<f64, String> {
        self.query("Retention time", name, cache, format!("Scan - {scan}"), |s| {
            s.rt_from_scan(scan)
        })
    }

    /// Averaged spectrum over an RT window. Raw files only.
    pub fn average_spectrum(&self, name: &str, window: Window, profile: bool) -> Result<Vec<f64>, String> {
        self.query("Average spectrum", name, false, describe(window), |s| {
            s.average_spectrum(window, profile)
        })
    }

    /// Every point of an LC-MS area as (mass, rt, intensity) triples
    pub fn area(&self, name: &str, window: Window, cache: bool, profile: bool) -> Result<Vec<f64>, String> {
        self.query("Area", name, cache && !profile, describe(window), |s| {
            s.area(window, profile)
        })
    }

    /// Fragmentation events inside an LC-MS area. Raw files only.
    pub fn fragmentation_events(&self, name: &str, window: Window) -> Result<Vec<FragmentationEvent>, String> {
        self.query("Fragmentation", name, false, describe(window), |s| {
            s.fragmentation_events(window)
        })
    }

    /// Full m/z range as `[low, high]`
    pub fn mz_range(&self, name: &str, cache: bool) -> Result<Vec<f64>, String> {
        self.query("Mass range", name, cache, String::new(), |s| Ok(s.mass_range().to_vec()))
    }

    /// Full retention time range as `[low, high]`
    pub fn rt_range(&self, name: &str, cache: bool) -> Result<Vec<f64>, String> {
        self.query("RT range", name, cache, String::new(), |s| Ok(s.rt_range().to_vec()))
    }

    /// Raw acquisitions matching a DOS wildcard mask
    pub fn file_list(&self, mask: &str) -> Vec<String> {
        self.registry.file_list(mask)
    }

    /// Close everything and rebuild the catalog
    pub fn rescan(&self) -> Result<usize, String> {
        self.registry.rescan().map_err(|e| {
            let message = format!("Rescan failed: {e}");
            error!("{message}");
            message
        })
    }

    /// Chromatograms for parallel arrays of names and windows
    pub fn chromatogram_array(&self, request: BatchArgs<'_>, cache: bool) -> Result<BatchResponse, String> {
        self.batch(request.into_request(QueryKind::Chromatogram, cache, false))
    }

    /// Averaged spectra for parallel arrays of names and windows. Never
    /// served from caches.
    pub fn spectrum_array(&self, request: BatchArgs<'_>, profile: bool) -> Result<BatchResponse, String> {
        self.batch(request.into_request(QueryKind::Spectrum, false, profile))
    }

    /// LC-MS areas for parallel arrays of names and windows
    pub fn area_array(
        &self,
        request: BatchArgs<'_>,
        cache: bool,
        profile: bool,
    ) -> Result<BatchResponse, String> {
        self.batch(request.into_request(QueryKind::Slice, cache, profile))
    }

    /// Run a prepared batch request
    pub fn batch(&self, request: BatchRequest) -> Result<BatchResponse, String> {
        self.dispatcher
            .run_batch(&self.registry, &request)
            .map_err(|e| {
                let message = format!("Batch {} request failed: {e}", request.kind);
                error!("{message}");
                message
            })
    }

    /// Stop the sweeper and close every handle
    pub fn shutdown(mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.stop();
        }
        self.registry.shutdown();
    }
}

/// Parallel argument arrays of a batch call
#[derive(Debug, Clone, Copy)]
pub struct BatchArgs<'a> {
    /// Acquisition names
    pub names: &'a [String],
    /// Lower m/z bounds
    pub mz_low: &'a [f64],
    /// Upper m/z bounds
    pub mz_high: &'a [f64],
    /// Lower RT bounds
    pub rt_low: &'a [f64],
    /// Upper RT bounds
    pub rt_high: &'a [f64],
}

impl BatchArgs<'_> {
    fn into_request(self, kind: QueryKind, cache: bool, profile: bool) -> BatchRequest {
        BatchRequest {
            names: self.names.to_vec(),
            mz_low: self.mz_low.to_vec(),
            mz_high: self.mz_high.to_vec(),
            rt_low: self.rt_low.to_vec(),
            rt_high: self.rt_high.to_vec(),
            kind,
            cache: cache && !profile,
            profile,
        }
    }
}

fn describe(window: Window) -> String {
    format!(
        "MZLow - {}, MZHigh - {}, RTLow - {}, RTHigh - {}",
        window.mz_low, window.mz_high, window.rt_low, window.rt_high
    )
}

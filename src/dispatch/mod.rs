//! # Batch Dispatcher
//!
//! Runs a batch of independent range queries:
//!
//! 1. every item is resolved to its [`Entry`] (unknown names fail that item
//!    only)
//! 2. cache queries that target a folder cache are answered by one pooled
//!    scan per folder ([`FolderIndexedStore::run_pooled`])
//! 3. everything left runs individually on the worker pool, each item under
//!    its entry's lock, and the call joins on all of them
//!
//! Results come back in input order with per-item errors.
//!
//! [`FolderIndexedStore::run_pooled`]: crate::cache::FolderIndexedStore::run_pooled

mod query;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

pub use query::{BatchQuery, QueryKind};

use crate::cache::FolderIndexedStore;
use crate::pool::{Entry, EntryPool};
use crate::registry::Registry;
use crate::source::{SourceError, Window};

/// Errors that fail a whole batch call
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The parallel request arrays differ in length
    #[error("Input arrays must have equal length (names: {names}, mz_low: {mz_low}, mz_high: {mz_high}, rt_low: {rt_low}, rt_high: {rt_high})")]
    LengthMismatch {
        /// Number of names
        names: usize,
        /// Number of lower m/z bounds
        mz_low: usize,
        /// Number of upper m/z bounds
        mz_high: usize,
        /// Number of lower RT bounds
        rt_low: usize,
        /// Number of upper RT bounds
        rt_high: usize,
    },

    /// The worker pool could not be built
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// A batch of queries as parallel arrays
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Acquisition names
    pub names: Vec<String>,
    /// Lower m/z bounds
    pub mz_low: Vec<f64>,
    /// Upper m/z bounds
    pub mz_high: Vec<f64>,
    /// Lower RT bounds (minutes)
    pub rt_low: Vec<f64>,
    /// Upper RT bounds (minutes)
    pub rt_high: Vec<f64>,
    /// Query kind for every item
    pub kind: QueryKind,
    /// Prefer cache stores over raw files
    #[serde(default)]
    pub cache: bool,
    /// Request profile data
    #[serde(default)]
    pub profile: bool,
}

impl BatchRequest {
    fn validate(&self) -> Result<(), DispatchError> {
        let n = self.names.len();
        if [
            self.mz_low.len(),
            self.mz_high.len(),
            self.rt_low.len(),
            self.rt_high.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(DispatchError::LengthMismatch {
                names: n,
                mz_low: self.mz_low.len(),
                mz_high: self.mz_high.len(),
                rt_low: self.rt_low.len(),
                rt_high: self.rt_high.len(),
            });
        }
        Ok(())
    }

    /// Whether cache stores serve this batch. Averaged spectra and profile
    /// data only exist in raw files.
    pub fn uses_cache(&self) -> bool {
        self.cache && !self.profile && self.kind != QueryKind::Spectrum
    }
}

/// Per-item outcome of a batch, in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResponse {
    /// Result array per item, `None` for failed items
    pub results: Vec<Option<Vec<f64>>>,
    /// Error per item, `None` for successful items
    pub errors: Vec<Option<String>>,
    /// Every item error, one per line; `None` when all items succeeded
    pub error: Option<String>,
}

impl BatchResponse {
    /// Number of failed items
    pub fn failed(&self) -> usize {
        self.errors.iter().filter(|e| e.is_some()).count()
    }
}

/// Bounded worker pool executing batches
pub struct Dispatcher {
    workers: rayon::ThreadPool,
}

impl Dispatcher {
    /// Create a dispatcher with `threads` workers (0 = one per logical CPU)
    pub fn new(threads: usize) -> Result<Self, DispatchError> {
        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("mzrange-worker-{i}"))
            .build()?;
        Ok(Self { workers })
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.workers.current_num_threads()
    }

    /// Run a batch against the registry's entries
    pub fn run_batch(
        &self,
        registry: &Registry,
        request: &BatchRequest,
    ) -> Result<BatchResponse, DispatchError> {
        request.validate()?;
        let cache = request.uses_cache();
        let pool = registry.pool();

        let mut queries: Vec<BatchQuery> = (0..request.names.len())
            .map(|i| {
                let name = request.names[i].as_str();
                let window = Window::new(
                    request.mz_low[i],
                    request.mz_high[i],
                    request.rt_low[i],
                    request.rt_high[i],
                );
                let entry = registry.resolve(name, cache);
                let mut query = BatchQuery::new(name, entry, window, request.kind, request.profile);
                if query.entry().is_none() {
                    let message = format!("Batch request: file {name} has not been found");
                    error!("{message}");
                    query.fail(message);
                }
                query
            })
            .collect();

        if cache {
            self.run_pooled(pool, &mut queries);
        }

        let pending = queries.iter().filter(|q| !q.is_completed()).count();
        debug!(
            "Running {pending} of {} {} queries individually",
            queries.len(),
            request.kind
        );
        self.workers.scope(|scope| {
            for query in queries.iter_mut().filter(|q| !q.is_completed()) {
                scope.spawn(move |_| execute(pool, query));
            }
        });

        let mut response = BatchResponse::default();
        let mut messages = String::new();
        for query in queries {
            let (result, error) = query.into_outcome();
            if let Some(message) = &error {
                messages.push_str(message);
                messages.push('\n');
            }
            response.results.push(result);
            response.errors.push(error);
        }
        response.error = (!messages.is_empty()).then_some(messages);
        Ok(response)
    }

    fn run_pooled(&self, pool: &EntryPool, queries: &mut [BatchQuery]) {
        let mut stores: Vec<Arc<FolderIndexedStore>> = Vec::new();
        for query in queries.iter() {
            let (Some(entry), Some(store)) = (query.entry(), query.folder()) else {
                continue;
            };
            // an open member keeps the folder's indices from being released
            if let Err(e) = pool.activate(entry) {
                warn!("Failed to activate {}: {e}", entry.name());
                continue;
            }
            if !stores.iter().any(|s| Arc::ptr_eq(s, store)) {
                stores.push(Arc::clone(store));
            }
        }
        for store in stores {
            if let Err(e) = store.run_pooled(queries) {
                warn!("Pooled query on {} failed: {e}", store.path().display());
            }
        }
    }
}

fn execute(pool: &EntryPool, query: &mut BatchQuery) {
    let Some(entry) = query.entry().cloned() else {
        return;
    };
    let (window, kind, profile) = (query.window, query.kind, query.profile);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        run_single(pool, &entry, window, kind, profile)
    }))
    .unwrap_or_else(|_| Err(SourceError::Generic("query panicked".into())));

    match outcome {
        Ok(result) => query.complete(result),
        Err(e) => {
            let message = format!(
                "Batch {kind} request failed for {}: {e}; parameters: {}",
                entry.name(),
                query.describe()
            );
            error!("{message}");
            query.fail(message);
        }
    }
}

fn run_single(
    pool: &EntryPool,
    entry: &Arc<Entry>,
    window: Window,
    kind: QueryKind,
    profile: bool,
) -> Result<Vec<f64>, SourceError> {
    pool.with_source(entry, |source| match kind {
        QueryKind::Chromatogram => source.trace(window),
        QueryKind::Spectrum => source.average_spectrum(window, profile),
        QueryKind::Slice => source.area(window, profile),
    })
}

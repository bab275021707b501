//! # Registry
//!
//! Process-wide state of the query service: the catalog of known
//! acquisitions (raw files and cache entries, keyed by name), the
//! [`EntryPool`] of open handles, and the folder stores whose shared indices
//! are released when none of their members is open.
//!
//! The catalog is rebuilt by [`Registry::rescan`]; lookups take a read lock
//! and never block on running queries.

mod mask;
mod scan;
mod sweeper;

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use log::info;
use serde::Serialize;

pub use mask::matches_mask;
pub use sweeper::Sweeper;

use crate::cache::FolderIndexedStore;
use crate::config::{ConfigError, Settings};
use crate::pool::{Entry, EntryPool};
use scan::{scan_roots, stem_of, Catalog};

/// Errors raised while building the registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A configured root directory does not exist
    #[error("Root directory not found: {0}")]
    MissingRoot(PathBuf),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Handles closed for being idle
    pub closed: usize,
    /// Folder stores whose indices were released
    pub released: usize,
}

/// Catalog of acquisitions plus the pool of their open handles
pub struct Registry {
    settings: Settings,
    pool: EntryPool,
    catalog: RwLock<Catalog>,
}

impl Registry {
    /// Create an empty registry; nothing is scanned
    pub fn new(settings: Settings) -> Self {
        let pool = EntryPool::new(&settings.limits);
        Self {
            settings,
            pool,
            catalog: RwLock::new(Catalog::default()),
        }
    }

    /// Create a registry and scan every configured root
    pub fn init(settings: Settings) -> Result<Self, RegistryError> {
        let registry = Self::new(settings);
        registry.rescan()?;
        Ok(registry)
    }

    /// Create a registry from a TOML configuration file
    pub fn from_config_file(path: &Path) -> Result<Self, RegistryError> {
        Self::init(Settings::from_file(path)?)
    }

    /// Active settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Pool of open handles
    pub fn pool(&self) -> &EntryPool {
        &self.pool
    }

    fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Close every handle, release folder indices and rebuild the catalog.
    /// Returns the number of registered acquisitions.
    pub fn rescan(&self) -> Result<usize, RegistryError> {
        let fresh = scan_roots(&self.settings.service)?;
        let count = fresh.raw.len() + fresh.cached.len();
        let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        self.pool.close_all();
        for store in &catalog.folders {
            store.deactivate();
        }
        *catalog = fresh;
        Ok(count)
    }

    /// Register an entry by hand. Returns `false` if the name is taken.
    pub fn register(&self, entry: Entry, cache: bool) -> bool {
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry, cache)
    }

    /// Register a folder store and one cache entry per member. Returns the
    /// number of members added.
    pub fn register_folder(&self, store: Arc<FolderIndexedStore>) -> usize {
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add_folder(store)
    }

    /// Look up an acquisition. `name` may be a bare name, a file name, or a
    /// path; only its file stem is used.
    pub fn resolve(&self, name: &str, cache: bool) -> Option<Arc<Entry>> {
        let key = stem_of(Path::new(name.trim()))?;
        let catalog = self.read();
        let map = if cache { &catalog.cached } else { &catalog.raw };
        map.get(&key).cloned()
    }

    /// Names of raw acquisitions matching a DOS wildcard mask, sorted
    pub fn file_list(&self, mask: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .read()
            .raw
            .keys()
            .filter(|name| matches_mask(mask, name))
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Number of registered (raw, cached) acquisitions
    pub fn counts(&self) -> (usize, usize) {
        let catalog = self.read();
        (catalog.raw.len(), catalog.cached.len())
    }

    /// Close idle handles and release folder stores with no open member
    pub fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        if let Some(timeout) = self.settings.service.idle_timeout() {
            report.closed = self.pool.close_idle(timeout);
        }
        report.released = self.release_unreferenced_folders();
        if report.closed > 0 || report.released > 0 {
            info!(
                "Sweep closed {} idle handles, released {} folder caches",
                report.closed, report.released
            );
        }
        report
    }

    /// Release the shared indices of every folder store with no open member
    pub fn release_unreferenced_folders(&self) -> usize {
        let active = self.pool.active_folders();
        let catalog = self.read();
        let mut released = 0;
        for store in &catalog.folders {
            if store.is_loaded() && !active.iter().any(|a| Arc::ptr_eq(a, store)) {
                store.deactivate();
                released += 1;
            }
        }
        released
    }

    /// Close every handle and release every folder store
    pub fn shutdown(&self) {
        self.pool.close_all();
        for store in &self.read().folders {
            store.deactivate();
        }
        info!("Registry shut down");
    }
}

#[cfg(test)]
mod tests;

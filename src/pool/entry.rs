use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::cache::{BinaryIndexedStore, FolderIndexedStore};
use crate::source::{MsSource, SourceError};

use super::ResourceClass;

/// Opener for sources that are not one of the built-in formats
pub type OpenFn = dyn Fn(&Path) -> Result<Box<dyn MsSource>, SourceError> + Send + Sync;

/// How an entry's handle is opened
#[derive(Clone)]
pub enum EntrySource {
    /// Single-acquisition cache file
    SingleCache,
    /// Acquisition inside a shared folder cache
    FolderMember(Arc<FolderIndexedStore>),
    /// mzML file
    #[cfg(feature = "mzml")]
    MzML,
    /// Thermo RAW file
    #[cfg(feature = "thermo")]
    Thermo,
    /// Caller-provided opener
    Custom(Arc<OpenFn>),
}

impl fmt::Debug for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntrySource::SingleCache => f.write_str("SingleCache"),
            EntrySource::FolderMember(store) => {
                write!(f, "FolderMember({})", store.path().display())
            }
            #[cfg(feature = "mzml")]
            EntrySource::MzML => f.write_str("MzML"),
            #[cfg(feature = "thermo")]
            EntrySource::Thermo => f.write_str("Thermo"),
            EntrySource::Custom(_) => f.write_str("Custom"),
        }
    }
}

pub(crate) type Handle = Option<Box<dyn MsSource>>;

/// A registered acquisition: its location, its class, and the lazily opened
/// query handle.
///
/// The handle mutex is the per-entry lock: every query runs while holding it,
/// so one handle never serves two threads at once.
pub struct Entry {
    name: String,
    path: PathBuf,
    class: ResourceClass,
    source: EntrySource,
    last_used: Mutex<Instant>,
    handle: Mutex<Handle>,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("class", &self.class)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Entry {
    /// Create an inactive entry
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        class: ResourceClass,
        source: EntrySource,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            class,
            source,
            last_used: Mutex::new(Instant::now()),
            handle: Mutex::new(None),
        }
    }

    /// Acquisition name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location on disk (the folder cache file for folder members)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resource class the entry is capped under
    pub fn class(&self) -> ResourceClass {
        self.class
    }

    /// Folder store backing this entry, if it is a folder member
    pub fn folder(&self) -> Option<&Arc<FolderIndexedStore>> {
        match &self.source {
            EntrySource::FolderMember(store) => Some(store),
            _ => None,
        }
    }

    /// Whether the handle is currently open. Blocks while a query runs.
    pub fn is_active(&self) -> bool {
        self.lock_handle().is_some()
    }

    /// Time since the entry was last used
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_used())
    }

    pub(crate) fn last_used(&self) -> Instant {
        *self.last_used.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub(crate) fn lock_handle(&self) -> MutexGuard<'_, Handle> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn open_source(&self) -> Result<Box<dyn MsSource>, SourceError> {
        let source: Box<dyn MsSource> = match &self.source {
            EntrySource::SingleCache => Box::new(BinaryIndexedStore::open(&self.path)?),
            EntrySource::FolderMember(store) => Box::new(store.open_acquisition(&self.name)?),
            #[cfg(feature = "mzml")]
            EntrySource::MzML => Box::new(crate::mzml::MzMLSource::open(&self.path)?),
            #[cfg(feature = "thermo")]
            EntrySource::Thermo => Box::new(crate::thermo::ThermoSource::open(&self.path)?),
            EntrySource::Custom(open) => open(&self.path)?,
        };
        Ok(source)
    }
}

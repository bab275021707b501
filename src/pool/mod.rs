//! # Entry Pool
//!
//! Bounded set of open acquisition handles.
//!
//! Every [`Entry`] belongs to a [`ResourceClass`] with its own cap on
//! simultaneously open handles (0 = unlimited). Opening past the cap closes
//! the least recently used handle of the class first; the sweeper closes
//! handles idle for longer than the configured timeout.
//!
//! ## Locking
//!
//! Two levels of mutex, always taken class first, then entry:
//!
//! - the class lock guards the class's active list and every open/close
//!   transition of its entries
//! - the entry lock guards the handle itself and is held for the duration of
//!   each query
//!
//! A query on an already open handle only takes the entry lock.

mod entry;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::{Deserialize, Serialize};

pub use entry::{Entry, EntrySource, OpenFn};

use crate::cache::FolderIndexedStore;
use crate::config::LimitSettings;
use crate::source::{MsSource, SourceError};

/// Class of resource a handle consumes, each capped separately
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    /// Thermo RAW reader instances
    Thermo,
    /// Parsed mzML files
    MzML,
    /// Cache store handles
    Cache,
}

impl ResourceClass {
    /// Every class, in sweep order
    pub const ALL: [ResourceClass; 3] = [ResourceClass::Thermo, ResourceClass::MzML, ResourceClass::Cache];

    fn slot(self) -> usize {
        match self {
            ResourceClass::Thermo => 0,
            ResourceClass::MzML => 1,
            ResourceClass::Cache => 2,
        }
    }
}

struct ClassSlot {
    cap: usize,
    active: Mutex<Vec<Arc<Entry>>>,
}

impl ClassSlot {
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<Entry>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-class pools of open handles
pub struct EntryPool {
    slots: [ClassSlot; 3],
}

impl EntryPool {
    /// Create an empty pool with per-class caps
    pub fn new(limits: &LimitSettings) -> Self {
        let slot = |cap| ClassSlot {
            cap,
            active: Mutex::new(Vec::new()),
        };
        Self {
            slots: [slot(limits.thermo), slot(limits.mzml), slot(limits.cache)],
        }
    }

    fn slot(&self, class: ResourceClass) -> &ClassSlot {
        &self.slots[class.slot()]
    }

    /// Cap of a class (0 = unlimited)
    pub fn cap(&self, class: ResourceClass) -> usize {
        self.slot(class).cap
    }

    /// Number of open handles in a class
    pub fn active_count(&self, class: ResourceClass) -> usize {
        self.slot(class).lock().len()
    }

    /// Names of the open entries of a class
    pub fn active_names(&self, class: ResourceClass) -> Vec<String> {
        self.slot(class)
            .lock()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    /// Run `f` against the entry's handle, opening it first if needed.
    ///
    /// The entry lock is held for the whole call and released when `f`
    /// returns, whether it succeeded or not.
    pub fn with_source<T, F>(&self, entry: &Arc<Entry>, f: F) -> Result<T, SourceError>
    where
        F: FnOnce(&mut dyn MsSource) -> Result<T, SourceError>,
    {
        entry.touch();
        {
            let mut handle = entry.lock_handle();
            if let Some(source) = handle.as_deref_mut() {
                return f(source);
            }
        }

        let slot = self.slot(entry.class());
        let mut active = slot.lock();
        let mut handle = entry.lock_handle();
        if handle.is_none() {
            self.open_locked(slot, &mut active, entry, &mut handle)?;
        }
        drop(active);
        match handle.as_deref_mut() {
            Some(source) => f(source),
            None => Err(SourceError::Generic(format!("{} is not open", entry.name()))),
        }
    }

    /// Open the entry's handle if it is not open yet
    pub fn activate(&self, entry: &Arc<Entry>) -> Result<(), SourceError> {
        entry.touch();
        let slot = self.slot(entry.class());
        let mut active = slot.lock();
        let mut handle = entry.lock_handle();
        if handle.is_none() {
            self.open_locked(slot, &mut active, entry, &mut handle)?;
        }
        Ok(())
    }

    fn open_locked(
        &self,
        slot: &ClassSlot,
        active: &mut Vec<Arc<Entry>>,
        entry: &Arc<Entry>,
        handle: &mut Option<Box<dyn MsSource>>,
    ) -> Result<(), SourceError> {
        while slot.cap > 0 && active.len() >= slot.cap {
            if evict_oldest(active).is_none() {
                break;
            }
        }
        *handle = Some(entry.open_source()?);
        active.push(Arc::clone(entry));
        debug!(
            "Opened {} ({:?}, {} active)",
            entry.name(),
            entry.class(),
            active.len()
        );
        Ok(())
    }

    /// Close one entry's handle
    pub fn close(&self, entry: &Arc<Entry>) {
        let mut active = self.slot(entry.class()).lock();
        active.retain(|e| !Arc::ptr_eq(e, entry));
        close_handle(entry);
    }

    /// Close the least recently used handle of a class, returning its name
    pub fn evict_lru(&self, class: ResourceClass) -> Option<String> {
        let mut active = self.slot(class).lock();
        evict_oldest(&mut active)
    }

    /// Close every handle idle for longer than `max_idle`. Returns how many
    /// were closed.
    pub fn close_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut closed = 0;
        for class in ResourceClass::ALL {
            let mut active = self.slot(class).lock();
            let (idle, busy): (Vec<_>, Vec<_>) = active
                .drain(..)
                .partition(|e| e.idle_for(now) > max_idle);
            *active = busy;
            for entry in idle {
                info!(
                    "Closing {} after {}s idle",
                    entry.name(),
                    entry.idle_for(now).as_secs()
                );
                close_handle(&entry);
                closed += 1;
            }
        }
        closed
    }

    /// Close every handle
    pub fn close_all(&self) {
        for class in ResourceClass::ALL {
            let mut active = self.slot(class).lock();
            for entry in active.drain(..) {
                close_handle(&entry);
            }
        }
    }

    /// Folder stores with at least one open member
    pub fn active_folders(&self) -> Vec<Arc<FolderIndexedStore>> {
        let mut folders: Vec<Arc<FolderIndexedStore>> = Vec::new();
        for entry in self.slot(ResourceClass::Cache).lock().iter() {
            if let Some(store) = entry.folder() {
                if !folders.iter().any(|f| Arc::ptr_eq(f, store)) {
                    folders.push(Arc::clone(store));
                }
            }
        }
        folders
    }
}

fn evict_oldest(active: &mut Vec<Arc<Entry>>) -> Option<String> {
    let oldest = active
        .iter()
        .enumerate()
        .min_by_key(|(_, e)| e.last_used())
        .map(|(i, _)| i)?;
    let victim = active.remove(oldest);
    info!("Evicting least recently used {}", victim.name());
    close_handle(&victim);
    Some(victim.name().to_string())
}

fn close_handle(entry: &Entry) {
    if let Some(mut source) = entry.lock_handle().take() {
        source.close();
    }
}

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::FolderIndexedStore;
use crate::pool::Entry;
use crate::source::{DataPoint, Window};

/// Kind of batch query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Chromatogram, compacted, as (rt, intensity) pairs
    #[default]
    Chromatogram,
    /// Averaged spectrum over the RT window as (mass, intensity) pairs
    Spectrum,
    /// Every point of the window as (mass, rt, intensity) triples
    Slice,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKind::Chromatogram => f.write_str("chromatogram"),
            QueryKind::Spectrum => f.write_str("spectrum"),
            QueryKind::Slice => f.write_str("area"),
        }
    }
}

/// One query of a batch and its execution state.
///
/// Created per request item and consumed by exactly one execution path:
/// either the pooled folder scan or individual execution.
#[derive(Debug)]
pub struct BatchQuery {
    name: String,
    entry: Option<Arc<Entry>>,
    /// Requested window
    pub window: Window,
    /// Requested result kind
    pub kind: QueryKind,
    /// Whether profile data was requested
    pub profile: bool,
    pub(crate) start_scan: i32,
    pub(crate) end_scan: i32,
    pub(crate) file_id: Option<i32>,
    pub(crate) points: Vec<DataPoint>,
    pub(crate) result: Option<Vec<f64>>,
    pub(crate) error: Option<String>,
    pub(crate) completed: bool,
}

impl BatchQuery {
    /// Create a pending query; `entry` is `None` when the name did not resolve
    pub fn new(
        name: impl Into<String>,
        entry: Option<Arc<Entry>>,
        window: Window,
        kind: QueryKind,
        profile: bool,
    ) -> Self {
        Self {
            name: name.into(),
            entry,
            window,
            kind,
            profile,
            start_scan: 0,
            end_scan: 0,
            file_id: None,
            points: Vec::new(),
            result: None,
            error: None,
            completed: false,
        }
    }

    /// Requested acquisition name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved entry, if any
    pub fn entry(&self) -> Option<&Arc<Entry>> {
        self.entry.as_ref()
    }

    /// Folder store of the resolved entry, if it is a folder member
    pub fn folder(&self) -> Option<&Arc<FolderIndexedStore>> {
        self.entry.as_ref()?.folder()
    }

    /// Whether a result or an error has been recorded
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Result array, when the query succeeded
    pub fn result(&self) -> Option<&[f64]> {
        self.result.as_deref()
    }

    /// Error message, when the query failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn complete(&mut self, result: Vec<f64>) {
        self.result = Some(result);
        self.error = None;
        self.completed = true;
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.result = None;
        self.error = Some(message);
        self.completed = true;
    }

    /// Parameters of the query, formatted for error messages
    pub fn describe(&self) -> String {
        format!(
            "MZLow - {:.5}, MZHigh - {:.5}, RTLow - {:.3}, RTHigh - {:.3}",
            self.window.mz_low, self.window.mz_high, self.window.rt_low, self.window.rt_high
        )
    }

    pub(crate) fn into_outcome(self) -> (Option<Vec<f64>>, Option<String>) {
        (self.result, self.error)
    }
}

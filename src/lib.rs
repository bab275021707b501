//! # mzRange - Range Queries over Mass Spectrometry Acquisitions
//!
//! `mzrange` answers rectangular m/z × retention-time queries (chromatograms,
//! spectra, LC-MS areas) against large acquisition collections, preferring
//! precomputed binary caches over the slow vendor and XML formats.
//!
//! ## Key Features
//!
//! - **Indexed binary caches**: Single-acquisition `*.rch` files and shared
//!   `folder.cache` files store centroided survey data sorted by mass in
//!   fixed-size pages; a page index bounds every read to the pages that can
//!   hold the query's m/z window.
//!
//! - **Pooled folder scans**: A batch touching many acquisitions of one
//!   folder cache is answered with one pass over the merged mass intervals.
//!
//! - **Bounded handle pool**: Open handles are capped per resource class,
//!   evicted least-recently-used, and closed after an idle timeout.
//!
//! - **Concurrent batches**: Independent queries run on a bounded worker pool
//!   with per-item error isolation; results keep input order.
//!
//! - **Raw fallbacks**: mzML (default feature) and Thermo RAW (`thermo`
//!   feature) readers serve profile data, MS/MS scans and averaged spectra
//!   that caches do not hold.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mzrange::config::Settings;
//! use mzrange::service::MsDataService;
//! use mzrange::source::Window;
//!
//! let settings = Settings::with_roots(["/data/ms"]);
//! let service = MsDataService::start(settings)?;
//!
//! let trace = service
//!     .chromatogram("sample_01", Window::new(445.11, 445.13, 10.0, 12.0), true)
//!     .map_err(anyhow::Error::msg)?;
//! for pair in trace.chunks(2) {
//!     println!("{:.3} min  {:.0}", pair[0], pair[1]);
//! }
//! service.shutdown();
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`source`]: The [`MsSource`](source::MsSource) query trait, data points
//!   and shared extraction helpers
//! - [`cache`]: Binary cache stores, chromatogram compaction, pooled scans
//! - [`pool`]: Lazily opened handles with per-class caps and LRU eviction
//! - [`dispatch`]: Batch execution on a bounded worker pool
//! - [`registry`]: Directory discovery, name resolution, idle sweeping
//! - [`service`]: The transport-facing facade
//! - [`config`]: TOML settings
//!
//! ## Result Layout
//!
//! | Operation | Flat array layout |
//! |-----------|-------------------|
//! | chromatogram | rt, intensity, rt, intensity, ... |
//! | spectrum | mass, intensity, ... |
//! | area | mass, rt, intensity, ... |

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
// Allow some patterns common in scientific code
#![allow(clippy::too_many_arguments)]

pub mod cache;
pub mod config;
pub mod dispatch;
#[cfg(feature = "mzml")]
pub mod mzml;
pub mod pool;
pub mod registry;
pub mod service;
pub mod source;
#[cfg(feature = "thermo")]
pub mod thermo;

#[cfg(test)]
mod testutil;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::cache::{BinaryIndexedStore, FolderIndexedStore, FOLDER_CACHE_NAME};
    pub use crate::config::Settings;
    pub use crate::dispatch::{BatchRequest, BatchResponse, Dispatcher, QueryKind};
    pub use crate::pool::{Entry, EntryPool, ResourceClass};
    pub use crate::registry::Registry;
    pub use crate::service::{BatchArgs, MsDataService};
    pub use crate::source::{DataPoint, FragmentationEvent, MsSource, Range, SourceError, Window};

    #[cfg(feature = "mzml")]
    pub use crate::mzml::MzMLSource;
    #[cfg(feature = "thermo")]
    pub use crate::thermo::ThermoSource;
}

//! Thermo RAW file support.
//!
//! Queries are answered through the `thermorawfilereader` crate, which wraps
//! the official .NET RawFileReader library. Spectra are always read
//! centroided, so profile requests fail with
//! [`SourceError::DataUnavailable`](crate::source::SourceError).
//!
//! # Requirements
//!
//! - .NET 8 runtime must be installed on the system
//! - Thermo's RawFileReader license terms apply (bundled via thermorawfilereader)
//!
//! # Platform Support
//!
//! | Platform         | Support Status |
//! |------------------|----------------|
//! | Windows x86_64   | ✅ Full        |
//! | Linux x86_64     | ✅ Full        |
//! | macOS x86_64     | ✅ Full        |
//! | macOS ARM64      | ❌ Not supported - Thermo's RawFileReader .NET assemblies require x86 |
//! | Linux ARM64      | ❌ Not supported |
//!
//! On unsupported platforms, opening fails with a `PlatformNotSupported` error.

mod error;
mod source;

pub use error::ThermoError;
pub use source::ThermoSource;

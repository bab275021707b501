use crate::source::SourceError;

/// Errors that can occur when reading Thermo RAW files
#[derive(Debug, thiserror::Error)]
pub enum ThermoError {
    /// Error opening the RAW file (file not found, invalid format, etc.)
    #[error("Failed to open RAW file: {0}")]
    OpenError(String),

    /// Error reading spectrum data
    #[error("Spectrum read error: {0}")]
    ReadError(String),

    /// Path does not exist or is not a valid .raw file
    #[error("Invalid RAW path: {0}")]
    InvalidPath(String),

    /// Platform not supported (e.g., ARM architecture)
    #[error("Platform not supported: {0}. Thermo RAW reading requires x86/x86_64 architecture.")]
    PlatformNotSupported(String),
}

impl From<ThermoError> for SourceError {
    fn from(error: ThermoError) -> Self {
        match error {
            ThermoError::ReadError(_) => SourceError::DataUnavailable(error.to_string()),
            ThermoError::PlatformNotSupported(_) => SourceError::UnsupportedFeature(error.to_string()),
            other => SourceError::Parse(other.to_string()),
        }
    }
}

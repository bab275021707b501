/// Errors raised by any data source (cache store or raw reader)
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Malformed cache header or body, or an unreadable raw file
    #[error("Parse error: {0}")]
    Parse(String),

    /// The requested representation (profile, centroid, MS/MS) is not present
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// The operation is structurally impossible for this source
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Unknown acquisition key
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O error while reading the underlying file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else, captured with context
    #[error("{0}")]
    Generic(String),
}

impl SourceError {
    /// Build a parse error from anything printable
    pub fn parse(msg: impl Into<String>) -> Self {
        SourceError::Parse(msg.into())
    }

    /// Build a data-unavailable error from anything printable
    pub fn unavailable(msg: impl Into<String>) -> Self {
        SourceError::DataUnavailable(msg.into())
    }

    /// Build an unsupported-feature error from anything printable
    pub fn unsupported(msg: impl Into<String>) -> Self {
        SourceError::UnsupportedFeature(msg.into())
    }
}

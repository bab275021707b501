use crate::source::SourceError;

/// Errors that can occur while reading an mzML file
#[derive(Debug, thiserror::Error)]
pub enum MzMLError {
    /// Error parsing XML
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error decoding binary data arrays
    #[error("Binary decode error: {0}")]
    BinaryError(#[from] super::binary::BinaryDecodeError),

    /// Invalid mzML document structure
    #[error("Invalid mzML structure: {0}")]
    InvalidStructure(String),

    /// Invalid value for an XML attribute
    #[error("Invalid attribute value: {0}")]
    InvalidAttributeValue(String),

    /// UTF-8 encoding error in attribute or text content
    #[error("UTF-8 encoding error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// A spectrum lists more than one precursor
    #[error("Multiple precursors in mzML are not supported, check spectrum {0}")]
    MultiplePrecursors(String),
}

impl From<MzMLError> for SourceError {
    fn from(err: MzMLError) -> Self {
        match err {
            MzMLError::MultiplePrecursors(_) => SourceError::UnsupportedFeature(err.to_string()),
            MzMLError::IoError(e) => SourceError::Io(e),
            other => SourceError::Parse(other.to_string()),
        }
    }
}

//! # mzML Reader Module
//!
//! Serves queries straight from mzML files, the XML-based community
//! standard for mass spectrometry data defined by HUPO-PSI.
//!
//! The document is read once with a quick-xml pull parser when the entry is
//! activated. Binary arrays are decoded eagerly (Base64, optional zlib) and
//! kept in memory until the pool closes the source.
//!
//! ## Elements read
//!
//! ```text
//! spectrum (index, id, defaultArrayLength)
//! ├── cvParam        ms level, profile / centroid
//! ├── scanList       scan start time (minute or second), filter, scan window
//! ├── precursorList  selected ion m/z (a single precursor only)
//! └── binaryDataArrayList
//!     └── binaryDataArray  precision, compression, m/z or intensity
//! ```

mod binary;
mod error;
mod parser;
mod source;

pub use binary::{decode_array, BinaryDecodeError, Compression, Precision};
pub use error::MzMLError;
pub use parser::{MzMLParser, ParsedRun, ParsedSpectrum};
pub use source::MzMLSource;

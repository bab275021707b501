//! `<binaryDataArray>` decoding: Base64, optional zlib, little-endian floats.

use std::io::Read;

use base64::prelude::*;
use byteorder::{ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;

/// Compression of a binary array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Plain bytes (MS:1000576)
    #[default]
    None,
    /// zlib (MS:1000574)
    Zlib,
    /// Any MS-Numpress variant (MS:1002312..MS:1002314)
    Numpress,
}

impl Compression {
    /// Compression named by a CV accession
    pub fn from_accession(accession: &str) -> Option<Self> {
        match accession {
            "MS:1000574" => Some(Compression::Zlib),
            "MS:1000576" => Some(Compression::None),
            "MS:1002312" | "MS:1002313" | "MS:1002314" => Some(Compression::Numpress),
            _ => None,
        }
    }
}

/// Float width of a binary array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// 32-bit float (MS:1000521)
    Float32,
    /// 64-bit float (MS:1000523)
    #[default]
    Float64,
}

impl Precision {
    /// Precision named by a CV accession
    pub fn from_accession(accession: &str) -> Option<Self> {
        match accession {
            "MS:1000521" => Some(Precision::Float32),
            "MS:1000523" => Some(Precision::Float64),
            _ => None,
        }
    }

    fn width(self) -> usize {
        match self {
            Precision::Float32 => 4,
            Precision::Float64 => 8,
        }
    }
}

/// Errors decoding a binary array
#[derive(Debug, thiserror::Error)]
pub enum BinaryDecodeError {
    /// Invalid Base64 text
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// zlib stream could not be inflated
    #[error("Decompression error: {0}")]
    Decompression(#[from] std::io::Error),

    /// Byte count does not match the declared array length or float width
    #[error("Invalid data length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected count
        expected: usize,
        /// Actual count
        actual: usize,
    },

    /// Compression scheme this reader does not decode
    #[error("Unsupported compression: {0:?}")]
    UnsupportedCompression(Compression),
}

/// Decode one array's text into `f64` values.
///
/// `expected_len` is the spectrum's `defaultArrayLength`, checked when given.
pub fn decode_array(
    text: &str,
    precision: Precision,
    compression: Compression,
    expected_len: Option<usize>,
) -> Result<Vec<f64>, BinaryDecodeError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let raw = BASE64_STANDARD.decode(text)?;
    let bytes = match compression {
        Compression::None => raw,
        Compression::Zlib => {
            let mut inflated = Vec::with_capacity(raw.len() * 4);
            ZlibDecoder::new(&raw[..]).read_to_end(&mut inflated)?;
            inflated
        }
        Compression::Numpress => {
            return Err(BinaryDecodeError::UnsupportedCompression(compression));
        }
    };

    let width = precision.width();
    if bytes.len() % width != 0 {
        return Err(BinaryDecodeError::InvalidLength {
            expected: bytes.len() / width * width,
            actual: bytes.len(),
        });
    }
    let values: Vec<f64> = match precision {
        Precision::Float32 => bytes
            .chunks_exact(4)
            .map(|c| f64::from(LittleEndian::read_f32(c)))
            .collect(),
        Precision::Float64 => bytes.chunks_exact(8).map(LittleEndian::read_f64).collect(),
    };

    if let Some(expected) = expected_len {
        if values.len() != expected {
            return Err(BinaryDecodeError::InvalidLength {
                expected,
                actual: values.len(),
            });
        }
    }
    Ok(values)
}

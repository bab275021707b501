//! Low-level decoding for the binary cache formats.
//!
//! Both formats are little-endian. Strings are .NET `BinaryWriter` strings: a
//! 7-bit variable-length byte count followed by the encoded bytes.
//!
//! | Format | Page size | Record layout |
//! |--------|-----------|---------------|
//! | single-file | 65536 | f64 mass, f32 intensity, f32 scan |
//! | folder | 64000 | f64 mass, f32 intensity, i32 scan, i32 file id |

use std::io::{self, Read, Seek, SeekFrom};
use std::ops::RangeInclusive;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::source::{DataPoint, SourceError};

/// Every cache signature starts with this tag
pub const SIGNATURE_PREFIX: &str = "RCH";

/// Upper bound accepted for a length-prefixed string
const MAX_STRING_LEN: u32 = 1 << 20;

/// Fixed page geometry of a cache format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    /// Page size in bytes
    pub page_size: u64,
    /// Record size in bytes
    pub record_size: usize,
}

/// Page geometry of single-acquisition caches
pub const SINGLE_LAYOUT: PageLayout = PageLayout {
    page_size: 65536,
    record_size: 16,
};

/// Page geometry of folder caches
pub const FOLDER_LAYOUT: PageLayout = PageLayout {
    page_size: 64000,
    record_size: 20,
};

/// Map a premature end of input to a parse error naming what was being read
pub(crate) fn truncated(err: io::Error, what: &str) -> SourceError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        SourceError::parse(format!("truncated cache file while reading {what}"))
    } else {
        SourceError::Io(err)
    }
}

/// Read a .NET length-prefixed string
pub fn read_prefixed_string<R: Read>(reader: &mut R) -> Result<String, SourceError> {
    let mut len: u32 = 0;
    let mut shift = 0;
    loop {
        let byte = reader.read_u8().map_err(|e| truncated(e, "string length"))?;
        len |= u32::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 28 {
            return Err(SourceError::parse("malformed string length prefix"));
        }
    }
    if len > MAX_STRING_LEN {
        return Err(SourceError::parse(format!("string length {len} out of range")));
    }
    let mut buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut buf)
        .map_err(|e| truncated(e, "string"))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Read a signature string and check its format tag
pub fn read_signature<R: Read>(reader: &mut R) -> Result<String, SourceError> {
    let signature = read_prefixed_string(reader)?;
    if !signature.starts_with(SIGNATURE_PREFIX) {
        return Err(SourceError::parse(format!(
            "unrecognized cache signature {signature:?}"
        )));
    }
    Ok(signature)
}

/// Read an int32 count, rejecting negative values
pub fn read_count<R: Read>(reader: &mut R, what: &str) -> Result<usize, SourceError> {
    let count = reader
        .read_i32::<LittleEndian>()
        .map_err(|e| truncated(e, what))?;
    usize::try_from(count)
        .map_err(|_| SourceError::parse(format!("negative {what}: {count}")))
}

/// Check that `count` items of `item_size` bytes fit before `limit`
pub fn check_fits(
    position: u64,
    count: usize,
    item_size: u64,
    limit: u64,
    what: &str,
) -> Result<(), SourceError> {
    let needed = (count as u64)
        .checked_mul(item_size)
        .and_then(|n| n.checked_add(position));
    match needed {
        Some(end) if end <= limit => Ok(()),
        _ => Err(SourceError::parse(format!(
            "{what} ({count} entries) exceeds file length"
        ))),
    }
}

/// Read `count` little-endian float64 values
pub fn read_f64_vec<R: Read>(reader: &mut R, count: usize, what: &str) -> Result<Vec<f64>, SourceError> {
    let mut values = vec![0.0; count];
    reader
        .read_f64_into::<LittleEndian>(&mut values)
        .map_err(|e| truncated(e, what))?;
    Ok(values)
}

/// Decode one single-file record (scan is stored as a float)
pub fn decode_single_record(record: &[u8]) -> DataPoint {
    DataPoint::new(
        LittleEndian::read_f64(&record[0..8]),
        LittleEndian::read_f32(&record[8..12]),
        LittleEndian::read_f32(&record[12..16]).round() as i32,
    )
}

/// Decode one folder record into the point and its file id
pub fn decode_folder_record(record: &[u8]) -> (DataPoint, i32) {
    let point = DataPoint::new(
        LittleEndian::read_f64(&record[0..8]),
        LittleEndian::read_f32(&record[8..12]),
        LittleEndian::read_i32(&record[12..16]),
    );
    (point, LittleEndian::read_i32(&record[16..20]))
}

/// Data region of a cache file: where pages start and how many bytes follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRegion {
    /// Byte offset of the first page
    pub start: u64,
    /// Total bytes from the first page to the end of the file
    pub len: u64,
    /// Page geometry
    pub layout: PageLayout,
}

impl DataRegion {
    /// Number of whole records stored on `page` (the last page may be short)
    pub fn records_on_page(&self, page: usize) -> usize {
        let offset = page as u64 * self.layout.page_size;
        if offset >= self.len {
            return 0;
        }
        let bytes = self.layout.page_size.min(self.len - offset);
        (bytes / self.layout.record_size as u64) as usize
    }

    /// Sequentially read every page in `pages`, handing each record to `visit`.
    ///
    /// The reader is positioned once at the first page; pages are then read
    /// back to back.
    pub fn scan_pages<R, F>(
        &self,
        reader: &mut R,
        pages: RangeInclusive<usize>,
        mut visit: F,
    ) -> Result<(), SourceError>
    where
        R: Read + Seek,
        F: FnMut(&[u8]),
    {
        let first = *pages.start();
        reader.seek(SeekFrom::Start(
            self.start + first as u64 * self.layout.page_size,
        ))?;
        let mut buf = vec![0u8; self.layout.page_size as usize];
        for page in pages {
            let records = self.records_on_page(page);
            if records == 0 {
                break;
            }
            let bytes = records * self.layout.record_size;
            reader
                .read_exact(&mut buf[..bytes])
                .map_err(|e| truncated(e, "data page"))?;
            // skip a partial trailing record, if any, so the next page is aligned
            let page_bytes = self.layout.page_size.min(self.len - page as u64 * self.layout.page_size);
            let slack = page_bytes - bytes as u64;
            if slack > 0 {
                reader.seek(SeekFrom::Current(slack as i64))?;
            }
            for record in buf[..bytes].chunks_exact(self.layout.record_size) {
                visit(record);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prefixed(s: &str) -> Vec<u8> {
        let mut out = Vec::new();
        let mut len = s.len() as u32;
        loop {
            let mut byte = (len & 0x7F) as u8;
            len >>= 7;
            if len != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if len == 0 {
                break;
            }
        }
        out.extend_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn test_read_short_string() {
        let mut cursor = Cursor::new(prefixed("RCH0"));
        assert_eq!(read_prefixed_string(&mut cursor).unwrap(), "RCH0");
    }

    #[test]
    fn test_read_multibyte_length() {
        let long = "x".repeat(300);
        let mut cursor = Cursor::new(prefixed(&long));
        assert_eq!(read_prefixed_string(&mut cursor).unwrap().len(), 300);
    }

    #[test]
    fn test_bad_signature_is_parse_error() {
        let mut cursor = Cursor::new(prefixed("PKZIP"));
        assert!(matches!(
            read_signature(&mut cursor),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn test_truncated_string_is_parse_error() {
        let mut bytes = prefixed("RCH0");
        bytes.truncate(3);
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(
            read_prefixed_string(&mut cursor),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut cursor = Cursor::new((-5i32).to_le_bytes().to_vec());
        assert!(matches!(
            read_count(&mut cursor, "page count"),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn test_decode_single_record_rounds_scan() {
        let mut record = Vec::new();
        record.extend_from_slice(&512.25f64.to_le_bytes());
        record.extend_from_slice(&1000.0f32.to_le_bytes());
        record.extend_from_slice(&41.9999f32.to_le_bytes());
        let point = decode_single_record(&record);
        assert_eq!(point.mass, 512.25);
        assert_eq!(point.intensity, 1000.0);
        assert_eq!(point.scan, 42);
    }

    #[test]
    fn test_records_on_short_last_page() {
        let region = DataRegion {
            start: 100,
            len: SINGLE_LAYOUT.page_size + 48,
            layout: SINGLE_LAYOUT,
        };
        assert_eq!(region.records_on_page(0), 4096);
        assert_eq!(region.records_on_page(1), 3);
        assert_eq!(region.records_on_page(2), 0);
    }
}

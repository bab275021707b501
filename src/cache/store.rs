//! Single-acquisition cache store (`RCH0`).
//!
//! File layout:
//!
//! ```text
//! string  signature ("RCH...")
//! int32   N
//! N ×     { int32 scan, float32 rt }
//! int32   P
//! P ×     float64 first mass of page
//! pages   65536-byte pages of 16-byte records, sorted by mass across pages;
//!         the last record's mass is the maximum mass
//! ```

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use serde::Serialize;

use super::codec::{
    check_fits, decode_single_record, read_count, read_f64_vec, read_signature, truncated,
    DataRegion, SINGLE_LAYOUT,
};
use super::index::{MassPageIndex, RtIndex};
use super::{area_output, survey_scan_rt, trace_output};
use crate::source::{
    flatten_spectrum, sort_points, DataPoint, FragmentationEvent, MsSource, Range, SourceError,
    Window,
};

/// Header summary of a cache file
#[derive(Debug, Clone, Serialize)]
pub struct CacheSummary {
    /// Signature string from the header
    pub signature: String,
    /// Number of indexed survey scans
    pub scans: usize,
    /// Number of data pages
    pub pages: usize,
    /// Mass range covered by the data
    pub mass_range: Range,
    /// Retention time range covered by the scans
    pub rt_range: Range,
}

/// Mass-sorted, page-indexed store of one acquisition's centroided survey data
pub struct BinaryIndexedStore<R = BufReader<File>> {
    reader: Option<R>,
    signature: String,
    rt_index: RtIndex,
    mass_index: MassPageIndex,
    region: DataRegion,
    max_mass: f64,
}

impl BinaryIndexedStore {
    /// Open a cache file and load its indices
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let file = File::open(path.as_ref())?;
        let store = Self::from_reader(BufReader::new(file))?;
        debug!(
            "Opened cache {} ({} scans, {} pages)",
            path.as_ref().display(),
            store.rt_index.len(),
            store.mass_index.len()
        );
        Ok(store)
    }
}

impl<R: Read + Seek> BinaryIndexedStore<R> {
    /// Load the header and indices from any seekable input
    pub fn from_reader(mut reader: R) -> Result<Self, SourceError> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let signature = read_signature(&mut reader)?;

        let scan_count = read_count(&mut reader, "scan count")?;
        check_fits(reader.stream_position()?, scan_count, 8, file_len, "RT index")?;
        let mut pairs = Vec::with_capacity(scan_count);
        for _ in 0..scan_count {
            let scan = reader
                .read_i32::<LittleEndian>()
                .map_err(|e| truncated(e, "RT index"))?;
            let rt = reader
                .read_f32::<LittleEndian>()
                .map_err(|e| truncated(e, "RT index"))?;
            pairs.push((scan, f64::from(rt)));
        }
        let rt_index = RtIndex::from_pairs(pairs)?;

        let page_count = read_count(&mut reader, "page count")?;
        check_fits(reader.stream_position()?, page_count, 8, file_len, "mass index")?;
        let mass_index = MassPageIndex::new(read_f64_vec(&mut reader, page_count, "mass index")?);

        let start = reader.stream_position()?;
        let region = DataRegion {
            start,
            len: file_len - start,
            layout: SINGLE_LAYOUT,
        };

        let mut max_mass = 0.0;
        if page_count > 0 {
            let needed = (page_count as u64 - 1) * SINGLE_LAYOUT.page_size
                + SINGLE_LAYOUT.record_size as u64;
            if region.len < needed {
                return Err(SourceError::parse(format!(
                    "data region of {} bytes is shorter than its {page_count} pages",
                    region.len
                )));
            }
            reader.seek(SeekFrom::Start(file_len - SINGLE_LAYOUT.record_size as u64))?;
            max_mass = reader
                .read_f64::<LittleEndian>()
                .map_err(|e| truncated(e, "last record"))?;
        }

        Ok(Self {
            reader: Some(reader),
            signature,
            rt_index,
            mass_index,
            region,
            max_mass,
        })
    }

    /// Signature string from the header
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Survey scan RT index
    pub fn rt_index(&self) -> &RtIndex {
        &self.rt_index
    }

    /// Page index of the mass-sorted data
    pub fn mass_index(&self) -> &MassPageIndex {
        &self.mass_index
    }

    /// Mass span covered by the stored records
    pub fn data_mass_range(&self) -> Range {
        match self.mass_index.first_mass() {
            Some(low) => Range::new(low, self.max_mass),
            None => Range::default(),
        }
    }

    /// Header summary
    pub fn summary(&self) -> CacheSummary {
        CacheSummary {
            signature: self.signature.clone(),
            scans: self.rt_index.len(),
            pages: self.mass_index.len(),
            mass_range: self.data_mass_range(),
            rt_range: self.rt_index.range(),
        }
    }

    /// Every stored point inside the window, with resolved retention times,
    /// ordered by (rt, mass).
    pub fn points(&mut self, window: Window) -> Result<Vec<DataPoint>, SourceError> {
        let Some(pages) = self.mass_index.page_span(window.mz_low, window.mz_high) else {
            return Ok(Vec::new());
        };
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| SourceError::Generic("cache store is closed".into()))?;

        let rt_index = &self.rt_index;
        let mut points = Vec::new();
        self.region.scan_pages(reader, pages, |record| {
            let mut point = decode_single_record(record);
            // pages are mass-sorted, but nothing guarantees it within a page
            if !window.contains_mass(point.mass) {
                return;
            }
            let Some(rt) = rt_index.rt_of(point.scan) else {
                return;
            };
            if window.contains_rt(rt) {
                point.rt = rt;
                points.push(point);
            }
        })?;
        sort_points(&mut points);
        Ok(points)
    }

    fn ensure_centroid(profile: bool) -> Result<(), SourceError> {
        if profile {
            return Err(SourceError::unavailable(
                "cache holds centroided data only, query with cache disabled for profiles",
            ));
        }
        Ok(())
    }
}

impl<R: Read + Seek + Send> MsSource for BinaryIndexedStore<R> {
    fn trace(&mut self, window: Window) -> Result<Vec<f64>, SourceError> {
        let points = self.points(window)?;
        Ok(trace_output(points, &self.rt_index, window))
    }

    fn spectrum(
        &mut self,
        mz_low: f64,
        mz_high: f64,
        scan: i32,
        profile: bool,
    ) -> Result<Vec<f64>, SourceError> {
        Self::ensure_centroid(profile)?;
        let rt = survey_scan_rt(&self.rt_index, scan)?;
        let points = self.points(Window::new(mz_low, mz_high, rt, rt))?;
        Ok(flatten_spectrum(&points))
    }

    fn average_spectrum(&mut self, _window: Window, _profile: bool) -> Result<Vec<f64>, SourceError> {
        Err(SourceError::unsupported(
            "cache stores do not support spectrum averaging",
        ))
    }

    fn area(&mut self, window: Window, profile: bool) -> Result<Vec<f64>, SourceError> {
        Self::ensure_centroid(profile)?;
        let points = self.points(window)?;
        Ok(area_output(&points))
    }

    fn fragmentation_events(&mut self, _window: Window) -> Result<Vec<FragmentationEvent>, SourceError> {
        // caches carry survey scans only
        Ok(Vec::new())
    }

    fn scan_from_rt(&mut self, rt: f64) -> Result<i32, SourceError> {
        self.rt_index.scan_at_or_before(rt)
    }

    fn rt_from_scan(&mut self, scan: i32) -> Result<f64, SourceError> {
        self.rt_index.rt_at_or_before(scan)
    }

    fn mass_range(&self) -> Range {
        self.data_mass_range()
    }

    fn rt_range(&self) -> Range {
        self.rt_index.range()
    }

    fn close(&mut self) {
        self.reader = None;
        self.rt_index = RtIndex::default();
        self.mass_index = MassPageIndex::default();
    }
}

//! Folder cache store (`RCH1`).
//!
//! File layout:
//!
//! ```text
//! string  signature ("RCH...")
//! int32   F
//! F ×     { int32 file id, string name, int32 count, count × { int32 scan, float64 rt } }
//! int32   P
//! P ×     float64 first mass of page
//! pages   64000-byte pages of 20-byte records {mass, intensity, scan, file id}
//! ```
//!
//! Only the file records are read at open. The mass index and per-file RT
//! indices are loaded on demand, shared by every acquisition handle of the
//! folder, and dropped again by [`FolderIndexedStore::deactivate`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, info, warn};
use serde::Serialize;

use super::codec::{
    check_fits, decode_folder_record, read_count, read_f64_vec, read_prefixed_string,
    read_signature, truncated, DataRegion, FOLDER_LAYOUT,
};
use super::index::{MassPageIndex, RtIndex};
use super::{area_output, survey_scan_rt, trace_output};
use crate::source::{
    flatten_spectrum, sort_points, DataPoint, FragmentationEvent, MsSource, Range, SourceError,
    Window,
};

/// File name that marks a folder cache
pub const FOLDER_CACHE_NAME: &str = "folder.cache";

/// One acquisition listed in a folder cache header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    /// Id tagging this acquisition's records
    pub file_id: i32,
    /// Acquisition name (file stem of the stored name)
    pub name: String,
    /// Number of indexed survey scans
    pub scan_count: usize,
    #[serde(skip)]
    rt_offset: u64,
}

/// Mass index plus the mass range it spans
#[derive(Debug)]
pub(crate) struct LoadedMassIndex {
    pub(crate) pages: MassPageIndex,
    pub(crate) range: Range,
}

/// Shared cache holding every acquisition of one folder
#[derive(Debug)]
pub struct FolderIndexedStore {
    path: PathBuf,
    signature: String,
    files: Vec<FileRecord>,
    mass_index_offset: u64,
    region: DataRegion,
    mass_index: Mutex<Option<Arc<LoadedMassIndex>>>,
    rt_indices: Mutex<HashMap<i32, Arc<RtIndex>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn stem(name: &str) -> String {
    // names were written on Windows, split on either separator
    let base = name.rsplit(['\\', '/']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(dot) if dot > 0 => base[..dot].to_string(),
        _ => base.to_string(),
    }
}

impl FolderIndexedStore {
    /// Open a folder cache and read its file records
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(File::open(&path)?);
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let signature = read_signature(&mut reader)?;
        let file_count = read_count(&mut reader, "file count")?;
        let mut files = Vec::with_capacity(file_count.min(4096));
        for _ in 0..file_count {
            let file_id = reader
                .read_i32::<LittleEndian>()
                .map_err(|e| truncated(e, "file record"))?;
            let name = stem(&read_prefixed_string(&mut reader)?);
            let scan_count = read_count(&mut reader, "scan count")?;
            let rt_offset = reader.stream_position()?;
            check_fits(rt_offset, scan_count, 12, file_len, "RT index")?;
            reader.seek(SeekFrom::Current(scan_count as i64 * 12))?;
            files.push(FileRecord {
                file_id,
                name,
                scan_count,
                rt_offset,
            });
        }

        let mass_index_offset = reader.stream_position()?;
        let page_count = read_count(&mut reader, "page count")?;
        check_fits(
            reader.stream_position()?,
            page_count,
            8,
            file_len,
            "mass index",
        )?;
        let start = reader.stream_position()? + page_count as u64 * 8;

        info!(
            "Opened folder cache {} ({} acquisitions, {} pages)",
            path.display(),
            files.len(),
            page_count
        );
        Ok(Self {
            path,
            signature,
            files,
            mass_index_offset,
            region: DataRegion {
                start,
                len: file_len - start,
                layout: FOLDER_LAYOUT,
            },
            mass_index: Mutex::new(None),
            rt_indices: Mutex::new(HashMap::new()),
        })
    }

    /// Path of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Signature string from the header
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Acquisitions listed in the header
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Header record of a named acquisition
    pub fn record(&self, name: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.name == name)
    }

    pub(crate) fn region(&self) -> DataRegion {
        self.region
    }

    /// Whether any shared index is currently held in memory
    pub fn is_loaded(&self) -> bool {
        lock(&self.mass_index).is_some() || !lock(&self.rt_indices).is_empty()
    }

    /// Mass index and data mass range, loading them on first use
    pub(crate) fn loaded_mass_index(&self) -> Result<Arc<LoadedMassIndex>, SourceError> {
        let mut slot = lock(&self.mass_index);
        if let Some(loaded) = slot.as_ref() {
            return Ok(Arc::clone(loaded));
        }

        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(self.mass_index_offset))?;
        let page_count = read_count(&mut reader, "page count")?;
        let pages = MassPageIndex::new(read_f64_vec(&mut reader, page_count, "mass index")?);

        // the upper bound is the largest mass on the last page
        let mut range = Range::default();
        if let Some(low) = pages.first_mass() {
            let mut high = low;
            let last = pages.len() - 1;
            self.region.scan_pages(&mut reader, last..=last, |record| {
                let (point, _) = decode_folder_record(record);
                high = high.max(point.mass);
            })?;
            range = Range::new(low, high);
        }

        debug!(
            "Loaded mass index of {} ({} pages)",
            self.path.display(),
            pages.len()
        );
        let loaded = Arc::new(LoadedMassIndex { pages, range });
        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Mass range of the stored data
    pub fn mass_range(&self) -> Result<Range, SourceError> {
        Ok(self.loaded_mass_index()?.range)
    }

    /// RT index of one acquisition, loading it on first use
    pub fn rt_index(&self, file_id: i32) -> Result<Arc<RtIndex>, SourceError> {
        let mut indices = lock(&self.rt_indices);
        if let Some(index) = indices.get(&file_id) {
            return Ok(Arc::clone(index));
        }
        let record = self
            .files
            .iter()
            .find(|f| f.file_id == file_id)
            .ok_or_else(|| SourceError::NotFound(format!("file id {file_id} in folder cache")))?;

        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(record.rt_offset))?;
        let mut pairs = Vec::with_capacity(record.scan_count);
        for _ in 0..record.scan_count {
            let scan = reader
                .read_i32::<LittleEndian>()
                .map_err(|e| truncated(e, "RT index"))?;
            let rt = reader
                .read_f64::<LittleEndian>()
                .map_err(|e| truncated(e, "RT index"))?;
            pairs.push((scan, rt));
        }
        let index = Arc::new(RtIndex::from_pairs(pairs)?);
        indices.insert(file_id, Arc::clone(&index));
        Ok(index)
    }

    /// Drop the shared indices; they are reloaded on next use
    pub fn deactivate(&self) {
        let had_mass = lock(&self.mass_index).take().is_some();
        let mut indices = lock(&self.rt_indices);
        if had_mass || !indices.is_empty() {
            debug!("Released indices of {}", self.path.display());
        }
        indices.clear();
    }

    /// Open a query handle for one acquisition of this folder
    pub fn open_acquisition(self: &Arc<Self>, name: &str) -> Result<FolderAcquisition, SourceError> {
        let record = self
            .record(name)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("{name} in {}", self.path.display())))?;
        let rt_index = self.rt_index(record.file_id)?;
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(FolderAcquisition {
            store: Arc::clone(self),
            record,
            rt_index,
            reader: Some(reader),
        })
    }

    /// Points of one acquisition in a mass window and inclusive scan range.
    /// Retention times are left unresolved.
    pub(crate) fn scan_points<R: Read + Seek>(
        &self,
        reader: &mut R,
        file_id: i32,
        mz_low: f64,
        mz_high: f64,
        scans: (i32, i32),
    ) -> Result<Vec<DataPoint>, SourceError> {
        let loaded = self.loaded_mass_index()?;
        let Some(pages) = loaded.pages.page_span(mz_low, mz_high) else {
            return Ok(Vec::new());
        };
        let mut points = Vec::new();
        self.region.scan_pages(reader, pages, |record| {
            let (point, id) = decode_folder_record(record);
            if id == file_id
                && point.mass >= mz_low
                && point.mass <= mz_high
                && point.scan >= scans.0
                && point.scan <= scans.1
            {
                points.push(point);
            }
        })?;
        Ok(points)
    }
}

/// Assign retention times from the acquisition's index and sort by (rt, mass)
pub(crate) fn resolve_rts(points: &mut Vec<DataPoint>, rt_index: &RtIndex) {
    points.retain_mut(|p| match rt_index.rt_of(p.scan) {
        Some(rt) => {
            p.rt = rt;
            true
        }
        None => false,
    });
    sort_points(points);
}

/// Query handle for one acquisition inside a folder cache
pub struct FolderAcquisition {
    store: Arc<FolderIndexedStore>,
    record: FileRecord,
    rt_index: Arc<RtIndex>,
    reader: Option<BufReader<File>>,
}

impl FolderAcquisition {
    /// Header record of this acquisition
    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    /// Folder store this acquisition lives in
    pub fn store(&self) -> &Arc<FolderIndexedStore> {
        &self.store
    }

    /// Every stored point inside the window, ordered by (rt, mass)
    pub fn points(&mut self, window: Window) -> Result<Vec<DataPoint>, SourceError> {
        let scans = (
            self.rt_index.scan_at_or_before(window.rt_low)?,
            self.rt_index.scan_at_or_before(window.rt_high)?,
        );
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| SourceError::Generic("folder acquisition is closed".into()))?;
        let mut points = self.store.scan_points(
            reader,
            self.record.file_id,
            window.mz_low,
            window.mz_high,
            scans,
        )?;
        resolve_rts(&mut points, &self.rt_index);
        Ok(points)
    }
}

impl MsSource for FolderAcquisition {
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
        if profile {
            return Err(SourceError::unavailable(
                "cache holds centroided data only, query with cache disabled for profiles",
            ));
        }
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
        if profile {
            return Err(SourceError::unavailable(
                "cache holds centroided data only, query with cache disabled for profiles",
            ));
        }
        let points = self.points(window)?;
        Ok(area_output(&points))
    }

    fn fragmentation_events(&mut self, _window: Window) -> Result<Vec<FragmentationEvent>, SourceError> {
        Ok(Vec::new())
    }

    fn scan_from_rt(&mut self, rt: f64) -> Result<i32, SourceError> {
        self.rt_index.scan_at_or_before(rt)
    }

    fn rt_from_scan(&mut self, scan: i32) -> Result<f64, SourceError> {
        self.rt_index.rt_at_or_before(scan)
    }

    fn mass_range(&self) -> Range {
        match self.store.mass_range() {
            Ok(range) => range,
            Err(e) => {
                warn!(
                    "Mass range of {} unavailable: {e}",
                    self.store.path().display()
                );
                Range::default()
            }
        }
    }

    fn rt_range(&self) -> Range {
        self.rt_index.range()
    }

    fn close(&mut self) {
        self.reader = None;
    }
}

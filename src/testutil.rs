//! Byte-exact writers for synthetic cache files used by unit tests.

use std::path::{Path, PathBuf};

use crate::cache::codec::{FOLDER_LAYOUT, SINGLE_LAYOUT};

pub(crate) fn push_string(out: &mut Vec<u8>, s: &str) {
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
}

/// Single-file cache: `scans` are (scan, rt), `records` (mass, intensity, scan)
pub(crate) fn single_cache(scans: &[(i32, f32)], records: &[(f64, f32, i32)]) -> Vec<u8> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
    let per_page = SINGLE_LAYOUT.page_size as usize / SINGLE_LAYOUT.record_size;

    let mut out = Vec::new();
    push_string(&mut out, "RCH0");
    out.extend_from_slice(&(scans.len() as i32).to_le_bytes());
    for &(scan, rt) in scans {
        out.extend_from_slice(&scan.to_le_bytes());
        out.extend_from_slice(&rt.to_le_bytes());
    }
    let pages: Vec<&[(f64, f32, i32)]> = sorted.chunks(per_page).collect();
    out.extend_from_slice(&(pages.len() as i32).to_le_bytes());
    for page in &pages {
        out.extend_from_slice(&page[0].0.to_le_bytes());
    }
    for &(mass, intensity, scan) in &sorted {
        out.extend_from_slice(&mass.to_le_bytes());
        out.extend_from_slice(&intensity.to_le_bytes());
        out.extend_from_slice(&(scan as f32).to_le_bytes());
    }
    out
}

/// One acquisition of a synthetic folder cache
pub(crate) struct FolderMember<'a> {
    pub id: i32,
    pub name: &'a str,
    pub scans: Vec<(i32, f64)>,
}

/// Folder cache: `records` are (mass, intensity, scan, file id)
pub(crate) fn folder_cache(members: &[FolderMember<'_>], records: &[(f64, f32, i32, i32)]) -> Vec<u8> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
    let per_page = FOLDER_LAYOUT.page_size as usize / FOLDER_LAYOUT.record_size;

    let mut out = Vec::new();
    push_string(&mut out, "RCH1");
    out.extend_from_slice(&(members.len() as i32).to_le_bytes());
    for member in members {
        out.extend_from_slice(&member.id.to_le_bytes());
        push_string(&mut out, &format!("C:\\data\\{}.raw", member.name));
        out.extend_from_slice(&(member.scans.len() as i32).to_le_bytes());
        for &(scan, rt) in &member.scans {
            out.extend_from_slice(&scan.to_le_bytes());
            out.extend_from_slice(&rt.to_le_bytes());
        }
    }
    let pages: Vec<&[(f64, f32, i32, i32)]> = sorted.chunks(per_page).collect();
    out.extend_from_slice(&(pages.len() as i32).to_le_bytes());
    for page in &pages {
        out.extend_from_slice(&page[0].0.to_le_bytes());
    }
    for &(mass, intensity, scan, id) in &sorted {
        out.extend_from_slice(&mass.to_le_bytes());
        out.extend_from_slice(&intensity.to_le_bytes());
        out.extend_from_slice(&scan.to_le_bytes());
        out.extend_from_slice(&id.to_le_bytes());
    }
    out
}

/// Ten survey scans, one per 0.5 min starting at scan 1
pub(crate) fn survey_scans() -> Vec<(i32, f64)> {
    (1..=10).map(|s| (s, f64::from(s) * 0.5)).collect()
}

/// Write bytes under `dir`, returning the path
pub(crate) fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

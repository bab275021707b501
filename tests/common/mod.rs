//! Writers for synthetic cache and mzML files shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Records per page of a single-acquisition cache
pub const SINGLE_PER_PAGE: usize = 65536 / 16;
/// Records per page of a folder cache
pub const FOLDER_PER_PAGE: usize = 64000 / 20;

fn push_string(out: &mut Vec<u8>, s: &str) {
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

/// Survey scans 1..=n, one every 0.5 minutes
pub fn survey_scans(n: i32) -> Vec<(i32, f64)> {
    (1..=n).map(|s| (s, f64::from(s) * 0.5)).collect()
}

/// Bytes of an `RCH0` cache; `records` are (mass, intensity, scan)
pub fn single_cache_bytes(scans: &[(i32, f64)], records: &[(f64, f32, i32)]) -> Vec<u8> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut out = Vec::new();
    push_string(&mut out, "RCH0");
    out.extend_from_slice(&(scans.len() as i32).to_le_bytes());
    for &(scan, rt) in scans {
        out.extend_from_slice(&scan.to_le_bytes());
        out.extend_from_slice(&(rt as f32).to_le_bytes());
    }
    let pages: Vec<_> = sorted.chunks(SINGLE_PER_PAGE).collect();
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

/// One acquisition of a folder cache
pub struct Member {
    pub id: i32,
    pub name: String,
    pub scans: Vec<(i32, f64)>,
}

impl Member {
    pub fn new(id: i32, name: &str, scans: Vec<(i32, f64)>) -> Self {
        Self {
            id,
            name: name.to_string(),
            scans,
        }
    }
}

/// Bytes of an `RCH1` folder cache; `records` are (mass, intensity, scan, file id)
pub fn folder_cache_bytes(members: &[Member], records: &[(f64, f32, i32, i32)]) -> Vec<u8> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut out = Vec::new();
    push_string(&mut out, "RCH1");
    out.extend_from_slice(&(members.len() as i32).to_le_bytes());
    for member in members {
        out.extend_from_slice(&member.id.to_le_bytes());
        push_string(&mut out, &format!("D:\\acquisitions\\{}.raw", member.name));
        out.extend_from_slice(&(member.scans.len() as i32).to_le_bytes());
        for &(scan, rt) in &member.scans {
            out.extend_from_slice(&scan.to_le_bytes());
            out.extend_from_slice(&rt.to_le_bytes());
        }
    }
    let pages: Vec<_> = sorted.chunks(FOLDER_PER_PAGE).collect();
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

/// Write bytes under `dir`, creating parent directories
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

/// One centroided spectrum of a synthetic mzML file
#[cfg(feature = "mzml")]
pub struct MzMLSpectrum {
    pub scan: i32,
    pub ms_level: i32,
    pub rt_minutes: f64,
    pub precursor: Option<f64>,
    pub mz: Vec<f64>,
    pub intensity: Vec<f64>,
}

/// A minimal mzML document with 64-bit uncompressed arrays
#[cfg(feature = "mzml")]
pub fn mzml_document(spectra: &[MzMLSpectrum]) -> String {
    use base64::prelude::*;

    let encode = |values: &[f64]| {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        BASE64_STANDARD.encode(bytes)
    };

    let mut body = String::new();
    for (index, s) in spectra.iter().enumerate() {
        let precursor = s
            .precursor
            .map(|mz| {
                format!(
                    r#"<precursorList count="1"><precursor><selectedIonList count="1"><selectedIon><cvParam cvRef="MS" accession="MS:1000744" name="selected ion m/z" value="{mz}"/></selectedIon></selectedIonList></precursor></precursorList>"#
                )
            })
            .unwrap_or_default();
        body.push_str(&format!(
            r#"<spectrum index="{index}" id="scan={scan}" defaultArrayLength="{len}">
<cvParam cvRef="MS" accession="MS:1000511" name="ms level" value="{level}"/>
<cvParam cvRef="MS" accession="MS:1000127" name="centroid spectrum"/>
<scanList count="1"><scan><cvParam cvRef="MS" accession="MS:1000016" name="scan start time" value="{rt}" unitCvRef="UO" unitAccession="UO:0000031" unitName="minute"/></scan></scanList>
{precursor}
<binaryDataArrayList count="2">
<binaryDataArray><cvParam cvRef="MS" accession="MS:1000523" name="64-bit float"/><cvParam cvRef="MS" accession="MS:1000576" name="no compression"/><cvParam cvRef="MS" accession="MS:1000514" name="m/z array"/><binary>{mz}</binary></binaryDataArray>
<binaryDataArray><cvParam cvRef="MS" accession="MS:1000523" name="64-bit float"/><cvParam cvRef="MS" accession="MS:1000576" name="no compression"/><cvParam cvRef="MS" accession="MS:1000515" name="intensity array"/><binary>{intensity}</binary></binaryDataArray>
</binaryDataArrayList>
</spectrum>
"#,
            scan = s.scan,
            len = s.mz.len(),
            level = s.ms_level,
            rt = s.rt_minutes,
            mz = encode(&s.mz),
            intensity = encode(&s.intensity),
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<mzML xmlns="http://psi.hupo.org/ms/mzml" version="1.1.0">
<run id="run"><spectrumList count="{count}">
{body}</spectrumList></run>
</mzML>"#,
        count = spectra.len()
    )
}

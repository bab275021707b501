//! Pull parser turning an mzML document into decoded spectra.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::binary::{decode_array, Compression, Precision};
use super::MzMLError;
use crate::source::raw::ScanMeta;

const MS_LEVEL: &str = "MS:1000511";
const MS1_SPECTRUM: &str = "MS:1000579";
const PROFILE_SPECTRUM: &str = "MS:1000128";
const CENTROID_SPECTRUM: &str = "MS:1000127";
const SCAN_WINDOW_LOWER: &str = "MS:1000501";
const SCAN_WINDOW_UPPER: &str = "MS:1000500";
const FILTER_STRING: &str = "MS:1000512";
const SCAN_START_TIME: &str = "MS:1000016";
const SELECTED_ION_MZ: &str = "MS:1000744";
const MZ_ARRAY: &str = "MS:1000514";
const INTENSITY_ARRAY: &str = "MS:1000515";

/// One spectrum with decoded arrays
#[derive(Debug, Clone)]
pub struct ParsedSpectrum {
    /// Scan metadata
    pub meta: ScanMeta,
    /// m/z values
    pub mz: Vec<f64>,
    /// Intensities, parallel to `mz`
    pub intensity: Vec<f64>,
}

/// Every spectrum of a run plus the acquisition's mass limits
#[derive(Debug, Clone, Default)]
pub struct ParsedRun {
    /// Spectra in document order
    pub spectra: Vec<ParsedSpectrum>,
    /// Lowest scan window lower limit, if any scan declared one
    pub lowest_mass: Option<f64>,
    /// Highest scan window upper limit, if any scan declared one
    pub highest_mass: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ArrayKind {
    Mz,
    Intensity,
    Other,
}

#[derive(Debug)]
struct ArrayContext {
    precision: Precision,
    compression: Compression,
    kind: ArrayKind,
    text: String,
}

impl Default for ArrayContext {
    fn default() -> Self {
        Self {
            precision: Precision::Float64,
            compression: Compression::None,
            kind: ArrayKind::Other,
            text: String::new(),
        }
    }
}

/// Partially parsed `<spectrum>` element
#[derive(Debug, Default)]
struct SpectrumState {
    index: i32,
    id: String,
    array_length: Option<usize>,
    ms_level: i32,
    profile: bool,
    rt: f64,
    filter: Option<String>,
    precursor_mz: Option<f64>,
    mz: Vec<f64>,
    intensity: Vec<f64>,
}

impl SpectrumState {
    /// Native scan number: `scan=` of the native id, else the spectrum index
    fn scan_number(&self) -> i32 {
        self.id
            .find("scan=")
            .and_then(|pos| {
                let digits: String = self.id[pos + 5..]
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect();
                digits.parse().ok()
            })
            .unwrap_or(self.index)
    }

    fn description(&self) -> String {
        let mut out = format!("ID = \"{}\" ", self.id);
        if let Some(filter) = &self.filter {
            out.push_str(&format!("Filter: \"{filter}\" "));
        }
        if let Some(parent) = self.precursor_mz {
            out.push_str(&format!("Parent mass: {parent}"));
        }
        out.trim_end().to_string()
    }

    fn finish(self) -> Result<ParsedSpectrum, MzMLError> {
        if self.mz.len() != self.intensity.len() {
            return Err(MzMLError::InvalidStructure(format!(
                "spectrum {} has {} m/z values and {} intensities",
                self.id,
                self.mz.len(),
                self.intensity.len()
            )));
        }
        let meta = ScanMeta {
            scan: self.scan_number(),
            rt: self.rt,
            ms_level: self.ms_level,
            profile: self.profile,
            precursor_mz: self.precursor_mz,
            description: self.description(),
        };
        Ok(ParsedSpectrum {
            meta,
            mz: self.mz,
            intensity: self.intensity,
        })
    }
}

/// Reads every spectrum of an mzML document, decoding binary arrays eagerly
pub struct MzMLParser<R: BufRead> {
    reader: Reader<R>,
    run: ParsedRun,
}

impl<R: BufRead> MzMLParser<R> {
    /// Create a parser over a buffered reader
    pub fn new(reader: R) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            run: ParsedRun::default(),
        }
    }

    /// Parse the whole document
    pub fn parse(mut self) -> Result<ParsedRun, MzMLError> {
        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    if e.name().as_ref() == b"spectrum" {
                        let index = self.run.spectra.len() as i32;
                        let spectrum = self.parse_spectrum(&e, index)?;
                        self.run.spectra.push(spectrum);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }
        Ok(self.run)
    }

    fn parse_spectrum(
        &mut self,
        start_event: &BytesStart,
        position: i32,
    ) -> Result<ParsedSpectrum, MzMLError> {
        let mut spectrum = SpectrumState {
            index: get_attribute(start_event, "index")?
                .and_then(|s| s.parse().ok())
                .unwrap_or(position),
            id: get_attribute(start_event, "id")?.unwrap_or_default(),
            array_length: get_attribute(start_event, "defaultArrayLength")?
                .and_then(|s| s.parse().ok()),
            ..Default::default()
        };

        let mut depth = 1;
        let mut in_binary = false;
        let mut current_array: Option<ArrayContext> = None;
        let mut buf = Vec::new();

        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    depth += 1;
                    match e.name().as_ref() {
                        b"cvParam" => self.apply_cv_param(e, &mut spectrum, current_array.as_mut())?,
                        b"precursorList" => {
                            let count: usize = get_attribute(e, "count")?
                                .and_then(|s| s.parse().ok())
                                .unwrap_or(0);
                            if count > 1 {
                                return Err(MzMLError::MultiplePrecursors(spectrum.id));
                            }
                        }
                        b"binaryDataArray" => current_array = Some(ArrayContext::default()),
                        b"binary" => in_binary = true,
                        _ => {}
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    if e.name().as_ref() == b"cvParam" {
                        self.apply_cv_param(e, &mut spectrum, current_array.as_mut())?;
                    }
                }
                Ok(Event::Text(ref t)) => {
                    if in_binary {
                        if let Some(ref mut ctx) = current_array {
                            ctx.text.push_str(&t.unescape()?);
                        }
                    }
                }
                Ok(Event::End(ref e)) => {
                    depth -= 1;
                    match e.name().as_ref() {
                        b"spectrum" if depth == 0 => break,
                        b"binary" => in_binary = false,
                        b"binaryDataArray" => {
                            if let Some(ctx) = current_array.take() {
                                store_array(&mut spectrum, ctx)?;
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => {
                    return Err(MzMLError::InvalidStructure(
                        "Unexpected EOF in spectrum".to_string(),
                    ));
                }
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }

        spectrum.finish()
    }

    fn apply_cv_param(
        &mut self,
        e: &BytesStart,
        spectrum: &mut SpectrumState,
        array: Option<&mut ArrayContext>,
    ) -> Result<(), MzMLError> {
        let Some(accession) = get_attribute(e, "accession")? else {
            return Ok(());
        };

        if let Some(ctx) = array {
            if let Some(precision) = Precision::from_accession(&accession) {
                ctx.precision = precision;
            } else if let Some(compression) = Compression::from_accession(&accession) {
                ctx.compression = compression;
            } else if accession == MZ_ARRAY {
                ctx.kind = ArrayKind::Mz;
            } else if accession == INTENSITY_ARRAY {
                ctx.kind = ArrayKind::Intensity;
            }
            return Ok(());
        }

        match accession.as_str() {
            MS1_SPECTRUM => spectrum.ms_level = 1,
            MS_LEVEL => spectrum.ms_level = parse_value(e, &accession)?,
            PROFILE_SPECTRUM => spectrum.profile = true,
            CENTROID_SPECTRUM => spectrum.profile = false,
            SCAN_WINDOW_LOWER => {
                let low: f64 = parse_value(e, &accession)?;
                self.run.lowest_mass = Some(self.run.lowest_mass.map_or(low, |m| m.min(low)));
            }
            SCAN_WINDOW_UPPER => {
                let high: f64 = parse_value(e, &accession)?;
                self.run.highest_mass = Some(self.run.highest_mass.map_or(high, |m| m.max(high)));
            }
            FILTER_STRING => spectrum.filter = get_attribute(e, "value")?,
            SCAN_START_TIME => {
                let value: f64 = parse_value(e, &accession)?;
                let unit_name = get_attribute(e, "unitName")?;
                let unit_accession = get_attribute(e, "unitAccession")?;
                spectrum.rt = match (unit_name.as_deref(), unit_accession.as_deref()) {
                    (Some("minute"), _) | (_, Some("UO:0000031")) => value,
                    (Some("second"), _) | (_, Some("UO:0000010")) => value / 60.0,
                    (unit, _) => {
                        return Err(MzMLError::InvalidAttributeValue(format!(
                            "unknown unit \"{}\" for retention time",
                            unit.unwrap_or_default()
                        )))
                    }
                };
            }
            SELECTED_ION_MZ => spectrum.precursor_mz = Some(parse_value(e, &accession)?),
            _ => {}
        }
        Ok(())
    }
}

fn store_array(spectrum: &mut SpectrumState, ctx: ArrayContext) -> Result<(), MzMLError> {
    if ctx.kind == ArrayKind::Other {
        return Ok(());
    }
    let values = decode_array(&ctx.text, ctx.precision, ctx.compression, spectrum.array_length)?;
    match ctx.kind {
        ArrayKind::Mz => spectrum.mz = values,
        ArrayKind::Intensity => spectrum.intensity = values,
        ArrayKind::Other => {}
    }
    Ok(())
}

/// Get an attribute value from an XML element
fn get_attribute(e: &BytesStart, name: &str) -> Result<Option<String>, MzMLError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MzMLError::XmlError(quick_xml::Error::from(e)))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = std::str::from_utf8(&attr.value)?.to_string();
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn parse_value<T: std::str::FromStr>(e: &BytesStart, accession: &str) -> Result<T, MzMLError> {
    let value = get_attribute(e, "value")?.unwrap_or_default();
    value.trim().parse().map_err(|_| {
        MzMLError::InvalidAttributeValue(format!("{accession} value \"{value}\""))
    })
}

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};

use super::{get_attribute, parse_cv_param, MzMLError, MzMLStreamer};
use crate::mzml::binary::{decode_array, ArrayCompression, ArrayPrecision};
use crate::mzml::cv_params::{accession, retention_time_minutes, CvParam};
use crate::mzml::models::MzMLSpectrum;

/// Where inside a `<spectrum>` the parser currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Spectrum,
    Scan,
    /// precursorList/productList: terms there describe other ions, not this scan
    Ignored,
    BinaryArray,
}

impl<R: BufRead> MzMLStreamer<R> {
    /// Read the next spectrum from the stream
    pub fn next_spectrum(&mut self) -> Result<Option<MzMLSpectrum>, MzMLError> {
        if !self.header_read {
            self.read_run_header()?;
        }
        if !self.in_spectrum_list {
            return Ok(None);
        }

        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"spectrum" => {
                    let spectrum = self.parse_spectrum(e)?;
                    self.current_spectrum_index += 1;
                    return Ok(Some(spectrum));
                }
                Ok(Event::End(ref e)) if e.name().as_ref() == b"spectrumList" => {
                    self.in_spectrum_list = false;
                    return Ok(None);
                }
                Ok(Event::Eof) => {
                    self.in_spectrum_list = false;
                    return Ok(None);
                }
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Parse a single spectrum element
    fn parse_spectrum(&mut self, start: &BytesStart) -> Result<MzMLSpectrum, MzMLError> {
        let mut spectrum = MzMLSpectrum {
            index: get_attribute(start, "index")?
                .and_then(|s| s.parse().ok())
                .unwrap_or(self.current_spectrum_index),
            id: get_attribute(start, "id")?.unwrap_or_default(),
            default_array_length: get_attribute(start, "defaultArrayLength")?
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            ..Default::default()
        };

        let mut depth = 1usize;
        let mut section = Section::Spectrum;
        let mut ignored_depth = 0usize;
        let mut array: Option<BinaryArrayContext> = None;
        let mut in_binary = false;
        let mut buf = Vec::new();

        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    depth += 1;
                    match e.name().as_ref() {
                        b"cvParam" => {
                            let cv = parse_cv_param(e)?;
                            apply_cv_param(&mut spectrum, array.as_mut(), section, cv);
                        }
                        b"scanList" if section == Section::Spectrum => section = Section::Scan,
                        b"precursorList" | b"productList" if section != Section::Ignored => {
                            section = Section::Ignored;
                            ignored_depth = depth;
                        }
                        b"binaryDataArray" if section != Section::Ignored => {
                            section = Section::BinaryArray;
                            array = Some(BinaryArrayContext::default());
                        }
                        b"binary" => in_binary = true,
                        _ => {}
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    if e.name().as_ref() == b"cvParam" {
                        let cv = parse_cv_param(e)?;
                        apply_cv_param(&mut spectrum, array.as_mut(), section, cv);
                    }
                }
                Ok(Event::Text(ref t)) => {
                    if in_binary {
                        if let Some(ref mut ctx) = array {
                            ctx.base64.push_str(&t.unescape()?);
                        }
                    }
                }
                Ok(Event::End(ref e)) => {
                    match e.name().as_ref() {
                        b"spectrum" if depth == 1 => break,
                        b"scanList" if section == Section::Scan => section = Section::Spectrum,
                        b"precursorList" | b"productList"
                            if section == Section::Ignored && depth == ignored_depth =>
                        {
                            section = Section::Spectrum;
                        }
                        b"binary" => in_binary = false,
                        b"binaryDataArray" if section == Section::BinaryArray => {
                            section = Section::Spectrum;
                            if let Some(ctx) = array.take() {
                                ctx.decode_into(&mut spectrum)?;
                            }
                        }
                        _ => {}
                    }
                    depth = depth.saturating_sub(1);
                }
                Ok(Event::Eof) => {
                    return Err(MzMLError::InvalidStructure(format!(
                        "Unexpected EOF in spectrum {}",
                        spectrum.id
                    )));
                }
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(spectrum)
    }
}

fn apply_cv_param(
    spectrum: &mut MzMLSpectrum,
    array: Option<&mut BinaryArrayContext>,
    section: Section,
    cv: CvParam,
) {
    match section {
        Section::Ignored => {}
        Section::BinaryArray => {
            if let Some(ctx) = array {
                ctx.cv_params.push(cv);
            }
        }
        Section::Scan => match cv.accession.as_str() {
            accession::SCAN_START_TIME => {
                spectrum.retention_time = cv
                    .value_as_f64()
                    .map(|v| retention_time_minutes(v, cv.unit_accession.as_deref()));
            }
            accession::SCAN_WINDOW_LOWER_LIMIT => spectrum.scan_window_lower = cv.value_as_f64(),
            accession::SCAN_WINDOW_UPPER_LIMIT => spectrum.scan_window_upper = cv.value_as_f64(),
            _ => apply_spectrum_cv_param(spectrum, &cv),
        },
        Section::Spectrum => apply_spectrum_cv_param(spectrum, &cv),
    }
}

fn apply_spectrum_cv_param(spectrum: &mut MzMLSpectrum, cv: &CvParam) {
    match cv.accession.as_str() {
        accession::MS_LEVEL => {
            spectrum.ms_level = cv.value_as_i64().map(|v| v as i16).unwrap_or(1);
        }
        accession::POSITIVE_SCAN => spectrum.polarity = 1,
        accession::NEGATIVE_SCAN => spectrum.polarity = -1,
        accession::FILTER_STRING => spectrum.filter_string = cv.value.clone(),
        _ => {}
    }
}

/// cvParams and text collected for one `<binaryDataArray>`
#[derive(Debug, Default)]
struct BinaryArrayContext {
    cv_params: Vec<CvParam>,
    base64: String,
}

impl BinaryArrayContext {
    fn decode_into(self, spectrum: &mut MzMLSpectrum) -> Result<(), MzMLError> {
        let mut precision = ArrayPrecision::default();
        let mut compression = ArrayCompression::default();
        let mut is_mz = false;
        let mut is_intensity = false;

        for cv in &self.cv_params {
            if let Some(p) = ArrayPrecision::from_accession(&cv.accession) {
                precision = p;
            } else if let Some(c) = ArrayCompression::from_accession(&cv.accession) {
                compression = c;
            } else {
                match cv.accession.as_str() {
                    accession::MZ_ARRAY => is_mz = true,
                    accession::INTENSITY_ARRAY => is_intensity = true,
                    _ => {}
                }
            }
        }

        // time arrays, charge arrays and the like are not needed for traces
        if !is_mz && !is_intensity {
            return Ok(());
        }

        let values = decode_array(
            &self.base64,
            precision,
            compression,
            Some(spectrum.default_array_length),
        )
        .map_err(|source| MzMLError::BinaryError {
            spectrum_id: spectrum.id.clone(),
            source,
        })?;

        if is_mz {
            spectrum.mz_array = values;
        } else {
            spectrum.intensity_array = values;
        }
        Ok(())
    }
}

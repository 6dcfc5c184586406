//! Streaming mzML parser using quick-xml
//!
//! Spectra are pulled one at a time so that a full acquisition never has to
//! be held as XML in memory; callers keep only the decoded arrays they need.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::cv_params::CvParam;
use super::models::MzMLRunInfo;

pub use error::MzMLError;
pub use iterators::SpectrumIterator;

mod error;
mod iterators;
mod spectrum;


/// Read buffer used when opening files from disk
const INPUT_BUFFER_SIZE: usize = 64 * 1024;

/// Streaming parser for mzML files
pub struct MzMLStreamer<R: BufRead> {
    reader: Reader<R>,
    run_info: MzMLRunInfo,
    header_read: bool,
    in_spectrum_list: bool,
    current_spectrum_index: i64,
}

impl MzMLStreamer<BufReader<File>> {
    /// Open an mzML file for streaming (read-only)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MzMLError> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::with_capacity(INPUT_BUFFER_SIZE, file))
    }
}

impl<R: BufRead> MzMLStreamer<R> {
    /// Create a new streamer from a BufRead source
    pub fn new(reader: R) -> Result<Self, MzMLError> {
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.config_mut().trim_text(true);

        Ok(Self {
            reader: xml_reader,
            run_info: MzMLRunInfo::default(),
            header_read: false,
            in_spectrum_list: false,
            current_spectrum_index: 0,
        })
    }

    /// Advance to the start of `spectrumList`, recording run-level attributes.
    ///
    /// Called implicitly by the first `next_spectrum`; calling it again is a no-op.
    pub fn read_run_header(&mut self) -> Result<&MzMLRunInfo, MzMLError> {
        if self.header_read {
            return Ok(&self.run_info);
        }
        self.header_read = true;

        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => match e.name().as_ref() {
                    b"mzML" => {
                        self.run_info.version = get_attribute(e, "version")?;
                    }
                    b"run" => {
                        self.run_info.run_id = get_attribute(e, "id")?;
                        self.run_info.start_time_stamp = get_attribute(e, "startTimeStamp")?;
                    }
                    b"spectrumList" => {
                        self.in_spectrum_list = true;
                        self.run_info.spectrum_count =
                            get_attribute(e, "count")?.and_then(|s| s.parse().ok());
                        break;
                    }
                    _ => {}
                },
                Ok(Event::Empty(ref e)) if e.name().as_ref() == b"spectrumList" => {
                    self.run_info.spectrum_count = Some(0);
                    break;
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(&self.run_info)
    }

    /// Run-level header (empty until the header has been read)
    pub fn run_info(&self) -> &MzMLRunInfo {
        &self.run_info
    }

    /// Iterate over all remaining spectra
    pub fn spectra(self) -> SpectrumIterator<R> {
        SpectrumIterator { streamer: self }
    }
}

/// Get an attribute value from a start tag
pub(super) fn get_attribute(e: &BytesStart, name: &str) -> Result<Option<String>, MzMLError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MzMLError::XmlError(quick_xml::Error::from(e)))?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(std::str::from_utf8(&attr.value)?.to_string()));
        }
    }
    Ok(None)
}

/// Parse a cvParam element
pub(super) fn parse_cv_param(e: &BytesStart) -> Result<CvParam, MzMLError> {
    Ok(CvParam {
        accession: get_attribute(e, "accession")?.unwrap_or_default(),
        name: get_attribute(e, "name")?.unwrap_or_default(),
        value: get_attribute(e, "value")?,
        unit_accession: get_attribute(e, "unitAccession")?,
    })
}

//! # mzML Reader
//!
//! Streaming pull-parser for mzML acquisitions, the HUPO-PSI XML format that
//! vendor RAW files are converted to before screening.
//!
//! Only the parts of a run needed to build extracted-ion traces are decoded:
//!
//! ```text
//! mzML
//! └── run
//!     └── spectrumList
//!         └── spectrum*
//!             ├── cvParam*            (ms level, polarity, filter string)
//!             ├── scanList/scan       (scan start time, scan window)
//!             └── binaryDataArrayList
//!                 └── binaryDataArray* (m/z and intensity, base64 + zlib)
//! ```
//!
//! Everything before `spectrumList` (file description, software, instrument
//! configuration) is skipped; chromatograms stored in the file are ignored
//! because traces are always rebuilt from the spectra.

mod binary;
mod cv_params;
mod models;
mod streamer;

pub use binary::{decode_array, ArrayCompression, ArrayPrecision, BinaryDecodeError};
pub use cv_params::{accession, retention_time_minutes, CvParam};
pub use models::{MzMLRunInfo, MzMLSpectrum};
pub use streamer::{MzMLError, MzMLStreamer, SpectrumIterator};

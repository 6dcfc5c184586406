//! Acquisitions as seen by the trace extractor
//!
//! A screening run compares four acquisitions of the same method. Each is
//! reduced to its MS1 scans, ordered by retention time, behind the
//! [`ScanSource`] trait so that vendor readers other than mzML can be
//! plugged in without touching extraction.

use std::fmt;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::mzml::{MzMLError, MzMLSpectrum, MzMLStreamer};

/// Ionisation polarity of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// Positive ion mode (`+`)
    #[serde(rename = "+")]
    Positive,
    /// Negative ion mode (`-`)
    #[serde(rename = "-")]
    Negative,
}

impl Polarity {
    /// Sign used in vendor filter strings
    pub fn symbol(self) -> char {
        match self {
            Polarity::Positive => '+',
            Polarity::Negative => '-',
        }
    }

    /// Parse the sign used in vendor filter strings and panel tables
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s.trim() {
            "+" | "positive" | "pos" => Some(Polarity::Positive),
            "-" | "negative" | "neg" => Some(Polarity::Negative),
            _ => None,
        }
    }

    fn from_mzml(value: i8) -> Option<Self> {
        match value {
            1 => Some(Polarity::Positive),
            -1 => Some(Polarity::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One centroid or profile scan reduced to what extraction needs
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    /// Scan start time in minutes
    pub retention_time: f64,
    /// Ionisation polarity
    pub polarity: Polarity,
    /// MS level
    pub ms_level: u8,
    /// Vendor filter string, when the file carries one
    pub filter_string: Option<String>,
    /// m/z values, ascending
    pub mz: Vec<f64>,
    /// Intensities parallel to `mz`
    pub intensity: Vec<f64>,
}

impl Scan {
    /// Sum of intensities whose m/z lies in `[low, high]`
    pub fn intensity_between(&self, low: f64, high: f64) -> f64 {
        self.mz
            .iter()
            .zip(&self.intensity)
            .filter(|(&mz, _)| mz >= low && mz <= high)
            .map(|(_, &i)| i)
            .sum()
    }
}

/// A read-only acquisition the extractor can pull traces from
pub trait ScanSource {
    /// Display name (usually the file name)
    fn name(&self) -> &str;

    /// MS1 scans ordered by retention time
    fn scans(&self) -> &[Scan];

    /// Whether at least one MS1 scan was acquired in `polarity`
    fn supports(&self, polarity: Polarity) -> bool {
        self.scans().iter().any(|s| s.polarity == polarity)
    }
}

/// Errors raised while loading an acquisition
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    /// Underlying mzML parse failure
    #[error("Failed to read {path}: {source}")]
    MzML {
        /// File that failed
        path: String,
        /// Parser error
        #[source]
        source: MzMLError,
    },

    /// m/z and intensity arrays disagree in length
    #[error("Spectrum {id} has {mz} m/z values but {intensity} intensities")]
    ArrayMismatch {
        /// Native spectrum ID
        id: String,
        /// m/z count
        mz: usize,
        /// intensity count
        intensity: usize,
    },

    /// File holds no usable MS1 scans
    #[error("No MS1 scans with retention time and polarity in {0}")]
    Empty(String),
}

/// An acquisition held in memory as its MS1 scans
#[derive(Debug, Clone)]
pub struct AcquisitionRun {
    name: String,
    scans: Vec<Scan>,
}

impl AcquisitionRun {
    /// Load the MS1 scans of an mzML file.
    ///
    /// Spectra with no polarity or no scan start time cannot be placed in a
    /// trace and are dropped; MSn spectra are dropped as well.
    pub fn from_mzml<P: AsRef<Path>>(path: P) -> Result<Self, AcquisitionError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let wrap = |source: MzMLError| AcquisitionError::MzML {
            path: display.clone(),
            source,
        };

        let streamer = MzMLStreamer::open(path).map_err(wrap)?;
        let mut scans = Vec::new();
        let mut skipped = 0usize;
        for spectrum in streamer.spectra() {
            let spectrum = spectrum.map_err(wrap)?;
            match scan_from_spectrum(spectrum)? {
                Some(scan) => scans.push(scan),
                None => skipped += 1,
            }
        }

        if scans.is_empty() {
            return Err(AcquisitionError::Empty(display.clone()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| display.clone());
        debug!("{}: {} MS1 scans, {} spectra skipped", name, scans.len(), skipped);
        info!("Loaded {} ({} MS1 scans)", name, scans.len());

        Ok(Self::from_scans(name, scans))
    }

    /// Build a run from scans already in memory; non-MS1 scans are dropped
    pub fn from_scans(name: impl Into<String>, mut scans: Vec<Scan>) -> Self {
        scans.retain(|s| s.ms_level == 1);
        scans.sort_by(|a, b| a.retention_time.total_cmp(&b.retention_time));
        Self {
            name: name.into(),
            scans,
        }
    }
}

impl ScanSource for AcquisitionRun {
    fn name(&self) -> &str {
        &self.name
    }

    fn scans(&self) -> &[Scan] {
        &self.scans
    }
}

fn scan_from_spectrum(spectrum: MzMLSpectrum) -> Result<Option<Scan>, AcquisitionError> {
    // a missing ms level cvParam is read as a full scan
    if spectrum.ms_level > 1 {
        return Ok(None);
    }
    let (Some(retention_time), Some(polarity)) = (
        spectrum.retention_time,
        Polarity::from_mzml(spectrum.polarity),
    ) else {
        return Ok(None);
    };
    if spectrum.mz_array.len() != spectrum.intensity_array.len() {
        return Err(AcquisitionError::ArrayMismatch {
            id: spectrum.id,
            mz: spectrum.mz_array.len(),
            intensity: spectrum.intensity_array.len(),
        });
    }

    Ok(Some(Scan {
        retention_time,
        polarity,
        ms_level: 1,
        filter_string: spectrum.filter_string,
        mz: spectrum.mz_array,
        intensity: spectrum.intensity_array,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(rt: f64, polarity: Polarity, ms_level: u8) -> Scan {
        Scan {
            retention_time: rt,
            polarity,
            ms_level,
            filter_string: None,
            mz: vec![100.0, 150.0, 200.0],
            intensity: vec![1.0, 2.0, 4.0],
        }
    }

    #[test]
    fn test_from_scans_sorts_and_keeps_ms1() {
        let run = AcquisitionRun::from_scans(
            "run",
            vec![
                scan(2.0, Polarity::Positive, 1),
                scan(1.0, Polarity::Positive, 1),
                scan(1.5, Polarity::Positive, 2),
            ],
        );
        let rts: Vec<f64> = run.scans().iter().map(|s| s.retention_time).collect();
        assert_eq!(rts, vec![1.0, 2.0]);
        assert_eq!(run.name(), "run");
    }

    #[test]
    fn test_supports_polarity() {
        let run = AcquisitionRun::from_scans("run", vec![scan(1.0, Polarity::Negative, 1)]);
        assert!(run.supports(Polarity::Negative));
        assert!(!run.supports(Polarity::Positive));
    }

    #[test]
    fn test_intensity_between_is_inclusive() {
        let s = scan(1.0, Polarity::Positive, 1);
        assert_eq!(s.intensity_between(100.0, 150.0), 3.0);
        assert_eq!(s.intensity_between(150.5, 199.9), 0.0);
        assert_eq!(s.intensity_between(0.0, 1000.0), 7.0);
    }

    #[test]
    fn test_polarity_symbols() {
        assert_eq!(Polarity::from_symbol("+"), Some(Polarity::Positive));
        assert_eq!(Polarity::from_symbol(" - "), Some(Polarity::Negative));
        assert_eq!(Polarity::from_symbol("x"), None);
        assert_eq!(Polarity::Negative.to_string(), "-");
    }

    #[test]
    fn test_spectrum_without_polarity_is_dropped() {
        let spectrum = MzMLSpectrum {
            ms_level: 1,
            retention_time: Some(1.0),
            polarity: 0,
            ..Default::default()
        };
        assert!(scan_from_spectrum(spectrum).unwrap().is_none());
    }

    #[test]
    fn test_array_mismatch_is_error() {
        let spectrum = MzMLSpectrum {
            id: "scan=3".into(),
            ms_level: 1,
            retention_time: Some(1.0),
            polarity: 1,
            mz_array: vec![1.0, 2.0],
            intensity_array: vec![1.0],
            ..Default::default()
        };
        assert!(matches!(
            scan_from_spectrum(spectrum),
            Err(AcquisitionError::ArrayMismatch { mz: 2, intensity: 1, .. })
        ));
    }
}

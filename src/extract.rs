//! Trace extraction
//!
//! Builds an extracted-ion chromatogram for one substance: every MS1 scan of
//! the requested polarity inside the retention window contributes one point,
//! the summed intensity of its peaks inside the mass window. The trace is
//! then smoothed with a fixed 7-point Gaussian, matching the vendor
//! "type 2" smoothing the screening method was validated with.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::Serialize;

use crate::acquisition::{Polarity, Scan, ScanSource};

/// Points in the smoothing kernel
pub const SMOOTHING_POINTS: usize = 7;

/// Errors raised while extracting a trace
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    /// Retention window start is not before its end
    #[error("Invalid retention window: {start} - {end} (start must be before end)")]
    InvalidRetentionWindow {
        /// Window start (minutes)
        start: f64,
        /// Window end (minutes)
        end: f64,
    },

    /// Mass window is malformed or not ascending
    #[error("Invalid mass window: {0}")]
    InvalidMassWindow(String),

    /// Filter string could not be parsed
    #[error("Invalid scan filter: {0}")]
    InvalidScanFilter(String),

    /// No scan in the acquisition matches the filter
    #[error("Scan filter '{filter}' does not match any scan in {source_name}")]
    UnsupportedScanFilter {
        /// Filter as a vendor string
        filter: String,
        /// Acquisition name
        source_name: String,
    },

    /// Trace columns differ in length or times are not ascending
    #[error("Malformed trace: {0}")]
    MalformedTrace(String),
}

/// Inclusive retention-time window in minutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetentionWindow {
    start: f64,
    end: f64,
}

impl RetentionWindow {
    /// Create a window; `start` must be strictly before `end`
    pub fn new(start: f64, end: f64) -> Result<Self, ExtractError> {
        if !start.is_finite() || !end.is_finite() || start >= end {
            return Err(ExtractError::InvalidRetentionWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window start (minutes)
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Window end (minutes)
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Whether `rt` lies inside the window, bounds included
    pub fn contains(&self, rt: f64) -> bool {
        rt >= self.start && rt <= self.end
    }
}

/// Inclusive m/z window, written `low-high` in panel tables
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MassWindow {
    low: f64,
    high: f64,
}

impl MassWindow {
    /// Create a window; `low` must be strictly below `high`
    pub fn new(low: f64, high: f64) -> Result<Self, ExtractError> {
        if !low.is_finite() || !high.is_finite() || low < 0.0 || low >= high {
            return Err(ExtractError::InvalidMassWindow(format!("{low}-{high}")));
        }
        Ok(Self { low, high })
    }

    /// Lower m/z bound
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Upper m/z bound
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Whether `mz` lies inside the window, bounds included
    pub fn contains(&self, mz: f64) -> bool {
        mz >= self.low && mz <= self.high
    }
}

impl FromStr for MassWindow {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ExtractError::InvalidMassWindow(s.to_string());
        let (low, high) = s.trim().split_once('-').ok_or_else(invalid)?;
        let low: f64 = low.trim().parse().map_err(|_| invalid())?;
        let high: f64 = high.trim().parse().map_err(|_| invalid())?;
        Self::new(low, high).map_err(|_| invalid())
    }
}

impl fmt::Display for MassWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// Full-scan filter: polarity plus acquired scan range.
///
/// Rendered and parsed in the vendor notation,
/// `FTMS + p ESI Full ms [100.0000-670.0000]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanFilter {
    /// Ion mode
    pub polarity: Polarity,
    /// Lower scan-range limit (m/z)
    pub scan_low: f64,
    /// Upper scan-range limit (m/z)
    pub scan_high: f64,
}

impl ScanFilter {
    /// Scan range of the screening method
    pub const DEFAULT_SCAN_RANGE: (f64, f64) = (100.0, 670.0);

    /// Filter over the method's default scan range
    pub fn full_ms(polarity: Polarity) -> Self {
        Self {
            polarity,
            scan_low: Self::DEFAULT_SCAN_RANGE.0,
            scan_high: Self::DEFAULT_SCAN_RANGE.1,
        }
    }

    /// Whether `scan` was acquired under this filter.
    ///
    /// Polarity must agree. When the scan carries a parseable filter string
    /// its scan range must agree as well; scans without one match on
    /// polarity alone.
    pub fn matches(&self, scan: &Scan) -> bool {
        if scan.polarity != self.polarity {
            return false;
        }
        match scan.filter_string.as_deref().map(str::parse::<ScanFilter>) {
            Some(Ok(other)) => {
                (other.scan_low - self.scan_low).abs() < 1e-3
                    && (other.scan_high - self.scan_high).abs() < 1e-3
            }
            _ => true,
        }
    }
}

impl fmt::Display for ScanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FTMS {} p ESI Full ms [{:.4}-{:.4}]",
            self.polarity, self.scan_low, self.scan_high
        )
    }
}

impl FromStr for ScanFilter {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ExtractError::InvalidScanFilter(s.to_string());

        let polarity = s
            .split_whitespace()
            .find_map(Polarity::from_symbol)
            .ok_or_else(invalid)?;

        let open = s.find('[').ok_or_else(invalid)?;
        let close = s[open..].find(']').map(|i| open + i).ok_or_else(invalid)?;
        let range: MassWindow = s[open + 1..close].parse().map_err(|_| invalid())?;

        Ok(Self {
            polarity,
            scan_low: range.low(),
            scan_high: range.high(),
        })
    }
}

/// One trace to pull from an acquisition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceRequest {
    /// Retention window
    pub window: RetentionWindow,
    /// Mass window
    pub mass: MassWindow,
    /// Scan filter
    pub filter: ScanFilter,
}

/// Extracted trace: (retention time, intensity) pairs, time ascending
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChromatogramSlice {
    retention_times: Vec<f64>,
    intensities: Vec<f64>,
}

impl ChromatogramSlice {
    /// Build a slice from parallel columns; times must be ascending
    pub fn new(retention_times: Vec<f64>, intensities: Vec<f64>) -> Result<Self, ExtractError> {
        if retention_times.len() != intensities.len() {
            return Err(ExtractError::MalformedTrace(format!(
                "{} retention times but {} intensities",
                retention_times.len(),
                intensities.len()
            )));
        }
        if retention_times.windows(2).any(|w| w[1] < w[0]) {
            return Err(ExtractError::MalformedTrace(
                "retention times are not ascending".to_string(),
            ));
        }
        Ok(Self {
            retention_times,
            intensities,
        })
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.retention_times.len()
    }

    /// True for a trace with no points
    pub fn is_empty(&self) -> bool {
        self.retention_times.is_empty()
    }

    /// Retention times (minutes)
    pub fn retention_times(&self) -> &[f64] {
        &self.retention_times
    }

    /// Intensities
    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    /// (retention time, intensity) pairs
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.retention_times
            .iter()
            .copied()
            .zip(self.intensities.iter().copied())
    }

    /// Copy of the first `len` points (the whole trace if shorter)
    pub fn truncated(&self, len: usize) -> Self {
        let len = len.min(self.len());
        Self {
            retention_times: self.retention_times[..len].to_vec(),
            intensities: self.intensities[..len].to_vec(),
        }
    }

    /// Highest intensity, 0 for an empty trace
    pub fn max_intensity(&self) -> f64 {
        self.intensities.iter().copied().fold(0.0, f64::max)
    }
}

/// Extract the smoothed trace described by `request` from `source`
pub fn extract<S: ScanSource + ?Sized>(
    source: &S,
    request: &TraceRequest,
) -> Result<ChromatogramSlice, ExtractError> {
    let scans = source.scans();
    if !source.supports(request.filter.polarity)
        || !scans.iter().any(|s| request.filter.matches(s))
    {
        return Err(ExtractError::UnsupportedScanFilter {
            filter: request.filter.to_string(),
            source_name: source.name().to_string(),
        });
    }

    let (retention_times, raw): (Vec<f64>, Vec<f64>) = scans
        .iter()
        .filter(|s| request.window.contains(s.retention_time) && request.filter.matches(s))
        .map(|s| {
            (
                s.retention_time,
                s.intensity_between(request.mass.low(), request.mass.high()),
            )
        })
        .unzip();

    debug!(
        "{}: {} points for {} in {:.2}-{:.2} min",
        source.name(),
        retention_times.len(),
        request.mass,
        request.window.start(),
        request.window.end()
    );

    ChromatogramSlice::new(retention_times, gaussian_smooth(&raw, SMOOTHING_POINTS))
}

/// Gaussian smoothing over `points` samples (σ = (points - 1) / 4).
///
/// At the trace edges the kernel is cut to the samples available and
/// renormalised, so a constant trace stays constant.
pub fn gaussian_smooth(values: &[f64], points: usize) -> Vec<f64> {
    if points < 2 || values.len() < 2 {
        return values.to_vec();
    }
    let half = (points / 2) as isize;
    let sigma = (points - 1) as f64 / 4.0;
    let kernel: Vec<f64> = (-half..=half)
        .map(|k| (-((k * k) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();

    let n = values.len() as isize;
    (0..n)
        .map(|i| {
            let mut sum = 0.0;
            let mut weight = 0.0;
            for (offset, w) in (-half..=half).zip(&kernel) {
                let j = i + offset;
                if (0..n).contains(&j) {
                    sum += w * values[j as usize];
                    weight += w;
                }
            }
            sum / weight
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::AcquisitionRun;

    fn scan(rt: f64, polarity: Polarity, peaks: &[(f64, f64)]) -> Scan {
        Scan {
            retention_time: rt,
            polarity,
            ms_level: 1,
            filter_string: Some(ScanFilter::full_ms(polarity).to_string()),
            mz: peaks.iter().map(|p| p.0).collect(),
            intensity: peaks.iter().map(|p| p.1).collect(),
        }
    }

    fn request(start: f64, end: f64, mass: &str, polarity: Polarity) -> TraceRequest {
        TraceRequest {
            window: RetentionWindow::new(start, end).unwrap(),
            mass: mass.parse().unwrap(),
            filter: ScanFilter::full_ms(polarity),
        }
    }

    #[test]
    fn test_mass_window_parse() {
        let w: MassWindow = "223.1176112863-223.1202887137".parse().unwrap();
        assert_eq!(w.low(), 223.1176112863);
        assert_eq!(w.high(), 223.1202887137);
        assert!(w.contains(223.119));
        assert!(!w.contains(223.2));
    }

    #[test]
    fn test_mass_window_rejects_bad_input() {
        assert!("300-200".parse::<MassWindow>().is_err());
        assert!("200".parse::<MassWindow>().is_err());
        assert!("abc-def".parse::<MassWindow>().is_err());
        assert!(MassWindow::new(5.0, 5.0).is_err());
    }

    #[test]
    fn test_retention_window_validation() {
        assert!(RetentionWindow::new(5.88, 6.48).is_ok());
        assert!(matches!(
            RetentionWindow::new(6.48, 5.88),
            Err(ExtractError::InvalidRetentionWindow { .. })
        ));
        assert!(RetentionWindow::new(1.0, 1.0).is_err());
        assert!(RetentionWindow::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_scan_filter_display_and_parse() {
        let pos = ScanFilter::full_ms(Polarity::Positive);
        assert_eq!(pos.to_string(), "FTMS + p ESI Full ms [100.0000-670.0000]");

        let neg: ScanFilter = "FTMS - p ESI Full ms [100.0000-670.0000]".parse().unwrap();
        assert_eq!(neg, ScanFilter::full_ms(Polarity::Negative));

        assert!("FTMS p ESI Full ms".parse::<ScanFilter>().is_err());
    }

    #[test]
    fn test_scan_filter_matches_range() {
        let mut s = scan(1.0, Polarity::Positive, &[]);
        let filter = ScanFilter::full_ms(Polarity::Positive);
        assert!(filter.matches(&s));

        s.filter_string = Some("FTMS + p ESI Full ms [50.0000-750.0000]".into());
        assert!(!filter.matches(&s));

        s.filter_string = None;
        assert!(filter.matches(&s));
        assert!(!ScanFilter::full_ms(Polarity::Negative).matches(&s));
    }

    #[test]
    fn test_extract_sums_inside_windows() {
        let run = AcquisitionRun::from_scans(
            "sample.mzML",
            vec![
                scan(0.9, Polarity::Positive, &[(200.0, 99.0)]),
                scan(1.0, Polarity::Positive, &[(199.99, 5.0), (200.0, 10.0), (200.01, 1.0)]),
                scan(1.1, Polarity::Negative, &[(200.0, 1000.0)]),
                scan(1.2, Polarity::Positive, &[(200.0, 10.0)]),
                scan(1.5, Polarity::Positive, &[(200.0, 77.0)]),
            ],
        );
        let slice = extract(&run, &request(1.0, 1.2, "199.995-200.005", Polarity::Positive)).unwrap();

        assert_eq!(slice.retention_times(), &[1.0, 1.2]);
        // two equal points stay equal after smoothing
        for v in slice.intensities() {
            assert!((v - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_extract_unsupported_polarity() {
        let run = AcquisitionRun::from_scans(
            "sample.mzML",
            vec![scan(1.0, Polarity::Positive, &[(200.0, 1.0)])],
        );
        let err = extract(&run, &request(0.0, 2.0, "199-201", Polarity::Negative)).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedScanFilter { .. }));
    }

    #[test]
    fn test_extract_empty_window() {
        let run = AcquisitionRun::from_scans(
            "sample.mzML",
            vec![scan(1.0, Polarity::Positive, &[(200.0, 1.0)])],
        );
        let slice = extract(&run, &request(5.0, 6.0, "199-201", Polarity::Positive)).unwrap();
        assert!(slice.is_empty());
    }

    #[test]
    fn test_gaussian_smooth_spreads_impulse() {
        let mut impulse = vec![0.0; 13];
        impulse[6] = 1.0;
        let smoothed = gaussian_smooth(&impulse, SMOOTHING_POINTS);

        assert_eq!(smoothed.len(), 13);
        assert!(smoothed[6] < 1.0);
        assert!(smoothed[5] > 0.0 && smoothed[7] > 0.0);
        assert!((smoothed[5] - smoothed[7]).abs() < 1e-12);
        assert_eq!(smoothed[0], 0.0);
        assert!((smoothed.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_gaussian_smooth_keeps_constant() {
        let smoothed = gaussian_smooth(&[3.0; 5], SMOOTHING_POINTS);
        for v in smoothed {
            assert!((v - 3.0).abs() < 1e-12);
        }
        assert_eq!(gaussian_smooth(&[4.0], SMOOTHING_POINTS), vec![4.0]);
    }

    #[test]
    fn test_slice_validation_and_truncation() {
        assert!(ChromatogramSlice::new(vec![1.0, 0.5], vec![1.0, 1.0]).is_err());
        assert!(ChromatogramSlice::new(vec![1.0], vec![]).is_err());

        let slice = ChromatogramSlice::new(vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]).unwrap();
        let head = slice.truncated(2);
        assert_eq!(head.intensities(), &[4.0, 5.0]);
        assert_eq!(slice.truncated(10).len(), 3);
        assert_eq!(slice.max_intensity(), 6.0);
        assert_eq!(slice.points().last(), Some((3.0, 6.0)));
    }
}

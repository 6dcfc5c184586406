//! Parsed mzML records

/// Run-level header read before the first spectrum
#[derive(Debug, Clone, Default)]
pub struct MzMLRunInfo {
    /// mzML schema version
    pub version: Option<String>,

    /// `run/@id`
    pub run_id: Option<String>,

    /// `run/@startTimeStamp`
    pub start_time_stamp: Option<String>,

    /// `spectrumList/@count`
    pub spectrum_count: Option<usize>,
}

/// One spectrum, restricted to the fields trace extraction reads
#[derive(Debug, Clone, Default)]
pub struct MzMLSpectrum {
    /// Spectrum index (0-based)
    pub index: i64,

    /// Native spectrum ID from the file
    pub id: String,

    /// Default array length (number of peaks)
    pub default_array_length: usize,

    /// MS level (1 for full scans)
    pub ms_level: i16,

    /// Polarity: 1 for positive, -1 for negative, 0 when not stated
    pub polarity: i8,

    /// Scan start time in minutes
    pub retention_time: Option<f64>,

    /// Vendor filter string (e.g. `FTMS + p ESI Full ms [100.0000-670.0000]`)
    pub filter_string: Option<String>,

    /// Scan window lower limit (m/z)
    pub scan_window_lower: Option<f64>,

    /// Scan window upper limit (m/z)
    pub scan_window_upper: Option<f64>,

    /// m/z array
    pub mz_array: Vec<f64>,

    /// Intensity array
    pub intensity_array: Vec<f64>,
}

impl MzMLSpectrum {
    /// Scan number parsed from the native ID, falling back to index + 1
    pub fn scan_number(&self) -> i64 {
        // "controllerType=0 controllerNumber=1 scan=12345", "scan=12345"
        self.id
            .find("scan=")
            .map(|pos| pos + 5)
            .and_then(|start| {
                let digits: String = self.id[start..]
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                digits.parse().ok()
            })
            .unwrap_or(self.index + 1)
    }
}

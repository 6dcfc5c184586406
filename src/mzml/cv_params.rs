//! PSI-MS controlled vocabulary terms read from spectra

/// A `<cvParam>` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CvParam {
    /// Accession number (e.g., "MS:1000511")
    pub accession: String,

    /// Human-readable name
    pub name: String,

    /// Optional value
    pub value: Option<String>,

    /// Unit accession (e.g., "UO:0000031" for minutes)
    pub unit_accession: Option<String>,
}

impl CvParam {
    /// Get the value as f64 if possible
    pub fn value_as_f64(&self) -> Option<f64> {
        self.value.as_ref()?.trim().parse().ok()
    }

    /// Get the value as i64 if possible
    pub fn value_as_i64(&self) -> Option<i64> {
        self.value.as_ref()?.trim().parse().ok()
    }
}

/// Accessions the reader acts on
pub mod accession {
    /// MS level
    pub const MS_LEVEL: &str = "MS:1000511";
    /// Positive scan
    pub const POSITIVE_SCAN: &str = "MS:1000130";
    /// Negative scan
    pub const NEGATIVE_SCAN: &str = "MS:1000129";
    /// Scan start time
    pub const SCAN_START_TIME: &str = "MS:1000016";
    /// Vendor filter string
    pub const FILTER_STRING: &str = "MS:1000512";
    /// Scan window lower limit
    pub const SCAN_WINDOW_LOWER_LIMIT: &str = "MS:1000501";
    /// Scan window upper limit
    pub const SCAN_WINDOW_UPPER_LIMIT: &str = "MS:1000500";

    /// 32-bit float array
    pub const FLOAT_32_BIT: &str = "MS:1000521";
    /// 64-bit float array
    pub const FLOAT_64_BIT: &str = "MS:1000523";
    /// zlib compression
    pub const ZLIB_COMPRESSION: &str = "MS:1000574";
    /// No compression
    pub const NO_COMPRESSION: &str = "MS:1000576";
    /// MS-Numpress linear prediction
    pub const NUMPRESS_LINEAR: &str = "MS:1002312";
    /// MS-Numpress positive integer
    pub const NUMPRESS_PIC: &str = "MS:1002313";
    /// MS-Numpress short logged float
    pub const NUMPRESS_SLOF: &str = "MS:1002314";
    /// m/z array
    pub const MZ_ARRAY: &str = "MS:1000514";
    /// Intensity array
    pub const INTENSITY_ARRAY: &str = "MS:1000515";

    /// Unit: second
    pub const UNIT_SECOND: &str = "UO:0000010";
    /// Unit: minute
    pub const UNIT_MINUTE: &str = "UO:0000031";
    /// Unit: millisecond
    pub const UNIT_MILLISECOND: &str = "UO:0000028";
}

/// Convert a scan start time to minutes, the unit retention windows are given in.
///
/// A missing unit is read as seconds, which is what the mzML schema mandates
/// for `scan start time` without a unit reference.
pub fn retention_time_minutes(value: f64, unit_accession: Option<&str>) -> f64 {
    match unit_accession {
        Some(accession::UNIT_MINUTE) => value,
        Some(accession::UNIT_MILLISECOND) => value / 60_000.0,
        _ => value / 60.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_parsing() {
        let param = CvParam {
            accession: accession::MS_LEVEL.to_string(),
            name: "ms level".to_string(),
            value: Some(" 1 ".to_string()),
            ..Default::default()
        };
        assert_eq!(param.value_as_i64(), Some(1));
        assert_eq!(param.value_as_f64(), Some(1.0));
    }

    #[test]
    fn test_retention_time_units() {
        assert_eq!(retention_time_minutes(6.2, Some(accession::UNIT_MINUTE)), 6.2);
        assert!((retention_time_minutes(372.0, Some(accession::UNIT_SECOND)) - 6.2).abs() < 1e-12);
        assert!((retention_time_minutes(372_000.0, Some(accession::UNIT_MILLISECOND)) - 6.2).abs() < 1e-12);
        assert!((retention_time_minutes(90.0, None) - 1.5).abs() < 1e-12);
    }
}

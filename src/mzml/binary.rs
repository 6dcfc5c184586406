//! Binary data array decoding
//!
//! Peak arrays in mzML are little-endian IEEE floats, optionally zlib
//! compressed, then Base64 encoded as the text of a `<binary>` element.

use std::io::Read;

use base64::prelude::*;
use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;

use super::cv_params::accession;

/// Compression applied to a binary data array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayCompression {
    /// Raw little-endian floats
    #[default]
    None,
    /// zlib (the usual msconvert output)
    Zlib,
    /// Any MS-Numpress flavour; recognised but not decoded
    Numpress,
}

impl ArrayCompression {
    /// Compression named by a cvParam accession, if it names one
    pub fn from_accession(acc: &str) -> Option<Self> {
        match acc {
            accession::ZLIB_COMPRESSION => Some(Self::Zlib),
            accession::NO_COMPRESSION => Some(Self::None),
            accession::NUMPRESS_LINEAR | accession::NUMPRESS_PIC | accession::NUMPRESS_SLOF => {
                Some(Self::Numpress)
            }
            _ => None,
        }
    }
}

/// Float width of a binary data array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayPrecision {
    /// 32-bit float
    Float32,
    /// 64-bit float
    #[default]
    Float64,
}

impl ArrayPrecision {
    /// Precision named by a cvParam accession, if it names one
    pub fn from_accession(acc: &str) -> Option<Self> {
        match acc {
            accession::FLOAT_32_BIT => Some(Self::Float32),
            accession::FLOAT_64_BIT => Some(Self::Float64),
            _ => None,
        }
    }

    fn width(self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

/// Errors raised while decoding a binary data array
#[derive(Debug, thiserror::Error)]
pub enum BinaryDecodeError {
    /// The element text is not valid Base64
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// zlib stream was truncated or corrupt
    #[error("Decompression error: {0}")]
    Decompression(#[from] std::io::Error),

    /// Byte count does not divide into floats, or disagrees with defaultArrayLength
    #[error("Invalid array length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected number of values (or bytes)
        expected: usize,
        /// Observed number of values (or bytes)
        actual: usize,
    },

    /// Numpress arrays must be re-exported with zlib before screening
    #[error("Unsupported array compression: {0:?}")]
    UnsupportedCompression(ArrayCompression),
}

/// Decode the text of a `<binary>` element into f64 values.
///
/// `expected_len` is the spectrum's `defaultArrayLength`; when given, a
/// mismatch is an error rather than a silently short trace.
pub fn decode_array(
    text: &str,
    precision: ArrayPrecision,
    compression: ArrayCompression,
    expected_len: Option<usize>,
) -> Result<Vec<f64>, BinaryDecodeError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let raw = BASE64_STANDARD.decode(text)?;
    let bytes = match compression {
        ArrayCompression::None => raw,
        ArrayCompression::Zlib => {
            let mut inflated = Vec::with_capacity(raw.len() * 2);
            ZlibDecoder::new(raw.as_slice()).read_to_end(&mut inflated)?;
            inflated
        }
        ArrayCompression::Numpress => {
            return Err(BinaryDecodeError::UnsupportedCompression(compression))
        }
    };

    let values = bytes_to_values(&bytes, precision)?;
    match expected_len {
        Some(expected) if expected != values.len() => Err(BinaryDecodeError::InvalidLength {
            expected,
            actual: values.len(),
        }),
        _ => Ok(values),
    }
}

fn bytes_to_values(bytes: &[u8], precision: ArrayPrecision) -> Result<Vec<f64>, BinaryDecodeError> {
    let width = precision.width();
    if bytes.len() % width != 0 {
        return Err(BinaryDecodeError::InvalidLength {
            expected: bytes.len() / width * width,
            actual: bytes.len(),
        });
    }

    let count = bytes.len() / width;
    let mut cursor = std::io::Cursor::new(bytes);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let value = match precision {
            ArrayPrecision::Float32 => f64::from(cursor.read_f32::<LittleEndian>()?),
            ArrayPrecision::Float64 => cursor.read_f64::<LittleEndian>()?,
        };
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_f64(values: &[f64]) -> String {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        BASE64_STANDARD.encode(bytes)
    }

    #[test]
    fn test_decode_float64_plain() {
        let text = encode_f64(&[223.1189, 223.1190]);
        let values =
            decode_array(&text, ArrayPrecision::Float64, ArrayCompression::None, Some(2)).unwrap();
        assert_eq!(values, vec![223.1189, 223.1190]);
    }

    #[test]
    fn test_decode_float32_plain() {
        // 100.0 and 200.0 as little-endian f32
        let text = "AADIQgAASEM=";
        let values =
            decode_array(text, ArrayPrecision::Float32, ArrayCompression::None, Some(2)).unwrap();
        assert!((values[0] - 100.0).abs() < 1e-6);
        assert!((values[1] - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_zlib() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let values = [1.0e6_f64, 2.5e6, 0.0, 3.0e4];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&bytes).unwrap();
        let text = BASE64_STANDARD.encode(encoder.finish().unwrap());

        let decoded =
            decode_array(&text, ArrayPrecision::Float64, ArrayCompression::Zlib, Some(4)).unwrap();
        assert_eq!(decoded, values.to_vec());
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let text = encode_f64(&[1.0, 2.0, 3.0]);
        let err = decode_array(&text, ArrayPrecision::Float64, ArrayCompression::None, Some(2))
            .unwrap_err();
        assert!(matches!(
            err,
            BinaryDecodeError::InvalidLength { expected: 2, actual: 3 }
        ));
    }

    #[test]
    fn test_numpress_rejected() {
        let err = decode_array("AAAA", ArrayPrecision::Float64, ArrayCompression::Numpress, None)
            .unwrap_err();
        assert!(matches!(err, BinaryDecodeError::UnsupportedCompression(_)));
    }

    #[test]
    fn test_empty_text() {
        let values =
            decode_array("  ", ArrayPrecision::Float64, ArrayCompression::None, None).unwrap();
        assert!(values.is_empty());
    }
}

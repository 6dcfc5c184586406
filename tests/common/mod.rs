//! Synthetic acquisitions for integration tests
#![allow(dead_code)]

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Standard (m/z 200) and target (m/z 300) peak over eight scans
pub const PEAK: [f64; 8] = [1.0, 3.0, 9.0, 20.0, 14.0, 6.0, 2.0, 1.0];

/// One internal standard, one positive target, one negative target
pub const PANEL_CSV: &str = "name,label,rt_start,rt_end,mz_low,mz_high,polarity,cid
IS_A,Standard A,1.0,2.0,199.99,200.01,+,
Target_B,Target B,1.0,2.0,299.99,300.01,+,4242
Target_C,Target C,1.0,2.0,399.99,400.01,-,
";

/// One spectrum of a synthetic run
pub struct SyntheticScan {
    pub rt_minutes: f64,
    pub positive: bool,
    pub ms_level: u8,
    pub peaks: Vec<(f64, f64)>,
}

/// MS1 positive scans at 1.0, 1.1, ... minutes carrying the standard and target
/// intensities, interleaved with MS2 scans that must be ignored
pub fn trace_scans(standard: &[f64], target: &[f64]) -> Vec<SyntheticScan> {
    let mut scans = Vec::new();
    for (i, (&s, &t)) in standard.iter().zip(target).enumerate() {
        let rt = 1.0 + i as f64 * 0.1;
        scans.push(SyntheticScan {
            rt_minutes: rt,
            positive: true,
            ms_level: 1,
            peaks: vec![(150.0, 5.0), (200.0, s), (300.0, t)],
        });
        scans.push(SyntheticScan {
            rt_minutes: rt + 0.05,
            positive: true,
            ms_level: 2,
            peaks: vec![(200.0, 1.0e6), (300.0, 1.0e6)],
        });
    }
    scans
}

fn encode_f64(values: &[f64], zlib: bool) -> String {
    let mut raw = Vec::with_capacity(values.len() * 8);
    for v in values {
        raw.extend_from_slice(&v.to_le_bytes());
    }
    if zlib {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        raw = encoder.finish().unwrap();
    }
    base64::engine::general_purpose::STANDARD.encode(raw)
}

/// Render scans as an mzML document
pub fn mzml_document(scans: &[SyntheticScan], zlib: bool) -> String {
    let compression = if zlib {
        r#"<cvParam cvRef="MS" accession="MS:1000574" name="zlib compression"/>"#
    } else {
        r#"<cvParam cvRef="MS" accession="MS:1000576" name="no compression"/>"#
    };

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>
<mzML xmlns="http://psi.hupo.org/ms/mzml" version="1.1.0">
  <fileDescription><fileContent/></fileDescription>
  <run id="synthetic">
"#);
    writeln!(xml, r#"    <spectrumList count="{}">"#, scans.len()).unwrap();
    for (i, scan) in scans.iter().enumerate() {
        let (polarity_acc, polarity_name, sign) = if scan.positive {
            ("MS:1000130", "positive scan", '+')
        } else {
            ("MS:1000129", "negative scan", '-')
        };
        let mz: Vec<f64> = scan.peaks.iter().map(|p| p.0).collect();
        let intensity: Vec<f64> = scan.peaks.iter().map(|p| p.1).collect();
        writeln!(
            xml,
            r#"      <spectrum index="{i}" id="controllerType=0 controllerNumber=1 scan={scan_no}" defaultArrayLength="{len}">
        <cvParam cvRef="MS" accession="MS:1000511" name="ms level" value="{level}"/>
        <cvParam cvRef="MS" accession="{polarity_acc}" name="{polarity_name}"/>
        <scanList count="1">
          <scan>
            <cvParam cvRef="MS" accession="MS:1000016" name="scan start time" value="{rt}" unitCvRef="UO" unitAccession="UO:0000031" unitName="minute"/>
            <cvParam cvRef="MS" accession="MS:1000512" name="filter string" value="FTMS {sign} p ESI Full ms [100.0000-670.0000]"/>
          </scan>
        </scanList>
        <binaryDataArrayList count="2">
          <binaryDataArray>
            <cvParam cvRef="MS" accession="MS:1000523" name="64-bit float"/>
            {compression}
            <cvParam cvRef="MS" accession="MS:1000514" name="m/z array"/>
            <binary>{mz}</binary>
          </binaryDataArray>
          <binaryDataArray>
            <cvParam cvRef="MS" accession="MS:1000523" name="64-bit float"/>
            {compression}
            <cvParam cvRef="MS" accession="MS:1000515" name="intensity array"/>
            <binary>{intensity}</binary>
          </binaryDataArray>
        </binaryDataArrayList>
      </spectrum>"#,
            scan_no = i + 1,
            len = scan.peaks.len(),
            level = scan.ms_level,
            rt = scan.rt_minutes,
            mz = encode_f64(&mz, zlib),
            intensity = encode_f64(&intensity, zlib),
        )
        .unwrap();
    }
    xml.push_str("    </spectrumList>\n  </run>\n</mzML>\n");
    xml
}

/// Write an mzML file and return its path
pub fn write_mzml(dir: &Path, name: &str, scans: &[SyntheticScan], zlib: bool) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, mzml_document(scans, zlib)).unwrap();
    path
}

/// Write the test panel and return its path
pub fn write_panel(dir: &Path) -> PathBuf {
    let path = dir.join("panel.csv");
    std::fs::write(&path, PANEL_CSV).unwrap();
    path
}

/// Four acquisitions for one screening run
pub struct Acquisitions {
    pub sample: PathBuf,
    pub control: PathBuf,
    pub control_reinj: PathBuf,
    pub control_negative: PathBuf,
}

impl Acquisitions {
    /// Sample and references built from standard/target traces
    pub fn write(
        dir: &Path,
        sample_name: &str,
        sample: (&[f64], &[f64]),
        control: (&[f64], &[f64]),
    ) -> Self {
        let zeros = [0.0; 8];
        Self {
            sample: write_mzml(dir, sample_name, &trace_scans(sample.0, sample.1), true),
            control: write_mzml(dir, "control.mzML", &trace_scans(control.0, control.1), false),
            control_reinj: write_mzml(
                dir,
                "control_reinj.mzML",
                &trace_scans(control.0, control.1),
                true,
            ),
            control_negative: write_mzml(
                dir,
                "control_negative.mzML",
                &trace_scans(control.0, &zeros),
                false,
            ),
        }
    }
}

/// `PEAK` scaled by `factor`
pub fn scaled(factor: f64) -> Vec<f64> {
    PEAK.iter().map(|v| v * factor).collect()
}

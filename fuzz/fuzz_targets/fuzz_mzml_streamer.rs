#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

use dopscreen::acquisition::{AcquisitionRun, Scan};
use dopscreen::mzml::MzMLStreamer;

fuzz_target!(|data: &[u8]| {
    // Any input must parse or fail; never panic
    let Ok(mut streamer) = MzMLStreamer::new(Cursor::new(data)) else {
        return;
    };

    let mut scans = Vec::new();
    for _ in 0..100 {
        match streamer.next_spectrum() {
            Ok(Some(spectrum)) => {
                // Mismatched arrays are rejected by the acquisition layer
                if spectrum.mz_array.len() != spectrum.intensity_array.len() {
                    continue;
                }
                if let (Some(rt), 1) = (spectrum.retention_time, spectrum.ms_level) {
                    scans.push(Scan {
                        retention_time: rt,
                        polarity: if spectrum.polarity < 0 {
                            dopscreen::acquisition::Polarity::Negative
                        } else {
                            dopscreen::acquisition::Polarity::Positive
                        },
                        ms_level: 1,
                        filter_string: spectrum.filter_string,
                        mz: spectrum.mz_array,
                        intensity: spectrum.intensity_array,
                    });
                }
            }
            Ok(None) | Err(_) => break,
        }
    }

    let _ = AcquisitionRun::from_scans("fuzz.mzML", scans);
});

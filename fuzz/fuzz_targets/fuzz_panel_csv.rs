#![no_main]

use libfuzzer_sys::fuzz_target;

use dopscreen::panel::Panel;

fuzz_target!(|data: &[u8]| {
    // Malformed tables must come back as errors
    if let Ok(panel) = Panel::from_reader(data) {
        let _ = panel.to_string();
    }
});

#![no_main]

use heirvault_plan::verify_kit_json;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary kit files must be rejected cleanly.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = verify_kit_json(s);
    }
});

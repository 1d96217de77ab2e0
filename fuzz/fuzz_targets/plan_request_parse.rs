#![no_main]

use heirvault_plan::validate::validate;
use heirvault_plan::{PlanInput, Secp256k1Backend};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    if let Ok(input) = PlanInput::from_untrusted_json(&value) {
        let _ = validate(&input, &Secp256k1Backend::default());
    }
});

#![no_main]

use heirvault_shamir::{combine, decode_share, validate_share};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding and combining user-pasted shares must return Ok or Err, never panic.
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let _ = validate_share(s);
    let _ = decode_share(s);

    let shares: Vec<&str> = s.split_whitespace().collect();
    let _ = combine(&shares);
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use mdkw::keywords::{parse_control_line, MAX_KEYWORDS};

fuzz_target!(|data: &[u8]| {
    // Every accepted line must name a slot inside the table
    for line in data.split_inclusive(|&b| b == b'\n') {
        if let Some((slot, name)) = parse_control_line(line, MAX_KEYWORDS) {
            assert!(slot < MAX_KEYWORDS);
            assert!(!name.is_empty());
        }
    }
});

//! Fuzz target for /proc/[pid]/status capability parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pcaps_core::collect::parse_status_content;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_status_content(s);
    }
});

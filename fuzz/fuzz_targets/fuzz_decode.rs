//! Fuzz target for capability text decoding.
//!
//! Arbitrary text must decode or fail cleanly. Anything that decodes must
//! re-encode to a fixed point.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pcaps_core::caps::TextCodec;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let codec = TextCodec::linux();
    if let Ok(caps) = codec.decode(text) {
        let canonical = codec.encode(&caps);
        let again = codec.decode(&canonical).expect("canonical text must decode");
        assert_eq!(again, caps);
        assert_eq!(codec.encode(&again), canonical);
    }
});

//! Fuzz target for encoding raw kernel masks.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pcaps_core::caps::{exceeds_known, CapabilitySet, TextCodec};

#[derive(Debug, Arbitrary)]
struct Masks {
    effective: u64,
    permitted: u64,
    inheritable: u64,
}

fuzz_target!(|masks: Masks| {
    let (caps, truncated) =
        CapabilitySet::from_kernel_masks(masks.effective, masks.permitted, masks.inheritable);
    assert_eq!(
        truncated,
        exceeds_known(masks.effective | masks.permitted | masks.inheritable)
    );

    let codec = TextCodec::linux();
    let text = codec.encode(&caps);
    assert_eq!(codec.decode(&text).expect("encoded text must decode"), caps);
});

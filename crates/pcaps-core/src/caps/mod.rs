//! Capability-set data model and its text form.
//!
//! - [`CapabilitySet`]: effective/permitted/inheritable bit-vectors
//! - [`CapabilityNameTable`]: index ↔ canonical name mapping
//! - [`TextCodec`]: the grouped `name,name=eip` text encoding

mod codec;
mod names;
mod set;

pub use codec::{TextCodec, EMPTY_MARKER};
pub use names::CapabilityNameTable;
pub use set::{exceeds_known, CapabilitySet, Flag, FlagSignature, IndicesPresent, KNOWN_MASK};

//! Process and capability identifier types.
//!
//! Both identifiers are plain integers at the OS boundary. Wrapping them
//! keeps a pid from ever being passed where a capability bit is expected.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of capability bits this build knows about.
///
/// Mirrors the kernel's enumerated list up to and including
/// `CAP_CHECKPOINT_RESTORE` (40). Each flag vector is a `u64`, so this
/// can never exceed 64.
pub const MAX_CAP: u32 = 41;

const _: () = assert!(MAX_CAP <= 64);

/// Process ID wrapper with display formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Parse a caller-supplied pid token.
    ///
    /// Only strictly positive decimal integers are accepted; `0` is the
    /// kernel's alias for "self" and is treated as invalid input here.
    pub fn parse_token(token: &str) -> Result<Self> {
        match token.trim().parse::<u32>() {
            Ok(pid) if pid > 0 => Ok(ProcessId(pid)),
            _ => Err(Error::InvalidProcessId {
                token: token.to_string(),
            }),
        }
    }

    /// Whether this pid may be handed to a query backend.
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProcessId {
    fn from(pid: u32) -> Self {
        ProcessId(pid)
    }
}

/// Index of a single capability bit.
///
/// Construction is unchecked so out-of-range values can reach the set
/// operations, which report them as `IndexOutOfRange`. Use
/// [`CapabilityIndex::checked`] to validate up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityIndex(u32);

impl CapabilityIndex {
    /// Wrap a raw bit index.
    pub const fn new(raw: u32) -> Self {
        CapabilityIndex(raw)
    }

    /// Wrap a raw bit index, rejecting anything outside `[0, MAX_CAP)`.
    pub fn checked(raw: u32) -> Result<Self> {
        let idx = CapabilityIndex(raw);
        idx.ensure_in_range()?;
        Ok(idx)
    }

    /// Raw bit position.
    pub const fn get(self) -> u32 {
        self.0
    }

    pub fn in_range(self) -> bool {
        self.0 < MAX_CAP
    }

    pub fn ensure_in_range(self) -> Result<()> {
        if self.in_range() {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                index: self.0,
                max: MAX_CAP,
            })
        }
    }

    /// Every index in `[0, MAX_CAP)`, ascending.
    pub fn all() -> impl Iterator<Item = CapabilityIndex> + Clone {
        (0..MAX_CAP).map(CapabilityIndex)
    }
}

impl fmt::Display for CapabilityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! The three-vector capability set.

use pcaps_common::{CapabilityIndex, Result, MAX_CAP};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bits that may legally be set in any vector.
pub const KNOWN_MASK: u64 = if MAX_CAP == 64 {
    u64::MAX
} else {
    (1u64 << MAX_CAP) - 1
};

/// One of the three capability vectors held by a [`CapabilitySet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flag {
    /// Currently active.
    Effective,
    /// Preserved across exec.
    Inheritable,
    /// Allowed to become effective.
    Permitted,
}

impl Flag {
    /// All flags in canonical text order (`e`, `i`, `p`).
    pub const ALL: [Flag; 3] = [Flag::Effective, Flag::Inheritable, Flag::Permitted];

    /// Single-letter code used in capability text.
    pub fn letter(self) -> char {
        match self {
            Flag::Effective => 'e',
            Flag::Inheritable => 'i',
            Flag::Permitted => 'p',
        }
    }

    pub fn from_letter(c: char) -> Option<Flag> {
        match c {
            'e' => Some(Flag::Effective),
            'i' => Some(Flag::Inheritable),
            'p' => Some(Flag::Permitted),
            _ => None,
        }
    }

    /// Position in canonical order.
    pub fn rank(self) -> u8 {
        match self {
            Flag::Effective => 0,
            Flag::Inheritable => 1,
            Flag::Permitted => 2,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Effective => write!(f, "effective"),
            Flag::Inheritable => write!(f, "inheritable"),
            Flag::Permitted => write!(f, "permitted"),
        }
    }
}

/// The (e, i, p) membership of a single capability.
///
/// Displays as its flag suffix, e.g. `ep`; the empty signature displays
/// as an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FlagSignature(u8);

impl FlagSignature {
    pub fn with(self, flag: Flag) -> Self {
        FlagSignature(self.0 | (1 << flag.rank()))
    }

    pub fn contains(self, flag: Flag) -> bool {
        self.0 & (1 << flag.rank()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Flags present, in canonical order.
    pub fn flags(self) -> impl Iterator<Item = Flag> {
        Flag::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl fmt::Display for FlagSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for flag in self.flags() {
            write!(f, "{}", flag.letter())?;
        }
        Ok(())
    }
}

/// Effective, permitted and inheritable bit-vectors over `[0, MAX_CAP)`.
///
/// The vectors are independent: nothing here enforces that an effective
/// capability is also permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet {
    effective: u64,
    permitted: u64,
    inheritable: u64,
}

impl CapabilitySet {
    /// An all-clear set.
    pub const fn empty() -> Self {
        CapabilitySet {
            effective: 0,
            permitted: 0,
            inheritable: 0,
        }
    }

    /// Build a set from raw kernel masks.
    ///
    /// Bits at or above `MAX_CAP` are dropped; use [`exceeds_known`] to
    /// detect that beforehand.
    pub const fn from_masks(effective: u64, permitted: u64, inheritable: u64) -> Self {
        CapabilitySet {
            effective: effective & KNOWN_MASK,
            permitted: permitted & KNOWN_MASK,
            inheritable: inheritable & KNOWN_MASK,
        }
    }

    /// Like [`from_masks`](Self::from_masks), also reporting whether any
    /// vector lost bits to truncation.
    pub fn from_kernel_masks(effective: u64, permitted: u64, inheritable: u64) -> (Self, bool) {
        let truncated = exceeds_known(effective | permitted | inheritable);
        (Self::from_masks(effective, permitted, inheritable), truncated)
    }

    /// Raw bitmask for one vector.
    pub fn mask(&self, flag: Flag) -> u64 {
        match flag {
            Flag::Effective => self.effective,
            Flag::Permitted => self.permitted,
            Flag::Inheritable => self.inheritable,
        }
    }

    fn mask_mut(&mut self, flag: Flag) -> &mut u64 {
        match flag {
            Flag::Effective => &mut self.effective,
            Flag::Permitted => &mut self.permitted,
            Flag::Inheritable => &mut self.inheritable,
        }
    }

    pub fn is_set(&self, flag: Flag, idx: CapabilityIndex) -> Result<bool> {
        idx.ensure_in_range()?;
        Ok(self.mask(flag) & bit(idx) != 0)
    }

    pub fn set(&mut self, flag: Flag, idx: CapabilityIndex) -> Result<()> {
        idx.ensure_in_range()?;
        *self.mask_mut(flag) |= bit(idx);
        Ok(())
    }

    pub fn clear(&mut self, flag: Flag, idx: CapabilityIndex) -> Result<()> {
        idx.ensure_in_range()?;
        *self.mask_mut(flag) &= !bit(idx);
        Ok(())
    }

    /// Indices raised in one vector, ascending.
    ///
    /// The iterator borrows nothing and can be cloned to restart.
    pub fn indices_present(&self, flag: Flag) -> IndicesPresent {
        IndicesPresent {
            remaining: self.mask(flag),
        }
    }

    /// Membership of `idx` across all three vectors.
    pub fn signature(&self, idx: CapabilityIndex) -> Result<FlagSignature> {
        idx.ensure_in_range()?;
        Ok(self.signature_unchecked(idx))
    }

    pub(crate) fn signature_unchecked(&self, idx: CapabilityIndex) -> FlagSignature {
        Flag::ALL
            .into_iter()
            .filter(|flag| self.mask(*flag) & bit(idx) != 0)
            .fold(FlagSignature::default(), FlagSignature::with)
    }

    /// Union of the three vectors: every index with at least one flag.
    pub fn any_mask(&self) -> u64 {
        self.effective | self.permitted | self.inheritable
    }

    pub fn is_empty(&self) -> bool {
        self.any_mask() == 0
    }
}

/// Whether a raw kernel mask carries bits this build cannot name.
pub fn exceeds_known(mask: u64) -> bool {
    mask & !KNOWN_MASK != 0
}

fn bit(idx: CapabilityIndex) -> u64 {
    1u64 << idx.get()
}

/// Ascending iterator over the raised bits of one vector.
#[derive(Debug, Clone)]
pub struct IndicesPresent {
    remaining: u64,
}

impl Iterator for IndicesPresent {
    type Item = CapabilityIndex;

    fn next(&mut self) -> Option<CapabilityIndex> {
        if self.remaining == 0 {
            return None;
        }
        let low = self.remaining.trailing_zeros();
        self.remaining &= self.remaining - 1;
        Some(CapabilityIndex::new(low))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for IndicesPresent {}

#[cfg(test)]
mod tests {
    use super::*;
    use pcaps_common::Error;

    fn idx(raw: u32) -> CapabilityIndex {
        CapabilityIndex::new(raw)
    }

    #[test]
    fn test_empty_set_has_nothing() {
        let set = CapabilitySet::empty();
        assert!(set.is_empty());
        for flag in Flag::ALL {
            assert_eq!(set.indices_present(flag).count(), 0);
            assert!(!set.is_set(flag, idx(0)).unwrap());
        }
    }

    #[test]
    fn test_set_and_clear_are_per_vector() {
        let mut set = CapabilitySet::empty();
        set.set(Flag::Permitted, idx(5)).unwrap();

        assert!(set.is_set(Flag::Permitted, idx(5)).unwrap());
        assert!(!set.is_set(Flag::Effective, idx(5)).unwrap());
        assert!(!set.is_set(Flag::Inheritable, idx(5)).unwrap());

        set.clear(Flag::Permitted, idx(5)).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_out_of_range_rejected_for_every_operation() {
        let mut set = CapabilitySet::empty();
        for raw in [MAX_CAP, MAX_CAP + 1, 63, 64, 1000, u32::MAX] {
            for flag in Flag::ALL {
                assert!(matches!(
                    set.is_set(flag, idx(raw)),
                    Err(Error::IndexOutOfRange { .. })
                ));
                assert!(matches!(
                    set.set(flag, idx(raw)),
                    Err(Error::IndexOutOfRange { .. })
                ));
                assert!(matches!(
                    set.clear(flag, idx(raw)),
                    Err(Error::IndexOutOfRange { .. })
                ));
            }
        }
        assert!(set.is_empty());
    }

    #[test]
    fn test_indices_present_ascending_and_restartable() {
        let mut set = CapabilitySet::empty();
        for raw in [40, 0, 7, 21] {
            set.set(Flag::Effective, idx(raw)).unwrap();
        }

        let iter = set.indices_present(Flag::Effective);
        assert_eq!(iter.len(), 4);
        let first: Vec<u32> = iter.clone().map(CapabilityIndex::get).collect();
        let second: Vec<u32> = iter.map(CapabilityIndex::get).collect();
        assert_eq!(first, vec![0, 7, 21, 40]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_masks_truncates_unknown_bits() {
        let raw = u64::MAX;
        assert!(exceeds_known(raw));
        let set = CapabilitySet::from_masks(raw, 0, 0);
        assert_eq!(set.mask(Flag::Effective), KNOWN_MASK);
        assert_eq!(set.indices_present(Flag::Effective).count(), MAX_CAP as usize);
        assert!(!exceeds_known(KNOWN_MASK));

        let (clean, truncated) = CapabilitySet::from_kernel_masks(0b101, 0, 1 << 3);
        assert!(!truncated);
        assert_eq!(clean.mask(Flag::Inheritable), 1 << 3);

        let (masked, truncated) = CapabilitySet::from_kernel_masks(0, (1 << 63) | 1, 0);
        assert!(truncated);
        assert_eq!(masked.mask(Flag::Permitted), 1);
    }

    #[test]
    fn test_signature_display_order() {
        let sig = FlagSignature::default()
            .with(Flag::Permitted)
            .with(Flag::Effective);
        assert_eq!(sig.to_string(), "ep");

        let all = Flag::ALL
            .into_iter()
            .rev()
            .fold(FlagSignature::default(), FlagSignature::with);
        assert_eq!(all.to_string(), "eip");
        assert!(FlagSignature::default().is_empty());
    }

    #[test]
    fn test_signature_reads_all_vectors() {
        let mut set = CapabilitySet::empty();
        set.set(Flag::Effective, idx(3)).unwrap();
        set.set(Flag::Inheritable, idx(3)).unwrap();

        let sig = set.signature(idx(3)).unwrap();
        assert!(sig.contains(Flag::Effective));
        assert!(sig.contains(Flag::Inheritable));
        assert!(!sig.contains(Flag::Permitted));
        assert_eq!(sig.to_string(), "ei");
    }

    #[test]
    fn test_flag_letters() {
        for flag in Flag::ALL {
            assert_eq!(Flag::from_letter(flag.letter()), Some(flag));
        }
        assert_eq!(Flag::from_letter('x'), None);
        assert_eq!(Flag::Inheritable.to_string(), "inheritable");
    }
}

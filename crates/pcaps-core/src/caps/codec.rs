//! Canonical capability text.
//!
//! # Grammar
//!
//! ```text
//! text    = "=" | group *( " " group )
//! group   = name *( "," name ) "=" flags
//! flags   = [ "e" ] [ "i" ] [ "p" ]      ; at least one letter
//! ```
//!
//! Capabilities sharing the same (e, i, p) membership are coalesced into a
//! single group. Names inside a group are in ascending bit order, and groups
//! are ordered by their lowest bit. A set with nothing raised renders as the
//! lone `=` marker so that "no capabilities" never looks like "no output".
//!
//! Bits without a name in the table are skipped by the encoder.

use super::names::CapabilityNameTable;
use super::set::{CapabilitySet, Flag, FlagSignature};
use pcaps_common::{CapabilityIndex, Error, Result};
use tracing::trace;

/// Text form of a set with no capabilities raised.
pub const EMPTY_MARKER: &str = "=";

const GROUP_SEPARATOR: char = ' ';
const NAME_SEPARATOR: char = ',';
const FLAG_SEPARATOR: char = '=';

/// Encoder/decoder bound to one name table.
#[derive(Debug, Clone, Copy)]
pub struct TextCodec<'t> {
    names: &'t CapabilityNameTable,
}

impl TextCodec<'static> {
    /// Codec over the built-in Linux name table.
    pub fn linux() -> Self {
        TextCodec::new(CapabilityNameTable::linux())
    }
}

impl<'t> TextCodec<'t> {
    pub fn new(names: &'t CapabilityNameTable) -> Self {
        TextCodec { names }
    }

    pub fn names(&self) -> &'t CapabilityNameTable {
        self.names
    }

    /// Render a set in canonical text form. Never fails.
    pub fn encode(&self, caps: &CapabilitySet) -> String {
        let mut groups: Vec<(FlagSignature, Vec<&str>)> = Vec::new();

        for idx in CapabilityIndex::all() {
            let signature = caps.signature_unchecked(idx);
            if signature.is_empty() {
                continue;
            }
            let Some(name) = self.names.get_name(idx) else {
                trace!(index = idx.get(), "skipping unnamed capability bit");
                continue;
            };
            match groups.iter_mut().find(|(sig, _)| *sig == signature) {
                Some((_, members)) => members.push(name),
                None => groups.push((signature, vec![name])),
            }
        }

        if groups.is_empty() {
            return EMPTY_MARKER.to_string();
        }

        let mut out = String::new();
        for (i, (signature, members)) in groups.iter().enumerate() {
            if i > 0 {
                out.push(GROUP_SEPARATOR);
            }
            out.push_str(&members.join(","));
            out.push(FLAG_SEPARATOR);
            out.push_str(&signature.to_string());
        }
        out
    }

    /// Parse canonical text back into a set.
    ///
    /// Leading and trailing whitespace is ignored; everything between must
    /// follow the grammar exactly. Unknown names fail with
    /// `UnknownCapabilityName`, every other violation with
    /// `MalformedCapabilityText` naming the offending fragment.
    pub fn decode(&self, text: &str) -> Result<CapabilitySet> {
        let body = text.trim();
        if body == EMPTY_MARKER {
            return Ok(CapabilitySet::empty());
        }
        if body.is_empty() {
            return Err(Error::malformed(text, "empty capability text"));
        }

        let mut caps = CapabilitySet::empty();
        let mut seen = CapabilitySet::empty();

        for group in body.split(GROUP_SEPARATOR) {
            if group.is_empty() {
                return Err(Error::malformed(body, "groups must be separated by a single space"));
            }
            self.decode_group(group, &mut caps, &mut seen)?;
        }

        Ok(caps)
    }

    fn decode_group(
        &self,
        group: &str,
        caps: &mut CapabilitySet,
        seen: &mut CapabilitySet,
    ) -> Result<()> {
        let Some((names, flags)) = group.split_once(FLAG_SEPARATOR) else {
            return Err(Error::malformed(group, "missing '=' between names and flags"));
        };
        if flags.contains(FLAG_SEPARATOR) {
            return Err(Error::malformed(group, "more than one '='"));
        }
        if names.is_empty() {
            return Err(Error::malformed(group, "no capability names before '='"));
        }
        let signature = parse_flags(group, flags)?;

        for name in names.split(NAME_SEPARATOR) {
            if name.is_empty() {
                return Err(Error::malformed(group, "empty capability name"));
            }
            let idx = self.names.index_of(name)?;
            // `seen` tracks names already consumed, in its effective vector.
            if seen.is_set(Flag::Effective, idx)? {
                return Err(Error::malformed(
                    group,
                    format!("'{}' appears in more than one place", name),
                ));
            }
            seen.set(Flag::Effective, idx)?;
            for flag in signature.flags() {
                caps.set(flag, idx)?;
            }
        }
        Ok(())
    }

    /// Decode then re-encode: the canonical spelling of `text`.
    pub fn canonicalize(&self, text: &str) -> Result<String> {
        self.decode(text).map(|caps| self.encode(&caps))
    }
}

fn parse_flags(group: &str, flags: &str) -> Result<FlagSignature> {
    if flags.is_empty() {
        return Err(Error::malformed(group, "no flags after '='"));
    }

    let mut signature = FlagSignature::default();
    let mut last_rank: Option<u8> = None;
    for c in flags.chars() {
        let Some(flag) = Flag::from_letter(c) else {
            return Err(Error::malformed(group, format!("unknown flag '{}'", c)));
        };
        if last_rank.is_some_and(|last| flag.rank() <= last) {
            return Err(Error::malformed(
                group,
                "flags must appear at most once each, in 'e', 'i', 'p' order",
            ));
        }
        last_rank = Some(flag.rank());
        signature = signature.with(flag);
    }
    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(raw: u32) -> CapabilityIndex {
        CapabilityIndex::new(raw)
    }

    fn named(table: &CapabilityNameTable, name: &str) -> CapabilityIndex {
        table.index_of(name).unwrap()
    }

    #[test]
    fn test_empty_set_encodes_as_marker() {
        let codec = TextCodec::linux();
        assert_eq!(codec.encode(&CapabilitySet::empty()), "=");
    }

    #[test]
    fn test_chown_and_kill_example() {
        let codec = TextCodec::linux();
        let names = codec.names();
        let mut caps = CapabilitySet::empty();
        caps.set(Flag::Effective, named(names, "chown")).unwrap();
        caps.set(Flag::Permitted, named(names, "chown")).unwrap();
        caps.set(Flag::Inheritable, named(names, "kill")).unwrap();

        assert_eq!(codec.encode(&caps), "chown=ep kill=i");
    }

    #[test]
    fn test_identical_signatures_share_a_group() {
        let codec = TextCodec::linux();
        let mut caps = CapabilitySet::empty();
        for raw in [10, 0, 13] {
            caps.set(Flag::Effective, idx(raw)).unwrap();
            caps.set(Flag::Permitted, idx(raw)).unwrap();
        }
        caps.set(Flag::Permitted, idx(5)).unwrap();

        assert_eq!(
            codec.encode(&caps),
            "chown,net_bind_service,net_raw=ep kill=p"
        );
    }

    #[test]
    fn test_groups_ordered_by_lowest_member() {
        let codec = TextCodec::linux();
        let mut caps = CapabilitySet::empty();
        caps.set(Flag::Inheritable, idx(1)).unwrap();
        caps.set(Flag::Effective, idx(2)).unwrap();
        caps.set(Flag::Inheritable, idx(3)).unwrap();

        assert_eq!(
            codec.encode(&caps),
            "dac_override,fowner=i dac_read_search=e"
        );
    }

    #[test]
    fn test_all_flags_suffix() {
        let codec = TextCodec::linux();
        let mut caps = CapabilitySet::empty();
        for flag in Flag::ALL {
            caps.set(flag, idx(21)).unwrap();
        }
        assert_eq!(codec.encode(&caps), "sys_admin=eip");
    }

    #[test]
    fn test_unnamed_bits_skipped_by_sparse_table() {
        let table =
            CapabilityNameTable::from_entries([(idx(0), "chown"), (idx(5), "kill")]).unwrap();
        let codec = TextCodec::new(&table);
        let mut caps = CapabilitySet::empty();
        caps.set(Flag::Effective, idx(0)).unwrap();
        caps.set(Flag::Effective, idx(3)).unwrap();

        assert_eq!(codec.encode(&caps), "chown=e");

        let mut only_unnamed = CapabilitySet::empty();
        only_unnamed.set(Flag::Permitted, idx(3)).unwrap();
        assert_eq!(codec.encode(&only_unnamed), "=");
    }

    #[test]
    fn test_decode_example() {
        let codec = TextCodec::linux();
        let caps = codec.decode("chown=ep kill=i").unwrap();

        assert!(caps.is_set(Flag::Effective, idx(0)).unwrap());
        assert!(caps.is_set(Flag::Permitted, idx(0)).unwrap());
        assert!(!caps.is_set(Flag::Inheritable, idx(0)).unwrap());
        assert!(caps.is_set(Flag::Inheritable, idx(5)).unwrap());
        assert!(!caps.is_set(Flag::Effective, idx(5)).unwrap());
    }

    #[test]
    fn test_decode_empty_marker() {
        let codec = TextCodec::linux();
        assert!(codec.decode("=").unwrap().is_empty());
        assert!(codec.decode(" =\n").unwrap().is_empty());
    }

    #[test]
    fn test_decode_unknown_name() {
        let codec = TextCodec::linux();
        assert!(matches!(
            codec.decode("bogus=ep"),
            Err(Error::UnknownCapabilityName { ref name }) if name == "bogus"
        ));
        assert!(matches!(
            codec.decode("chown,CAP_KILL=e"),
            Err(Error::UnknownCapabilityName { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_malformed_text() {
        let codec = TextCodec::linux();
        let cases = [
            ("", "empty capability text"),
            ("   ", "empty capability text"),
            ("chown=ep  kill=i", "single space"),
            ("chown", "missing '='"),
            ("chown=e=p", "more than one '='"),
            ("=ep", "no capability names"),
            ("chown=", "no flags"),
            ("chown=x", "unknown flag 'x'"),
            ("chown=E", "unknown flag 'E'"),
            ("chown=pe", "'e', 'i', 'p' order"),
            ("chown=ee", "'e', 'i', 'p' order"),
            ("chown,,kill=e", "empty capability name"),
            (",chown=e", "empty capability name"),
            ("chown=e chown=p", "more than one place"),
            ("chown,chown=e", "more than one place"),
            ("= chown=e", "no capability names"),
        ];

        for (text, expected) in cases {
            match codec.decode(text) {
                Err(Error::MalformedCapabilityText { reason, .. }) => {
                    assert!(
                        reason.contains(expected),
                        "{text:?}: reason {reason:?} does not mention {expected:?}"
                    );
                }
                other => panic!("{text:?}: expected MalformedCapabilityText, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_malformed_reports_offending_group() {
        let codec = TextCodec::linux();
        match codec.decode("chown=e kill=q") {
            Err(Error::MalformedCapabilityText { fragment, .. }) => assert_eq!(fragment, "kill=q"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_canonicalize_regroups() {
        let codec = TextCodec::linux();
        assert_eq!(
            codec.canonicalize("kill=ep chown=ep setuid=i").unwrap(),
            "chown,kill=ep setuid=i"
        );
        assert_eq!(codec.canonicalize("=").unwrap(), "=");
    }
}

//! Bidirectional capability index ↔ name table.
//!
//! Names are the kernel's `CAP_*` constants, lowercased and without the
//! `cap_` prefix (`CAP_NET_ADMIN` ↔ `net_admin`). The table is immutable
//! once built; the built-in Linux table is shared process-wide.

use pcaps_common::{CapabilityIndex, Error, Result, MAX_CAP};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Kernel capability names in bit order, `CAP_CHOWN` (0) through
/// `CAP_CHECKPOINT_RESTORE` (40).
const LINUX_CAPABILITY_NAMES: [&str; MAX_CAP as usize] = [
    "chown",
    "dac_override",
    "dac_read_search",
    "fowner",
    "fsetid",
    "kill",
    "setgid",
    "setuid",
    "setpcap",
    "linux_immutable",
    "net_bind_service",
    "net_broadcast",
    "net_admin",
    "net_raw",
    "ipc_lock",
    "ipc_owner",
    "sys_module",
    "sys_rawio",
    "sys_chroot",
    "sys_ptrace",
    "sys_pacct",
    "sys_admin",
    "sys_boot",
    "sys_nice",
    "sys_resource",
    "sys_time",
    "sys_tty_config",
    "mknod",
    "lease",
    "audit_write",
    "audit_control",
    "setfcap",
    "mac_override",
    "mac_admin",
    "syslog",
    "wake_alarm",
    "block_suspend",
    "audit_read",
    "perfmon",
    "bpf",
    "checkpoint_restore",
];

static LINUX_TABLE: OnceLock<CapabilityNameTable> = OnceLock::new();

/// Immutable mapping between capability bits and their canonical names.
///
/// A table may be sparse: bits without an entry simply have no name.
#[derive(Debug, Clone)]
pub struct CapabilityNameTable {
    by_index: Vec<Option<String>>,
    by_name: HashMap<String, CapabilityIndex>,
}

impl CapabilityNameTable {
    /// The compiled-in Linux table.
    pub fn linux() -> &'static CapabilityNameTable {
        LINUX_TABLE.get_or_init(|| {
            Self::from_trusted(
                LINUX_CAPABILITY_NAMES
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (CapabilityIndex::new(i as u32), name.to_string())),
            )
        })
    }

    /// Build a table from `(index, name)` pairs.
    ///
    /// Indices must lie in `[0, MAX_CAP)`, names must be lowercase
    /// `[a-z0-9_]` tokens, and both must be unique.
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (CapabilityIndex, S)>,
        S: Into<String>,
    {
        let mut table = Self::with_capacity();

        for (idx, name) in entries {
            let name = name.into();
            if !idx.in_range() {
                return Err(Error::InvalidNameTable(format!(
                    "index {} for '{}' is outside [0, {})",
                    idx, name, MAX_CAP
                )));
            }
            if !is_canonical_token(&name) {
                return Err(Error::InvalidNameTable(format!(
                    "'{}' is not a lowercase capability token",
                    name
                )));
            }
            if let Some(existing) = &table.by_index[idx.get() as usize] {
                return Err(Error::InvalidNameTable(format!(
                    "index {} named twice ('{}' and '{}')",
                    idx, existing, name
                )));
            }
            if let Some(existing) = table.by_name.get(&name) {
                return Err(Error::InvalidNameTable(format!(
                    "name '{}' used for both {} and {}",
                    name, existing, idx
                )));
            }
            table.insert(idx, name);
        }

        Ok(table)
    }

    fn from_trusted(entries: impl Iterator<Item = (CapabilityIndex, String)>) -> Self {
        let mut table = Self::with_capacity();
        for (idx, name) in entries {
            table.insert(idx, name);
        }
        table
    }

    fn with_capacity() -> Self {
        CapabilityNameTable {
            by_index: vec![None; MAX_CAP as usize],
            by_name: HashMap::new(),
        }
    }

    fn insert(&mut self, idx: CapabilityIndex, name: String) {
        self.by_name.insert(name.clone(), idx);
        self.by_index[idx.get() as usize] = Some(name);
    }

    /// Canonical name for a bit.
    pub fn name_of(&self, idx: CapabilityIndex) -> Result<&str> {
        self.get_name(idx)
            .ok_or(Error::UnknownCapabilityIndex { index: idx.get() })
    }

    /// Like [`name_of`](Self::name_of) but `None` for unnamed bits.
    pub fn get_name(&self, idx: CapabilityIndex) -> Option<&str> {
        self.by_index
            .get(idx.get() as usize)
            .and_then(|slot| slot.as_deref())
    }

    /// Bit for a canonical name. Matching is exact and case-sensitive.
    pub fn index_of(&self, name: &str) -> Result<CapabilityIndex> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownCapabilityName {
                name: name.to_string(),
            })
    }

    /// Named entries in ascending index order.
    pub fn entries(&self) -> impl Iterator<Item = (CapabilityIndex, &str)> + '_ {
        self.by_index.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_deref()
                .map(|name| (CapabilityIndex::new(i as u32), name))
        })
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn is_canonical_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

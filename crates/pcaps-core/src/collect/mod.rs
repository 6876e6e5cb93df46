//! Per-process capability queries.
//!
//! A [`CapabilitySource`] turns a [`ProcessId`] into a [`CapabilitySet`]
//! snapshot. Two backends exist:
//!
//! - [`CapgetSource`]: the `capget(2)` system call (Linux)
//! - [`ProcStatusSource`]: the `Cap*` lines of `/proc/<pid>/status`
//!
//! Every query reads kernel state exactly once and never retries.

pub mod capget;
pub mod proc_status;

pub use capget::{AbiVersion, CapgetSource};
pub use proc_status::{parse_status_content, ProcStatusSource, StatusCaps};

use crate::caps::CapabilitySet;
use crate::config::QueryConfig;
use crate::logging::event_names;
use clap::ValueEnum;
use pcaps_common::{Error, ProcessId, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Something that can read the capability state of a live process.
///
/// Implementations hold no per-query state, so one source may serve many
/// threads at once.
pub trait CapabilitySource: Send + Sync {
    /// Short backend name for logs and reports.
    fn name(&self) -> &'static str;

    /// Snapshot the capabilities of `pid`.
    ///
    /// Fails with `ProcessNotFound`, `PermissionDenied`, or `QueryFailed`
    /// carrying the OS cause. `pid` 0 is rejected up front.
    fn query(&self, pid: ProcessId) -> Result<CapabilitySet>;
}

/// Backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// capget(2) on Linux, unless a proc root was given explicitly
    #[default]
    Auto,
    /// The capget(2) system call
    Capget,
    /// /proc/<pid>/status
    Procfs,
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(SourceKind::Auto),
            "capget" | "syscall" => Ok(SourceKind::Capget),
            "procfs" | "proc" | "status" => Ok(SourceKind::Procfs),
            _ => Err(format!("unknown capability source: {}", s)),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Auto => write!(f, "auto"),
            SourceKind::Capget => write!(f, "capget"),
            SourceKind::Procfs => write!(f, "procfs"),
        }
    }
}

/// Build the backend described by `config`.
pub fn open_source(config: &QueryConfig) -> Result<Box<dyn CapabilitySource>> {
    let source: Box<dyn CapabilitySource> = match config.source {
        SourceKind::Capget => Box::new(CapgetSource::new()?),
        SourceKind::Procfs => Box::new(ProcStatusSource::new(config.proc_root())),
        SourceKind::Auto if config.proc_root_overridden() => {
            Box::new(ProcStatusSource::new(config.proc_root()))
        }
        SourceKind::Auto => Box::new(CapgetSource::new()?),
    };
    debug!(
        target: event_names::SOURCE_OPENED,
        requested = %config.source,
        backend = source.name(),
        "capability source ready"
    );
    Ok(source)
}

/// Reject ids that must never reach the kernel.
pub(crate) fn ensure_queryable(pid: ProcessId) -> Result<()> {
    if pid.is_valid() {
        Ok(())
    } else {
        Err(Error::InvalidProcessId {
            token: pid.to_string(),
        })
    }
}

/// Assemble a set from raw kernel masks, warning about bits we cannot name.
pub(crate) fn from_kernel(
    pid: ProcessId,
    backend: &'static str,
    effective: u64,
    permitted: u64,
    inheritable: u64,
) -> CapabilitySet {
    let (caps, truncated) = CapabilitySet::from_kernel_masks(effective, permitted, inheritable);
    if truncated {
        warn!(
            target: event_names::QUERY_TRUNCATED,
            pid = pid.0,
            backend,
            effective = %format!("{:#x}", effective),
            permitted = %format!("{:#x}", permitted),
            inheritable = %format!("{:#x}", inheritable),
            "kernel reported capabilities beyond the known range; ignoring them"
        );
    }
    caps
}

//! `/proc/<pid>/status` backend.
//!
//! The kernel prints each capability vector as a 16-digit hex mask:
//!
//! ```text
//! CapInh: 0000000000000000
//! CapPrm: 000001ffffffffff
//! CapEff: 000001ffffffffff
//! CapBnd: 000001ffffffffff
//! CapAmb: 0000000000000000
//! ```
//!
//! Only `CapInh`, `CapPrm` and `CapEff` feed the capability set.

use super::{ensure_queryable, CapabilitySource};
use crate::caps::CapabilitySet;
use pcaps_common::{Error, ProcessId, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Capability masks found in a status file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCaps {
    pub inheritable: u64,
    pub permitted: u64,
    pub effective: u64,
    /// Bounding set, when the kernel reports one.
    pub bounding: Option<u64>,
    /// Ambient set (Linux 4.3+).
    pub ambient: Option<u64>,
}

/// Parse status file content (for testing and fuzzing).
///
/// Returns None unless all of `CapInh`, `CapPrm` and `CapEff` are present
/// with valid hex values.
pub fn parse_status_content(content: &str) -> Option<StatusCaps> {
    let mut inheritable = None;
    let mut permitted = None;
    let mut effective = None;
    let mut caps = StatusCaps::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let slot = match key {
            "CapInh" => &mut inheritable,
            "CapPrm" => &mut permitted,
            "CapEff" => &mut effective,
            "CapBnd" => &mut caps.bounding,
            "CapAmb" => &mut caps.ambient,
            _ => continue,
        };
        *slot = Some(parse_hex_mask(value)?);
    }

    caps.inheritable = inheritable?;
    caps.permitted = permitted?;
    caps.effective = effective?;
    Some(caps)
}

fn parse_hex_mask(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() || value.len() > 16 {
        return None;
    }
    u64::from_str_radix(value, 16).ok()
}

/// Reads capabilities from a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcStatusSource {
    proc_root: PathBuf,
}

impl Default for ProcStatusSource {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcStatusSource {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        ProcStatusSource {
            proc_root: proc_root.into(),
        }
    }

    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    fn status_path(&self, pid: ProcessId) -> PathBuf {
        self.proc_root.join(pid.0.to_string()).join("status")
    }

    /// Read and parse the raw masks for `pid`.
    pub fn read_status(&self, pid: ProcessId) -> Result<StatusCaps> {
        let path = self.status_path(pid);
        trace!(pid = pid.0, path = %path.display(), "reading status");
        let content = fs::read_to_string(&path).map_err(|err| map_io_error(pid, err))?;
        parse_status_content(&content).ok_or_else(|| Error::QueryFailed {
            pid: pid.0,
            source: io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} lacks CapInh/CapPrm/CapEff", path.display()),
            ),
        })
    }
}

impl CapabilitySource for ProcStatusSource {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn query(&self, pid: ProcessId) -> Result<CapabilitySet> {
        ensure_queryable(pid)?;
        let status = self.read_status(pid)?;
        trace!(
            pid = pid.0,
            bounding = ?status.bounding,
            ambient = ?status.ambient,
            "vectors outside the capability set"
        );
        Ok(super::from_kernel(
            pid,
            self.name(),
            status.effective,
            status.permitted,
            status.inheritable,
        ))
    }
}

fn map_io_error(pid: ProcessId, err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::NotFound => Error::ProcessNotFound { pid: pid.0 },
        io::ErrorKind::PermissionDenied => Error::PermissionDenied { pid: pid.0 },
        // A process exiting between open and read surfaces as ESRCH.
        #[cfg(unix)]
        _ if err.raw_os_error() == Some(libc::ESRCH) => Error::ProcessNotFound { pid: pid.0 },
        _ => Error::QueryFailed {
            pid: pid.0,
            source: err,
        },
    }
}

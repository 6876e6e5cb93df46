//! `capget(2)` backend.
//!
//! The kernel ABI has three header versions. v1 carries one 32-bit word per
//! vector, v2 and v3 carry two. The version the running kernel prefers is
//! asked for once per process and reused by every query.

use super::{ensure_queryable, CapabilitySource};
use crate::caps::CapabilitySet;
use pcaps_common::{ProcessId, Result};

pub const LINUX_CAPABILITY_VERSION_1: u32 = 0x1998_0330;
pub const LINUX_CAPABILITY_VERSION_2: u32 = 0x2007_1026;
pub const LINUX_CAPABILITY_VERSION_3: u32 = 0x2008_0522;

/// Negotiated `capget` header version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiVersion {
    V1,
    V2,
    V3,
}

impl AbiVersion {
    /// Map the kernel's answer to a version. Unrecognised values mean a
    /// kernel newer than us; v3 is the latest layout we know.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            LINUX_CAPABILITY_VERSION_1 => AbiVersion::V1,
            LINUX_CAPABILITY_VERSION_2 => AbiVersion::V2,
            _ => AbiVersion::V3,
        }
    }

    pub fn magic(self) -> u32 {
        match self {
            AbiVersion::V1 => LINUX_CAPABILITY_VERSION_1,
            AbiVersion::V2 => LINUX_CAPABILITY_VERSION_2,
            AbiVersion::V3 => LINUX_CAPABILITY_VERSION_3,
        }
    }

    /// 32-bit words per vector.
    pub fn words(self) -> usize {
        match self {
            AbiVersion::V1 => 1,
            AbiVersion::V2 | AbiVersion::V3 => 2,
        }
    }
}

/// Queries capabilities with the `capget` system call.
#[derive(Debug, Clone)]
pub struct CapgetSource {
    version: AbiVersion,
}

impl CapgetSource {
    /// Negotiate the ABI (first call only) and build a source.
    ///
    /// Fails with `PlatformUnsupported` off Linux.
    pub fn new() -> Result<Self> {
        imp::negotiate().map(|version| CapgetSource { version })
    }
}

impl CapabilitySource for CapgetSource {
    fn name(&self) -> &'static str {
        "capget"
    }

    fn query(&self, pid: ProcessId) -> Result<CapabilitySet> {
        ensure_queryable(pid)?;
        let (effective, permitted, inheritable) = imp::capget(pid, self.version)?;
        Ok(super::from_kernel(
            pid,
            self.name(),
            effective,
            permitted,
            inheritable,
        ))
    }
}

/// Fold the per-word values of one vector into a 64-bit mask, low word first.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn combine_words(words: impl IntoIterator<Item = u32>) -> u64 {
    words
        .into_iter()
        .take(2)
        .enumerate()
        .fold(0u64, |acc, (i, word)| acc | (u64::from(word) << (32 * i)))
}

#[cfg(target_os = "linux")]
mod imp {
    use super::{combine_words, AbiVersion, LINUX_CAPABILITY_VERSION_3};
    use pcaps_common::{Error, ProcessId, Result};
    use std::io;
    use std::sync::OnceLock;
    use tracing::{debug, trace};

    #[repr(C)]
    struct CapUserHeader {
        version: u32,
        pid: libc::c_int,
    }

    #[repr(C)]
    #[derive(Debug, Default, Clone, Copy)]
    struct CapUserData {
        effective: u32,
        permitted: u32,
        inheritable: u32,
    }

    static NEGOTIATED: OnceLock<AbiVersion> = OnceLock::new();

    pub(super) fn negotiate() -> Result<AbiVersion> {
        Ok(*NEGOTIATED.get_or_init(ask_kernel_version))
    }

    fn ask_kernel_version() -> AbiVersion {
        let mut header = CapUserHeader {
            version: LINUX_CAPABILITY_VERSION_3,
            pid: 0,
        };
        // SAFETY: header is a valid repr(C) struct; a null data pointer asks
        // the kernel only to validate (or rewrite) the version field.
        let rc = unsafe {
            libc::syscall(
                libc::SYS_capget,
                &mut header as *mut CapUserHeader,
                std::ptr::null_mut::<CapUserData>(),
            )
        };
        let version = AbiVersion::from_raw(header.version);
        debug!(
            rc,
            kernel_version = %format!("{:#x}", header.version),
            ?version,
            "negotiated capget ABI"
        );
        version
    }

    pub(super) fn capget(pid: ProcessId, version: AbiVersion) -> Result<(u64, u64, u64)> {
        let raw_pid = libc::c_int::try_from(pid.0).map_err(|_| Error::InvalidProcessId {
            token: pid.to_string(),
        })?;
        let mut header = CapUserHeader {
            version: version.magic(),
            pid: raw_pid,
        };
        let mut data = [CapUserData::default(); 2];

        // SAFETY: `data` has room for two words, the most any known version
        // writes; both pointers are valid for the duration of the call.
        let rc = unsafe {
            libc::syscall(
                libc::SYS_capget,
                &mut header as *mut CapUserHeader,
                data.as_mut_ptr(),
            )
        };
        if rc != 0 {
            return Err(map_errno(pid, io::Error::last_os_error()));
        }

        let used = &data[..version.words()];
        trace!(pid = pid.0, ?used, "capget returned");
        Ok((
            combine_words(used.iter().map(|d| d.effective)),
            combine_words(used.iter().map(|d| d.permitted)),
            combine_words(used.iter().map(|d| d.inheritable)),
        ))
    }

    pub(super) fn map_errno(pid: ProcessId, err: io::Error) -> Error {
        match err.raw_os_error() {
            Some(libc::ESRCH) => Error::ProcessNotFound { pid: pid.0 },
            Some(libc::EPERM) | Some(libc::EACCES) => Error::PermissionDenied { pid: pid.0 },
            _ => Error::QueryFailed {
                pid: pid.0,
                source: err,
            },
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use super::AbiVersion;
    use pcaps_common::{Error, ProcessId, Result};

    pub(super) fn negotiate() -> Result<AbiVersion> {
        Err(unsupported())
    }

    pub(super) fn capget(_pid: ProcessId, _version: AbiVersion) -> Result<(u64, u64, u64)> {
        Err(unsupported())
    }

    fn unsupported() -> Error {
        Error::PlatformUnsupported(format!(
            "capget(2) is only available on Linux (this is {})",
            std::env::consts::OS
        ))
    }
}

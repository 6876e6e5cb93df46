//! Exit codes for the `getpcaps` CLI.
//!
//! Ranges:
//! - 0-2: batch outcomes (parse the outcome from the code, not the output)
//! - 10-19: user/environment errors
//! - 20-29: internal errors (bugs, should be reported)

use pcaps_common::Error;

/// Stable exit codes for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every pid succeeded (or a non-query action completed).
    Clean = 0,

    /// Some pids succeeded, some failed.
    PartialFail = 1,

    /// Every pid failed.
    AllFailed = 2,

    /// Invalid arguments, configuration, or capability text.
    ArgsError = 10,

    /// The requested backend does not exist on this platform.
    PlatformError = 11,

    /// Internal error (bug - please report).
    InternalError = 20,

    /// Could not write output.
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Outcome of a batch with the given success/failure counts.
    pub fn from_batch(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => ExitCode::Clean,
            (0, _) => ExitCode::AllFailed,
            _ => ExitCode::PartialFail,
        }
    }

    /// Exit code for an error that stops the run before or outside a batch.
    pub fn for_error(err: &Error) -> Self {
        match err {
            Error::InvalidProcessId { .. }
            | Error::Config(_)
            | Error::IndexOutOfRange { .. }
            | Error::UnknownCapabilityIndex { .. }
            | Error::UnknownCapabilityName { .. }
            | Error::InvalidNameTable(_)
            | Error::MalformedCapabilityText { .. } => ExitCode::ArgsError,
            Error::PlatformUnsupported(_) => ExitCode::PlatformError,
            Error::Io(_) => ExitCode::IoError,
            Error::ProcessNotFound { .. }
            | Error::PermissionDenied { .. }
            | Error::QueryFailed { .. } => ExitCode::AllFailed,
            Error::Json(_) => ExitCode::InternalError,
        }
    }

    /// Stable name for JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::PartialFail => "ERR_PARTIAL",
            ExitCode::AllFailed => "ERR_ALL_FAILED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::PlatformError => "ERR_PLATFORM",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::PartialFail.as_i32(), 1);
        assert_eq!(ExitCode::AllFailed.as_i32(), 2);
        assert_eq!(ExitCode::ArgsError.as_i32(), 10);
        assert_eq!(ExitCode::PlatformError.as_i32(), 11);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
    }

    #[test]
    fn test_from_batch() {
        assert_eq!(ExitCode::from_batch(3, 0), ExitCode::Clean);
        assert_eq!(ExitCode::from_batch(0, 0), ExitCode::Clean);
        assert_eq!(ExitCode::from_batch(2, 1), ExitCode::PartialFail);
        assert_eq!(ExitCode::from_batch(0, 4), ExitCode::AllFailed);
    }

    #[test]
    fn test_for_error() {
        assert_eq!(
            ExitCode::for_error(&Error::malformed("x", "y")),
            ExitCode::ArgsError
        );
        assert_eq!(
            ExitCode::for_error(&Error::PlatformUnsupported("macos".into())),
            ExitCode::PlatformError
        );
        assert_eq!(
            ExitCode::for_error(&Error::ProcessNotFound { pid: 1 }),
            ExitCode::AllFailed
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::PartialFail.to_string(), "ERR_PARTIAL (1)");
    }
}

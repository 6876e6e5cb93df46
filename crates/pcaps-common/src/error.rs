//! Error types for pcaps.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Permission Denied
//!   Reason: permission denied reading capabilities of process 1
//!   Fix: Run as root or with CAP_SYS_PTRACE, or query a process you own.
//! ```
//!
//! # Machine-Facing Output
//!
//! ```json
//! {
//!   "code": 41,
//!   "category": "query",
//!   "message": "permission denied reading capabilities of process 1",
//!   "recoverable": true,
//!   "suggested_action": "elevate",
//!   "context": { "pid": 1 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for pcaps operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Caller-supplied input that never reached the OS.
    Input,
    /// Capability set and name table misuse.
    Model,
    /// Capability text that cannot be decoded.
    Codec,
    /// Per-process capability query failures.
    Query,
    /// File I/O and serialization errors.
    Io,
    /// Platform compatibility errors.
    Platform,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Codec => write!(f, "codec"),
            ErrorCategory::Query => write!(f, "query"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Platform => write!(f, "platform"),
        }
    }
}

/// Suggested actions for automation reacting to an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Retry the operation.
    Retry,
    /// Request elevated privileges.
    Elevate,
    /// Skip this item and continue.
    Skip,
    /// Correct the supplied input.
    FixInput,
    /// Abort the operation.
    Abort,
    /// Report a bug.
    Report,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::Elevate => write!(f, "elevate"),
            SuggestedAction::Skip => write!(f, "skip"),
            SuggestedAction::FixInput => write!(f, "fix_input"),
            SuggestedAction::Abort => write!(f, "abort"),
            SuggestedAction::Report => write!(f, "report"),
        }
    }
}

/// Unified error type for pcaps.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (10-19)
    #[error("invalid process id '{token}': expected a positive integer")]
    InvalidProcessId { token: String },

    #[error("configuration error: {0}")]
    Config(String),

    // Model errors (20-29)
    #[error("capability index {index} out of range (max {max})")]
    IndexOutOfRange { index: u32, max: u32 },

    #[error("no capability name registered for index {index}")]
    UnknownCapabilityIndex { index: u32 },

    #[error("unknown capability name '{name}'")]
    UnknownCapabilityName { name: String },

    #[error("invalid capability name table: {0}")]
    InvalidNameTable(String),

    // Codec errors (30-39)
    #[error("malformed capability text at '{fragment}': {reason}")]
    MalformedCapabilityText { fragment: String, reason: String },

    // Query errors (40-49)
    #[error("process {pid} not found")]
    ProcessNotFound { pid: u32 },

    #[error("permission denied reading capabilities of process {pid}")]
    PermissionDenied { pid: u32 },

    #[error("capability query for process {pid} failed: {source}")]
    QueryFailed {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Platform errors (70-79)
    #[error("unsupported platform: {0}")]
    PlatformUnsupported(String),
}

impl Error {
    /// Shorthand for a decode failure pinned to a text fragment.
    pub fn malformed(fragment: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedCapabilityText {
            fragment: fragment.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code for this error type.
    ///
    /// - 10-19: Input errors
    /// - 20-29: Model errors
    /// - 30-39: Codec errors
    /// - 40-49: Query errors
    /// - 60-69: I/O errors
    /// - 70-79: Platform errors
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidProcessId { .. } => 10,
            Error::Config(_) => 11,
            Error::IndexOutOfRange { .. } => 20,
            Error::UnknownCapabilityIndex { .. } => 21,
            Error::UnknownCapabilityName { .. } => 22,
            Error::InvalidNameTable(_) => 23,
            Error::MalformedCapabilityText { .. } => 30,
            Error::ProcessNotFound { .. } => 40,
            Error::PermissionDenied { .. } => 41,
            Error::QueryFailed { .. } => 42,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
            Error::PlatformUnsupported(_) => 70,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidProcessId { .. } | Error::Config(_) => ErrorCategory::Input,

            Error::IndexOutOfRange { .. }
            | Error::UnknownCapabilityIndex { .. }
            | Error::UnknownCapabilityName { .. }
            | Error::InvalidNameTable(_) => ErrorCategory::Model,

            Error::MalformedCapabilityText { .. } => ErrorCategory::Codec,

            Error::ProcessNotFound { .. }
            | Error::PermissionDenied { .. }
            | Error::QueryFailed { .. } => ErrorCategory::Query,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,

            Error::PlatformUnsupported(_) => ErrorCategory::Platform,
        }
    }

    /// Returns whether this error is potentially recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::InvalidProcessId { .. } => true, // Fix the argument
            Error::Config(_) => true,

            Error::IndexOutOfRange { .. } => false,
            Error::UnknownCapabilityIndex { .. } => false,
            Error::UnknownCapabilityName { .. } => true, // Fix the text
            Error::InvalidNameTable(_) => false,
            Error::MalformedCapabilityText { .. } => true,

            Error::ProcessNotFound { .. } => false, // Process is gone
            Error::PermissionDenied { .. } => true, // Can elevate
            Error::QueryFailed { .. } => true,

            Error::Io(_) => true,
            Error::Json(_) => false,

            Error::PlatformUnsupported(_) => false,
        }
    }

    /// Returns the suggested action for automation.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::InvalidProcessId { .. }
            | Error::Config(_)
            | Error::UnknownCapabilityName { .. }
            | Error::MalformedCapabilityText { .. } => SuggestedAction::FixInput,

            Error::IndexOutOfRange { .. }
            | Error::UnknownCapabilityIndex { .. }
            | Error::InvalidNameTable(_)
            | Error::Json(_) => SuggestedAction::Report,

            Error::ProcessNotFound { .. } => SuggestedAction::Skip,
            Error::PermissionDenied { .. } => SuggestedAction::Elevate,
            Error::QueryFailed { .. } | Error::Io(_) => SuggestedAction::Retry,

            Error::PlatformUnsupported(_) => SuggestedAction::Abort,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::InvalidProcessId { .. } => {
                "Pass one or more positive decimal process ids, e.g. 'getpcaps 1 $$'."
            }
            Error::Config(_) => {
                "Check the PCAPS_* environment variables and command-line flags."
            }
            Error::IndexOutOfRange { .. } => {
                "Capability indices must be below the compiled-in maximum. This is a bug in the caller."
            }
            Error::UnknownCapabilityIndex { .. } => {
                "The capability name table has no entry for this bit. Use a table that covers it."
            }
            Error::UnknownCapabilityName { .. } => {
                "Use a lowercase capability name without the 'cap_' prefix. List them with 'getpcaps --list-names'."
            }
            Error::InvalidNameTable(_) => {
                "Names and indices in a capability table must each be unique and in range."
            }
            Error::MalformedCapabilityText { .. } => {
                "Expected 'name[,name...]=flags' groups separated by single spaces, flags drawn from 'eip' in that order, or '='."
            }
            Error::ProcessNotFound { .. } => {
                "The process does not exist or has already exited."
            }
            Error::PermissionDenied { .. } => {
                "Run as root or with CAP_SYS_PTRACE, or query a process you own."
            }
            Error::QueryFailed { .. } => {
                "Retry the query. If persistent, try '--source procfs' or check kernel support."
            }
            Error::Io(_) => "Check permissions and that the proc filesystem is mounted.",
            Error::Json(_) => "Internal serialization failure. Please report this as a bug.",
            Error::PlatformUnsupported(_) => {
                "Process capabilities are only available on Linux."
            }
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::InvalidProcessId { .. } => "Invalid Process ID",
            Error::Config(_) => "Configuration Error",
            Error::IndexOutOfRange { .. } => "Capability Index Out Of Range",
            Error::UnknownCapabilityIndex { .. } => "Unknown Capability Index",
            Error::UnknownCapabilityName { .. } => "Unknown Capability Name",
            Error::InvalidNameTable(_) => "Invalid Capability Name Table",
            Error::MalformedCapabilityText { .. } => "Malformed Capability Text",
            Error::ProcessNotFound { .. } => "Process Not Found",
            Error::PermissionDenied { .. } => "Permission Denied",
            Error::QueryFailed { .. } => "Capability Query Failed",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
            Error::PlatformUnsupported(_) => "Unsupported Platform",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Suggested action for automation.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (e.g., pid, errno).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::InvalidProcessId { token } => {
                context.insert("token".to_string(), serde_json::json!(token));
            }
            Error::IndexOutOfRange { index, max } => {
                context.insert("index".to_string(), serde_json::json!(index));
                context.insert("max".to_string(), serde_json::json!(max));
            }
            Error::UnknownCapabilityIndex { index } => {
                context.insert("index".to_string(), serde_json::json!(index));
            }
            Error::UnknownCapabilityName { name } => {
                context.insert("name".to_string(), serde_json::json!(name));
            }
            Error::MalformedCapabilityText { fragment, .. } => {
                context.insert("fragment".to_string(), serde_json::json!(fragment));
            }
            Error::ProcessNotFound { pid } | Error::PermissionDenied { pid } => {
                context.insert("pid".to_string(), serde_json::json!(pid));
            }
            Error::QueryFailed { pid, source } => {
                context.insert("pid".to_string(), serde_json::json!(pid));
                if let Some(errno) = source.raw_os_error() {
                    context.insert("errno".to_string(), serde_json::json!(errno));
                }
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

/// Result of a batch operation that may have partial success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult<T> {
    /// Successfully completed items.
    pub succeeded: Vec<T>,

    /// Failed items with their errors.
    pub failed: Vec<BatchError>,

    /// Summary statistics.
    pub summary: BatchSummary,
}

/// A single error in a batch operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Identifier of the failed item (the token as the caller supplied it).
    pub item_id: String,

    /// The structured error.
    pub error: StructuredError,
}

/// Summary of batch operation results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total items attempted.
    pub total: usize,

    /// Number of successful items.
    pub succeeded: usize,

    /// Number of failed items.
    pub failed: usize,

    /// Whether all items succeeded.
    pub all_succeeded: bool,

    /// Whether any items succeeded.
    pub any_succeeded: bool,
}

impl<T> BatchResult<T> {
    /// Create a new batch result from succeeded and failed items.
    pub fn new(succeeded: Vec<T>, failed: Vec<BatchError>) -> Self {
        let total = succeeded.len() + failed.len();
        let succeeded_count = succeeded.len();
        let failed_count = failed.len();

        BatchResult {
            succeeded,
            failed,
            summary: BatchSummary {
                total,
                succeeded: succeeded_count,
                failed: failed_count,
                all_succeeded: failed_count == 0,
                any_succeeded: succeeded_count > 0,
            },
        }
    }

    /// Add a failure to the batch result.
    pub fn add_failure(&mut self, item_id: impl Into<String>, error: &Error) {
        self.failed.push(BatchError {
            item_id: item_id.into(),
            error: StructuredError::from(error),
        });
        self.summary.failed += 1;
        self.summary.total += 1;
        self.summary.all_succeeded = false;
    }

    /// Add a success to the batch result.
    pub fn add_success(&mut self, item: T) {
        self.succeeded.push(item);
        self.summary.succeeded += 1;
        self.summary.total += 1;
        self.summary.any_succeeded = true;
    }
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}

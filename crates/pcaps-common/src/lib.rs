//! pcaps common types, identifiers, and errors.
//!
//! This crate provides foundational types shared across pcaps modules:
//! - Process and capability identifier types
//! - The unified error taxonomy
//! - Batch reporting structures
//! - Output format selection

pub mod error;
pub mod id;
pub mod output;

pub use error::{
    format_error_human, BatchError, BatchResult, BatchSummary, Error, ErrorCategory, Result,
    StructuredError, SuggestedAction,
};
pub use id::{CapabilityIndex, ProcessId, MAX_CAP};
pub use output::OutputFormat;

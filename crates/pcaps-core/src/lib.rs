//! pcaps core library.
//!
//! - `caps`: capability sets, the name table, and the canonical text codec
//! - `collect`: reading capability state of live processes
//! - `batch`: querying many pids with per-pid failure isolation
//! - `config`, `logging`, `exit_codes`: CLI plumbing
//!
//! The `getpcaps` binary entry point is in `main.rs`.

pub mod batch;
pub mod caps;
pub mod collect;
pub mod config;
pub mod exit_codes;
pub mod logging;

// Re-export test utilities for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock_source;

pub use batch::{query_batch, query_batch_parallel, summarize, PidCapabilities, PidReport};
pub use caps::{CapabilityNameTable, CapabilitySet, Flag, TextCodec};
pub use collect::{open_source, CapabilitySource, CapgetSource, ProcStatusSource, SourceKind};
pub use config::{QueryConfig, QueryOverrides};

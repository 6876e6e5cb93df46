//! Structured event definitions for logging.
//!
//! Events are plain tracing events whose target is one of
//! [`event_names`]; [`LogContext`] supplies the run id and host id that
//! `log_event!` attaches to each of them.

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Phases of a `getpcaps` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Argument parsing and backend selection.
    Init,
    /// Reading capability state from the kernel.
    Query,
    /// Rendering or parsing capability text.
    Encode,
    /// Writing results.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Query => "query",
            Stage::Encode => "encode",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names, used as tracing targets.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_ERROR: &str = "config.error";
    pub const SOURCE_OPENED: &str = "source.opened";

    pub const BATCH_STARTED: &str = "batch.started";
    pub const BATCH_FINISHED: &str = "batch.finished";

    pub const QUERY_STARTED: &str = "query.started";
    pub const QUERY_FINISHED: &str = "query.finished";
    pub const QUERY_FAILED: &str = "query.failed";
    pub const QUERY_TRUNCATED: &str = "query.truncated";

    pub const CODEC_CANONICALIZED: &str = "codec.canonicalized";
    pub const CODEC_REJECTED: &str = "codec.rejected";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Correlation ids shared by every event of one run.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub host_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>, host_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            host_id: host_id.into(),
        }
    }

    /// Context with a fresh run id for this host.
    pub fn for_run() -> Self {
        LogContext::new(super::generate_run_id(), super::get_host_id())
    }
}

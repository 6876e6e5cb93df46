//! Query configuration.
//!
//! There is no config file. Values are layered: built-in defaults, then
//! environment variables, then CLI overrides.
//!
//! | Variable          | Meaning                         |
//! |-------------------|---------------------------------|
//! | `PCAPS_SOURCE`    | `auto`, `capget`, or `procfs`   |
//! | `PCAPS_PROC_ROOT` | procfs mount to read from       |
//! | `PCAPS_JOBS`      | worker threads for batch queries |

use crate::collect::proc_status::DEFAULT_PROC_ROOT;
use crate::collect::SourceKind;
use pcaps_common::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const ENV_SOURCE: &str = "PCAPS_SOURCE";
pub const ENV_PROC_ROOT: &str = "PCAPS_PROC_ROOT";
pub const ENV_JOBS: &str = "PCAPS_JOBS";

/// Upper bound on worker threads.
pub const MAX_JOBS: usize = 256;

/// Values supplied on the command line; `None` defers to env/defaults.
#[derive(Debug, Clone, Default)]
pub struct QueryOverrides {
    pub source: Option<SourceKind>,
    pub proc_root: Option<PathBuf>,
    pub jobs: Option<usize>,
}

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryConfig {
    pub source: SourceKind,
    proc_root: Option<PathBuf>,
    pub jobs: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            source: SourceKind::Auto,
            proc_root: None,
            jobs: 1,
        }
    }
}

impl QueryConfig {
    /// Resolve from the process environment and CLI overrides.
    pub fn from_env(overrides: QueryOverrides) -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok(), overrides)
    }

    /// Resolve using `lookup` in place of the process environment.
    pub fn from_vars<F>(lookup: F, overrides: QueryOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = QueryConfig::default();

        if let Some(val) = lookup(ENV_SOURCE).filter(|v| !v.trim().is_empty()) {
            config.source = val
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("{}: {}", ENV_SOURCE, e)))?;
        }
        if let Some(val) = lookup(ENV_PROC_ROOT).filter(|v| !v.is_empty()) {
            config.proc_root = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup(ENV_JOBS).filter(|v| !v.trim().is_empty()) {
            config.jobs = val
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{}: '{}' is not a count", ENV_JOBS, val)))?;
        }

        if let Some(source) = overrides.source {
            config.source = source;
        }
        if let Some(root) = overrides.proc_root {
            config.proc_root = Some(root);
        }
        if let Some(jobs) = overrides.jobs {
            config.jobs = jobs;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.jobs == 0 || self.jobs > MAX_JOBS {
            return Err(Error::Config(format!(
                "jobs must be between 1 and {} (got {})",
                MAX_JOBS, self.jobs
            )));
        }
        Ok(())
    }

    /// The procfs mount in effect.
    pub fn proc_root(&self) -> &Path {
        self.proc_root
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_PROC_ROOT))
    }

    /// Whether a proc root was set explicitly rather than defaulted.
    pub fn proc_root_overridden(&self) -> bool {
        self.proc_root.is_some()
    }
}

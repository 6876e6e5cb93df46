//! In-memory [`CapabilitySource`] for tests.
//!
//! Pids that were never registered answer `ProcessNotFound`, like a real
//! kernel would for an exited process.

use crate::caps::CapabilitySet;
use crate::collect::CapabilitySource;
use pcaps_common::{Error, ProcessId, Result};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Outcome {
    Caps(CapabilitySet),
    Denied,
    Failed(io::ErrorKind),
}

/// Scripted capability source.
#[derive(Debug, Default)]
pub struct MockCapabilitySource {
    outcomes: HashMap<u32, Outcome>,
    queries: AtomicUsize,
    seen: Mutex<Vec<u32>>,
}

impl MockCapabilitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(mut self, pid: u32, caps: CapabilitySet) -> Self {
        self.outcomes.insert(pid, Outcome::Caps(caps));
        self
    }

    pub fn with_denied(mut self, pid: u32) -> Self {
        self.outcomes.insert(pid, Outcome::Denied);
        self
    }

    /// Make `pid` fail with an OS error of `kind`.
    pub fn with_failure(mut self, pid: u32, kind: io::ErrorKind) -> Self {
        self.outcomes.insert(pid, Outcome::Failed(kind));
        self
    }

    /// Queries answered so far (pid 0 excluded).
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Pids in the order they were queried.
    pub fn queried_pids(&self) -> Vec<u32> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

impl CapabilitySource for MockCapabilitySource {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn query(&self, pid: ProcessId) -> Result<CapabilitySet> {
        crate::collect::ensure_queryable(pid)?;
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(pid.0);
        }

        match self.outcomes.get(&pid.0) {
            Some(Outcome::Caps(caps)) => Ok(*caps),
            Some(Outcome::Denied) => Err(Error::PermissionDenied { pid: pid.0 }),
            Some(Outcome::Failed(kind)) => Err(Error::QueryFailed {
                pid: pid.0,
                source: io::Error::new(*kind, "scripted failure"),
            }),
            None => Err(Error::ProcessNotFound { pid: pid.0 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_outcomes() {
        let caps = CapabilitySet::from_masks(1, 1, 0);
        let source = MockCapabilitySource::new()
            .with_process(10, caps)
            .with_denied(11)
            .with_failure(12, io::ErrorKind::Interrupted);

        assert_eq!(source.query(ProcessId(10)).unwrap(), caps);
        assert!(matches!(
            source.query(ProcessId(11)),
            Err(Error::PermissionDenied { pid: 11 })
        ));
        assert!(matches!(
            source.query(ProcessId(12)),
            Err(Error::QueryFailed { pid: 12, .. })
        ));
        assert!(matches!(
            source.query(ProcessId(13)),
            Err(Error::ProcessNotFound { pid: 13 })
        ));
        assert_eq!(source.query_count(), 4);
        assert_eq!(source.queried_pids(), vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_pid_zero_not_counted() {
        let source = MockCapabilitySource::new();
        assert!(source.query(ProcessId(0)).is_err());
        assert_eq!(source.query_count(), 0);
    }
}

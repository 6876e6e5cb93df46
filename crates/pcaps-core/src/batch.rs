//! Batch query driver.
//!
//! Turns a list of caller-supplied pid tokens into one [`PidReport`] per
//! token, in input order. Each token is parsed, queried and encoded on its
//! own; a failure is recorded against that token and the batch moves on.

use crate::caps::{CapabilitySet, Flag, TextCodec};
use crate::collect::CapabilitySource;
use crate::logging::{event_names, Stage};
use pcaps_common::{BatchResult, ProcessId, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Capabilities of one process, ready for display or serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidCapabilities {
    /// The token exactly as the caller supplied it.
    pub token: String,
    pub pid: u32,
    /// Canonical text form.
    pub text: String,
    /// Raw masks as 16-digit hex, as procfs prints them.
    pub effective: String,
    pub permitted: String,
    pub inheritable: String,
}

impl PidCapabilities {
    pub fn new(token: &str, pid: ProcessId, caps: &CapabilitySet, codec: &TextCodec<'_>) -> Self {
        PidCapabilities {
            token: token.to_string(),
            pid: pid.0,
            text: codec.encode(caps),
            effective: hex_mask(caps.mask(Flag::Effective)),
            permitted: hex_mask(caps.mask(Flag::Permitted)),
            inheritable: hex_mask(caps.mask(Flag::Inheritable)),
        }
    }
}

fn hex_mask(mask: u64) -> String {
    format!("{:016x}", mask)
}

/// Outcome for one input token.
#[derive(Debug)]
pub struct PidReport {
    pub token: String,
    pub outcome: Result<PidCapabilities>,
}

impl PidReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Parse, query and encode a single token.
pub fn query_one(token: &str, source: &dyn CapabilitySource, codec: &TextCodec<'_>) -> PidReport {
    let started = Instant::now();
    debug!(
        target: event_names::QUERY_STARTED,
        stage = %Stage::Query,
        token,
        backend = source.name(),
        "querying capabilities"
    );

    let outcome = ProcessId::parse_token(token).and_then(|pid| {
        let caps = source.query(pid)?;
        Ok(PidCapabilities::new(token, pid, &caps, codec))
    });

    let elapsed_us = started.elapsed().as_micros() as u64;
    match &outcome {
        Ok(found) => info!(
            target: event_names::QUERY_FINISHED,
            stage = %Stage::Query,
            pid = found.pid,
            text = %found.text,
            elapsed_us,
            "capabilities read"
        ),
        Err(err) => warn!(
            target: event_names::QUERY_FAILED,
            stage = %Stage::Query,
            token,
            code = err.code(),
            error = %err,
            elapsed_us,
            "capability query failed"
        ),
    }

    PidReport {
        token: token.to_string(),
        outcome,
    }
}

/// Query every token in order, one at a time.
pub fn query_batch<S: AsRef<str>>(
    tokens: &[S],
    source: &dyn CapabilitySource,
    codec: &TextCodec<'_>,
) -> Vec<PidReport> {
    log_batch_started(tokens.len(), 1);
    let reports: Vec<PidReport> = tokens
        .iter()
        .map(|token| query_one(token.as_ref(), source, codec))
        .collect();
    log_batch_finished(&reports);
    reports
}

/// Query tokens on up to `jobs` scoped worker threads.
///
/// Results come back in input order regardless of completion order.
pub fn query_batch_parallel<S: AsRef<str> + Sync>(
    tokens: &[S],
    source: &dyn CapabilitySource,
    codec: &TextCodec<'_>,
    jobs: usize,
) -> Vec<PidReport> {
    let workers = jobs.clamp(1, tokens.len().max(1));
    if workers == 1 {
        return query_batch(tokens, source, codec);
    }
    log_batch_started(tokens.len(), workers);

    let next = AtomicUsize::new(0);
    let mut indexed: Vec<(usize, PidReport)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        let Some(token) = tokens.get(i) else {
                            break;
                        };
                        done.push((i, query_one(token.as_ref(), source, codec)));
                    }
                    done
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(done) => done,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    indexed.sort_by_key(|(i, _)| *i);
    let reports: Vec<PidReport> = indexed.into_iter().map(|(_, report)| report).collect();
    log_batch_finished(&reports);
    reports
}

/// Fold reports into the succeeded/failed/summary document.
pub fn summarize(reports: &[PidReport]) -> BatchResult<PidCapabilities> {
    let mut result = BatchResult::default();
    for report in reports {
        match &report.outcome {
            Ok(found) => result.add_success(found.clone()),
            Err(err) => result.add_failure(report.token.as_str(), err),
        }
    }
    result
}

fn log_batch_started(total: usize, workers: usize) {
    debug!(
        target: event_names::BATCH_STARTED,
        stage = %Stage::Query,
        total,
        workers,
        "starting batch"
    );
}

fn log_batch_finished(reports: &[PidReport]) {
    let succeeded = reports.iter().filter(|r| r.is_success()).count();
    debug!(
        target: event_names::BATCH_FINISHED,
        stage = %Stage::Query,
        total = reports.len(),
        succeeded,
        failed = reports.len() - succeeded,
        "batch complete"
    );
}

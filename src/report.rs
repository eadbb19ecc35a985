//! Batch reporting.
//!
//! Sinks receive a [`BatchResult`] only after its transaction has been
//! committed or rolled back, so nothing is emitted while the host document
//! is mid-transaction.

use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

use crate::batch::{BatchOutcome, BatchResult};

/// Receiver of resolved batch results.
pub trait ReportSink: Send + Sync {
    /// Called once per batch, after resolution. Batches rejected with a
    /// transaction conflict are not reported.
    fn report(&self, result: &BatchResult);
}

/// Logs a summary line per batch and a warning per failed item.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReportSink;

impl ReportSink for TracingReportSink {
    fn report(&self, result: &BatchResult) {
        let summary = result.summary();
        match result.outcome {
            BatchOutcome::Committed => info!(
                batch = %result.id,
                mode = %result.mode,
                cancelled = result.cancelled,
                "batch committed: {summary}"
            ),
            outcome => warn!(
                batch = %result.id,
                mode = %result.mode,
                %outcome,
                fault = result.fault.as_deref().unwrap_or(""),
                "batch not committed: {summary}"
            ),
        }

        for item in result.failures().filter(|i| i.outcome.is_item_failure()) {
            warn!(
                batch = %result.id,
                entity = %item.request.entity,
                attribute = %item.request.attribute,
                outcome = %item.outcome,
                detail = item.detail.as_deref().unwrap_or(""),
                "mutation failed"
            );
        }
    }
}

/// Keeps every reported result in memory.
#[derive(Debug, Default)]
pub struct CollectingReportSink {
    results: Mutex<Vec<BatchResult>>,
}

impl CollectingReportSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of all results reported so far.
    #[must_use]
    pub fn results(&self) -> Vec<BatchResult> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of results reported so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReportSink for CollectingReportSink {
    fn report(&self, result: &BatchResult) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result.clone());
    }
}

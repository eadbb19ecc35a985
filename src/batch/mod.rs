//! Transactional batch mutation.
//!
//! [`TransactionCoordinator`] turns a list of [`MutationRequest`]s into one
//! atomic unit of work against a [`DocumentGraph`]:
//!
//! 1. Resolve and coerce every request without touching the graph.
//! 2. In `Strict` mode, abort before opening a transaction if any item failed.
//! 3. Open exactly one transaction; fail fast with a conflict if one is open.
//! 4. Apply each planned write through its [`MutationStrategy`].
//! 5. Commit or roll back exactly once, then report.
//!
//! Nothing is logged or reported between steps 3 and 5.

mod cancel;
mod mode;
mod request;
mod result;
mod state;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::attribute::AttributeHandle;
use crate::coerce::ValueCoercer;
use crate::config::ParamConfig;
use crate::entity::BatchId;
use crate::error::{ParamError, ParamResult};
use crate::graph::{DocumentGraph, GraphError};
use crate::report::{ReportSink, TracingReportSink};
use crate::resolve::{AttributeResolver, ResolveError};
use crate::strategy::{ApplyOutcome, MutationStrategy};
use crate::value::ValueEnvelope;

pub use cancel::CancelToken;
pub use mode::BatchMode;
pub use request::{MutationRequest, MutationRequestBuilder, NameLookup};
pub use result::{BatchOutcome, BatchResult, BatchSummary, MutationResult, Outcome};
pub use state::BatchState;

use state::StateTracker;

/// One request on its way through a batch.
struct Slot {
    result: MutationResult,
    plan: Option<MutationStrategy>,
}

impl Slot {
    fn planned(request: MutationRequest, handle: AttributeHandle, envelope: ValueEnvelope, plan: MutationStrategy) -> Self {
        Self {
            result: MutationResult {
                request,
                outcome: Outcome::BatchAborted,
                handle: Some(handle),
                envelope: Some(envelope),
                value: None,
                detail: None,
            },
            plan: Some(plan),
        }
    }

    fn failed(request: MutationRequest, outcome: Outcome, detail: String, handle: Option<AttributeHandle>) -> Self {
        Self {
            result: MutationResult {
                request,
                outcome,
                handle,
                envelope: None,
                value: None,
                detail: Some(detail),
            },
            plan: None,
        }
    }

    fn is_item_failure(&self) -> bool {
        self.result.outcome.is_item_failure()
    }
}

/// Clears the in-flight flag when a batch finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Sole mutator of a document graph.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use paramkit::{AttributeOwner, BatchMode, InMemoryGraph, MutationRequest, Outcome, ParamConfig, TransactionCoordinator};
///
/// let graph = Arc::new(InMemoryGraph::new());
/// let wall = graph.add_entity("W1", None).unwrap();
/// graph.define_attribute(AttributeOwner::Entity(wall), "Mark", "old".into(), true).unwrap();
///
/// let coordinator = TransactionCoordinator::new(graph.clone(), ParamConfig::default()).unwrap();
/// let result = coordinator.run_batch(vec![MutationRequest::new(wall, "Mark", "W-101")], BatchMode::Strict);
///
/// assert!(result.is_committed());
/// assert_eq!(result.outcomes(), vec![Outcome::Applied]);
/// ```
pub struct TransactionCoordinator {
    graph: Arc<dyn DocumentGraph>,
    resolver: AttributeResolver,
    coercer: ValueCoercer,
    config: ParamConfig,
    sink: Arc<dyn ReportSink>,
    in_flight: AtomicBool,
}

impl std::fmt::Debug for TransactionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCoordinator")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl TransactionCoordinator {
    /// Create a coordinator that reports through [`TracingReportSink`].
    ///
    /// # Errors
    ///
    /// Returns `ParamError::Config` if the configuration is invalid.
    pub fn new(graph: Arc<dyn DocumentGraph>, config: ParamConfig) -> ParamResult<Self> {
        let matcher = config.matcher()?;
        let coercer = config.coercer()?;
        Ok(Self {
            resolver: AttributeResolver::with_matcher(graph.clone(), matcher),
            graph,
            coercer,
            config,
            sink: Arc::new(TracingReportSink),
            in_flight: AtomicBool::new(false),
        })
    }

    /// Replace the report sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Resolver used for pre-validation.
    #[must_use]
    pub const fn resolver(&self) -> &AttributeResolver {
        &self.resolver
    }

    /// Coercer used for pre-validation.
    #[must_use]
    pub const fn coercer(&self) -> &ValueCoercer {
        &self.coercer
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ParamConfig {
        &self.config
    }

    /// Whether a batch is currently running on this coordinator.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run a batch in the configured mode.
    pub fn run(&self, requests: Vec<MutationRequest>) -> BatchResult {
        self.run_batch(requests, self.config.mode)
    }

    /// Run a batch.
    ///
    /// Never panics and never returns an error: every failure is reported
    /// per item on the returned [`BatchResult`].
    pub fn run_batch(&self, requests: Vec<MutationRequest>, mode: BatchMode) -> BatchResult {
        self.run_batch_cancellable(requests, mode, &CancelToken::new())
    }

    /// Run a batch that can be cancelled between items.
    ///
    /// A cancelled `Strict` batch rolls back everything. A cancelled
    /// `Lenient` batch commits what already succeeded and marks the rest
    /// `BatchAborted`.
    ///
    /// The report sink only sees batches that resolved with no transaction
    /// open; a `Conflict` result goes back to the caller alone.
    pub fn run_batch_cancellable(
        &self,
        requests: Vec<MutationRequest>,
        mode: BatchMode,
        cancel: &CancelToken,
    ) -> BatchResult {
        let id = BatchId::new();
        let started_at = Utc::now();

        let result = match self.acquire() {
            Some(_guard) => self.execute(id, requests, mode, cancel),
            None => Resolution::conflict(requests, "another batch is running on this coordinator".into()),
        };

        let result = result.finish(id, mode, started_at);
        // A conflicting batch returns while someone else's transaction is open.
        if result.outcome != BatchOutcome::Conflict && !self.graph.has_open_transaction() {
            debug!(batch = %id, outcome = %result.outcome, "batch resolved");
            self.sink.report(&result);
        }
        result
    }

    fn acquire(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    fn execute(&self, id: BatchId, requests: Vec<MutationRequest>, mode: BatchMode, cancel: &CancelToken) -> Resolution {
        if self.graph.has_open_transaction() {
            return Resolution::conflict(requests, "the document graph already has an open transaction".into());
        }

        debug!(batch = %id, %mode, items = requests.len(), "pre-validating batch");
        let mut slots = match self.prevalidate(requests.clone()) {
            Ok(slots) => slots,
            Err(e) => return Resolution::faulted(requests, e.to_string()),
        };

        let prevalidation_failures = slots.iter().filter(|s| s.is_item_failure()).count();
        if mode.is_strict() && prevalidation_failures > 0 {
            debug!(batch = %id, failures = prevalidation_failures, "strict batch aborted before opening");
            return Resolution::aborted(slots, false);
        }
        if mode.is_strict() && cancel.is_cancelled() {
            return Resolution::aborted(slots, true);
        }

        let name = self
            .config
            .transaction_name
            .clone()
            .unwrap_or_else(|| format!("paramkit batch {id}"));
        let mut tracker = StateTracker::new();
        let mut fault: Option<String> = None;

        if let Err(e) = self.graph.begin_transaction(&name) {
            return match e {
                GraphError::TransactionAlreadyOpen { .. } => Resolution::conflict(requests, e.to_string()),
                other => Resolution::faulted(requests, other.to_string()),
            };
        }
        note(tracker.advance(BatchState::Open), &mut fault);

        // Transaction is open: no logging until it resolves.
        let mut cancelled = false;
        let mut stop_strict = false;
        for slot in &mut slots {
            let (Some(plan), Some(envelope)) = (slot.plan.as_ref(), slot.result.envelope.as_ref()) else {
                continue;
            };
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            match plan.apply(self.graph.as_ref(), &envelope.native) {
                Ok(ApplyOutcome::Applied) => slot.result.outcome = Outcome::Applied,
                Ok(ApplyOutcome::ReadOnly) => {
                    slot.result.outcome = Outcome::ReadOnly;
                    slot.result.detail = Some(format!("attribute {} is read-only", plan.address()));
                    stop_strict = mode.is_strict();
                }
                Err(e) if e.is_item_rejection() => {
                    slot.result.outcome = Outcome::InvalidValue;
                    slot.result.detail = Some(e.to_string());
                    stop_strict = mode.is_strict();
                }
                Err(e) => {
                    fault = Some(e.to_string());
                    break;
                }
            }
            if stop_strict {
                break;
            }
        }

        let commit = fault.is_none() && !stop_strict && !(cancelled && mode.is_strict());
        let committed = if commit {
            note(tracker.advance(BatchState::Committing), &mut fault);
            match self.graph.commit() {
                Ok(()) => {
                    note(tracker.advance(BatchState::Committed), &mut fault);
                    true
                }
                Err(e) => {
                    fault = Some(format!("commit failed: {e}"));
                    self.roll_back(&mut tracker, &mut fault);
                    false
                }
            }
        } else {
            self.roll_back(&mut tracker, &mut fault);
            false
        };

        if committed {
            for slot in &mut slots {
                if let (Outcome::Applied, Some(plan)) = (slot.result.outcome, slot.plan.as_ref()) {
                    match plan.read(self.graph.as_ref()) {
                        Ok(value) => slot.result.value = Some(value),
                        Err(e) => {
                            slot.result.value = slot.result.envelope.as_ref().map(|env| env.native.clone());
                            slot.result.detail = Some(format!("read-back failed: {e}"));
                        }
                    }
                }
            }
        }

        for slot in &mut slots {
            if slot.plan.is_some() && slot.result.outcome == Outcome::BatchAborted && slot.result.detail.is_none() {
                slot.result.detail = Some(if cancelled { "cancelled" } else { "not attempted" }.to_string());
            }
            if !committed && slot.result.outcome == Outcome::Applied {
                slot.result.outcome = Outcome::BatchAborted;
                slot.result.detail = Some("rolled back".to_string());
            }
        }

        Resolution {
            outcome: if committed { BatchOutcome::Committed } else { BatchOutcome::RolledBack },
            items: slots.into_iter().map(|s| s.result).collect(),
            transitions: tracker.into_path(),
            fault,
            cancelled,
        }
    }

    fn roll_back(&self, tracker: &mut StateTracker, fault: &mut Option<String>) {
        note(tracker.advance(BatchState::RollingBack), fault);
        match self.graph.rollback() {
            Ok(()) | Err(GraphError::NoOpenTransaction) => {}
            Err(e) => {
                let message = format!("rollback failed: {e}");
                *fault = Some(match fault.take() {
                    Some(previous) => format!("{previous}; {message}"),
                    None => message,
                });
            }
        }
        note(tracker.advance(BatchState::RolledBack), fault);
    }

    /// Resolve and coerce every request. Graph faults abort the whole pass.
    fn prevalidate(&self, requests: Vec<MutationRequest>) -> ParamResult<Vec<Slot>> {
        requests.into_iter().map(|r| self.prepare(r)).collect()
    }

    fn prepare(&self, request: MutationRequest) -> ParamResult<Slot> {
        let resolved = match &request.lookup {
            NameLookup::Exact => self.resolver.resolve_exact(request.entity, &request.attribute),
            NameLookup::Fuzzy(accepted) => self
                .resolver
                .resolve_fuzzy(request.entity, &request.attribute, accepted)
                .map(|r| r.handle),
        };

        let handle = match resolved {
            Ok(handle) => handle,
            Err(e @ (ResolveError::NotFound { .. } | ResolveError::NoMatch { .. })) => {
                let detail = e.to_string();
                return Ok(Slot::failed(request, Outcome::NotFound, detail, None));
            }
            Err(ResolveError::Graph(e @ GraphError::EntityNotFound(_))) => {
                let detail = e.to_string();
                return Ok(Slot::failed(request, Outcome::NotFound, detail, None));
            }
            Err(e @ ResolveError::Ambiguous { .. }) => {
                let detail = e.to_string();
                return Ok(Slot::failed(request, Outcome::Ambiguous, detail, None));
            }
            Err(ResolveError::Graph(e)) => return Err(ParamError::Graph(e)),
        };

        let envelope = match self.coercer.coerce(&request.value, handle.kind, handle.name()) {
            Ok(envelope) => envelope,
            Err(e) => {
                let detail = e.to_string();
                return Ok(Slot::failed(request, Outcome::InvalidValue, detail, Some(handle)));
            }
        };

        let plan = MutationStrategy::select(&handle)?;
        Ok(Slot::planned(request, handle, envelope, plan))
    }
}

/// Record an illegal state transition as a fault.
fn note(step: ParamResult<()>, fault: &mut Option<String>) {
    if let Err(e) = step {
        fault.get_or_insert_with(|| e.to_string());
    }
}

/// Everything about a resolved batch except identity and timing.
struct Resolution {
    outcome: BatchOutcome,
    items: Vec<MutationResult>,
    transitions: Vec<BatchState>,
    fault: Option<String>,
    cancelled: bool,
}

impl Resolution {
    fn conflict(requests: Vec<MutationRequest>, detail: String) -> Self {
        Self::uniform(requests, BatchOutcome::Conflict, Outcome::TransactionConflict, detail, None)
    }

    fn faulted(requests: Vec<MutationRequest>, fault: String) -> Self {
        Self::uniform(requests, BatchOutcome::Aborted, Outcome::BatchAborted, fault.clone(), Some(fault))
    }

    fn uniform(
        requests: Vec<MutationRequest>,
        outcome: BatchOutcome,
        item_outcome: Outcome,
        detail: String,
        fault: Option<String>,
    ) -> Self {
        Self {
            outcome,
            items: requests
                .into_iter()
                .map(|request| MutationResult {
                    request,
                    outcome: item_outcome,
                    handle: None,
                    envelope: None,
                    value: None,
                    detail: Some(detail.clone()),
                })
                .collect(),
            transitions: vec![BatchState::Idle],
            fault,
            cancelled: false,
        }
    }

    /// Abort before opening: failed items keep their outcome, planned ones
    /// become `BatchAborted`.
    fn aborted(slots: Vec<Slot>, cancelled: bool) -> Self {
        let detail = if cancelled { "cancelled" } else { "sibling failed pre-validation" };
        Self {
            outcome: BatchOutcome::Aborted,
            items: slots
                .into_iter()
                .map(|mut s| {
                    if s.plan.is_some() {
                        s.result.detail = Some(detail.to_string());
                    }
                    s.result
                })
                .collect(),
            transitions: vec![BatchState::Idle],
            fault: None,
            cancelled,
        }
    }

    fn finish(self, id: BatchId, mode: BatchMode, started_at: chrono::DateTime<Utc>) -> BatchResult {
        BatchResult {
            id,
            mode,
            outcome: self.outcome,
            items: self.items,
            transitions: self.transitions,
            fault: self.fault,
            cancelled: self.cancelled,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

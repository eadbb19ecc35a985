//! Per-item and per-batch results.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attribute::AttributeHandle;
use crate::batch::mode::BatchMode;
use crate::batch::request::MutationRequest;
use crate::batch::state::BatchState;
use crate::entity::BatchId;
use crate::value::{NativeValue, ValueEnvelope};

/// Outcome of one mutation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Written and committed.
    Applied,
    /// No attribute with that name at any scope.
    NotFound,
    /// The name matched several attributes equally well.
    Ambiguous,
    /// The attribute cannot be written.
    ReadOnly,
    /// The value could not be coerced or was rejected by the host.
    InvalidValue,
    /// Not applied because the batch was aborted or rolled back.
    BatchAborted,
    /// Not attempted because another transaction was open.
    TransactionConflict,
}

impl Outcome {
    /// True only for `Applied`.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }

    /// True for outcomes caused by the item itself, as opposed to its batch.
    #[must_use]
    pub const fn is_item_failure(self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::Ambiguous | Self::ReadOnly | Self::InvalidValue
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Applied => "applied",
            Self::NotFound => "not_found",
            Self::Ambiguous => "ambiguous",
            Self::ReadOnly => "read_only",
            Self::InvalidValue => "invalid_value",
            Self::BatchAborted => "batch_aborted",
            Self::TransactionConflict => "transaction_conflict",
        };
        f.write_str(s)
    }
}

/// Result of one mutation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResult {
    /// The request as submitted.
    pub request: MutationRequest,
    /// What happened.
    pub outcome: Outcome,
    /// Resolved attribute, when resolution succeeded.
    pub handle: Option<AttributeHandle>,
    /// Coerced value, when coercion succeeded.
    pub envelope: Option<ValueEnvelope>,
    /// Stored value after commit; only set when `Applied`.
    pub value: Option<NativeValue>,
    /// Human-readable reason for a failure.
    pub detail: Option<String>,
}

/// How the batch as a whole ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    /// The transaction was committed.
    Committed,
    /// The transaction was opened and rolled back.
    RolledBack,
    /// Pre-validation failed; no transaction was opened.
    Aborted,
    /// Another transaction was open; nothing was attempted.
    Conflict,
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
            Self::Aborted => "aborted",
            Self::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

/// Item counts of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// All items.
    pub total: usize,
    /// Items applied.
    pub applied: usize,
    /// Items that failed on their own.
    pub failed: usize,
    /// Items aborted or rejected because of the batch.
    pub aborted: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} applied, {} failed, {} aborted",
            self.applied, self.total, self.failed, self.aborted
        )
    }
}

/// Result of a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Batch identity.
    pub id: BatchId,
    /// Failure policy the batch ran with.
    pub mode: BatchMode,
    /// Overall outcome.
    pub outcome: BatchOutcome,
    /// One result per request, in request order.
    pub items: Vec<MutationResult>,
    /// States traversed, starting with `Idle`.
    pub transitions: Vec<BatchState>,
    /// Fault that forced a rollback or abort, if any.
    pub fault: Option<String>,
    /// Whether cancellation stopped the batch early.
    pub cancelled: bool,
    /// When the batch started.
    pub started_at: DateTime<Utc>,
    /// When the batch resolved.
    pub finished_at: DateTime<Utc>,
}

impl BatchResult {
    /// Whether the transaction was committed.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.outcome == BatchOutcome::Committed
    }

    /// Item counts.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        self.items.iter().fold(
            BatchSummary {
                total: self.items.len(),
                ..BatchSummary::default()
            },
            |mut acc, item| {
                if item.outcome.is_applied() {
                    acc.applied += 1;
                } else if item.outcome.is_item_failure() {
                    acc.failed += 1;
                } else {
                    acc.aborted += 1;
                }
                acc
            },
        )
    }

    /// Outcomes in request order.
    #[must_use]
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.items.iter().map(|i| i.outcome).collect()
    }

    /// Items that did not apply.
    pub fn failures(&self) -> impl Iterator<Item = &MutationResult> {
        self.items.iter().filter(|i| !i.outcome.is_applied())
    }
}

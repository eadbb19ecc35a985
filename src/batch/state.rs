//! Batch transaction state machine.
//!
//! `Idle -> Open -> Committing -> Committed`
//! `Idle -> Open -> RollingBack -> RolledBack`
//! `Committing -> RollingBack` when the host refuses the commit.
//!
//! `Committed` and `RolledBack` are terminal for a batch.

use serde::{Deserialize, Serialize};

use crate::error::{ParamError, ParamResult};

/// State of one batch's transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    /// No transaction opened yet.
    Idle,
    /// Transaction open; writes in progress.
    Open,
    /// Commit requested.
    Committing,
    /// Committed.
    Committed,
    /// Rollback requested.
    RollingBack,
    /// Rolled back.
    RolledBack,
}

impl BatchState {
    /// Whether `self -> to` is a legal transition.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Idle, Self::Open)
                | (Self::Open, Self::Committing | Self::RollingBack)
                | (Self::Committing, Self::Committed | Self::RollingBack)
                | (Self::RollingBack, Self::RolledBack)
        )
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }
}

/// Records the path a batch takes through the state machine.
#[derive(Debug, Clone)]
pub(crate) struct StateTracker {
    path: Vec<BatchState>,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        Self {
            path: vec![BatchState::Idle],
        }
    }

    pub(crate) fn current(&self) -> BatchState {
        self.path.last().copied().unwrap_or(BatchState::Idle)
    }

    pub(crate) fn advance(&mut self, to: BatchState) -> ParamResult<()> {
        let from = self.current();
        if !from.can_transition(to) {
            return Err(ParamError::InvalidTransition { from, to });
        }
        self.path.push(to);
        Ok(())
    }

    pub(crate) fn into_path(self) -> Vec<BatchState> {
        self.path
    }
}

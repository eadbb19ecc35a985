//! Batch failure policy.

use serde::{Deserialize, Serialize};

/// Controls what happens when one item of a batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Any failure aborts the batch and rolls back every write.
    #[default]
    Strict,

    /// Failures are recorded per item; everything that succeeded is
    /// committed in one transaction.
    Lenient,
}

impl BatchMode {
    /// Returns `true` if this is `Strict` mode.
    pub const fn is_strict(&self) -> bool {
        matches!(self, Self::Strict)
    }

    /// Returns `true` if this is `Lenient` mode.
    pub const fn is_lenient(&self) -> bool {
        matches!(self, Self::Lenient)
    }
}

impl std::fmt::Display for BatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lenient => write!(f, "lenient"),
        }
    }
}

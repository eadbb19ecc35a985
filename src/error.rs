//! Error types for paramkit.
//!
//! Errors are strongly typed using thiserror. Per-item problems during a
//! batch (missing attribute, bad value, read-only target) are not errors at
//! all: they are reported as outcomes on the `BatchResult`. The types here
//! cover configuration problems and faults that escape a single item.

use thiserror::Error;

use crate::batch::BatchState;
use crate::coerce::CoercionError;
use crate::graph::GraphError;
use crate::resolve::ResolveError;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Fuzzy threshold {value} is out of range (0.0, 1.0]")]
    ThresholdOutOfRange {
        value: f64,
    },

    #[error("Unit rule '{rule}' has invalid divisor {divisor}")]
    InvalidDivisor {
        rule: String,
        divisor: f64,
    },

    #[error("Invalid name pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: String,
    },

    #[error("Code table '{table}' contains an empty label")]
    EmptyCodeLabel {
        table: String,
    },

    #[error("Code table '{table}' defines label '{label}' more than once")]
    DuplicateCodeLabel {
        table: String,
        label: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat {
        extension: String,
    },

    #[error("Failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error type for paramkit.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Document graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Coercion error: {0}")]
    Coercion(#[from] CoercionError),

    #[error("Invalid batch state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: BatchState,
        to: BatchState,
    },

    #[error("Invalid request: {reason}")]
    InvalidRequest {
        reason: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ParamError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a document graph error.
    #[must_use]
    pub const fn is_graph(&self) -> bool {
        matches!(self, Self::Graph(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. } | Self::InvalidTransition { .. })
    }
}

/// Result type alias for paramkit operations.
pub type ParamResult<T> = Result<T, ParamError>;

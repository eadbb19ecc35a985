//! Coordinator configuration.
//!
//! Configuration is an explicit value handed to the coordinator at
//! construction. Nothing is read from process-wide state, and the default
//! configuration performs no unit or code conversion.
//!
//! Example TOML:
//!
//! ```toml
//! mode = "lenient"
//! input_unit = "millimeters"
//! fuzzy_threshold = 0.3
//!
//! [[unit_rules]]
//! name = "Spacing"
//! pattern = { contains = "Spacing" }
//! unit = "millimeters"
//! divisor = 304.8
//!
//! [[code_tables]]
//! name = "Hook Orientation"
//! pattern = { contains = "Hook Orientation" }
//! codes = { Left = 0, Right = 1 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::batch::BatchMode;
use crate::coerce::{CodeTable, InputUnit, NamePattern, UnitRule, ValueCoercer};
use crate::error::ConfigError;
use crate::matching::FuzzyMatcher;

/// Millimeters per foot.
pub const MM_PER_FOOT: f64 = 304.8;

/// Configuration for a [`TransactionCoordinator`](crate::TransactionCoordinator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamConfig {
    /// Default failure policy for `run`.
    pub mode: BatchMode,
    /// Unit of external numeric values.
    pub input_unit: InputUnit,
    /// Unit conversion rules, first match wins.
    pub unit_rules: Vec<UnitRule>,
    /// Symbolic code tables, first match wins.
    pub code_tables: Vec<CodeTable>,
    /// Word-overlap acceptance threshold for fuzzy lookups.
    pub fuzzy_threshold: f64,
    /// Transaction name shown by the host; a generated name is used if unset.
    pub transaction_name: Option<String>,
}

impl Default for ParamConfig {
    fn default() -> Self {
        Self {
            mode: BatchMode::Strict,
            input_unit: InputUnit::Internal,
            unit_rules: Vec::new(),
            code_tables: Vec::new(),
            fuzzy_threshold: FuzzyMatcher::DEFAULT_THRESHOLD,
            transaction_name: None,
        }
    }
}

impl ParamConfig {
    /// Millimeter input with `Spacing` and `Offset` attributes converted to
    /// feet.
    #[must_use]
    pub fn millimeter_preset() -> Self {
        Self {
            input_unit: InputUnit::Millimeters,
            unit_rules: vec![
                UnitRule::new("Spacing", NamePattern::contains("Spacing"), InputUnit::Millimeters, MM_PER_FOOT),
                UnitRule::new("Offset", NamePattern::contains("Offset"), InputUnit::Millimeters, MM_PER_FOOT),
            ],
            ..Self::default()
        }
    }

    /// Set the default batch mode.
    #[must_use]
    pub fn with_mode(mut self, mode: BatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the input unit.
    #[must_use]
    pub fn with_input_unit(mut self, unit: InputUnit) -> Self {
        self.input_unit = unit;
        self
    }

    /// Append a unit rule.
    #[must_use]
    pub fn with_unit_rule(mut self, rule: UnitRule) -> Self {
        self.unit_rules.push(rule);
        self
    }

    /// Append a code table.
    #[must_use]
    pub fn with_code_table(mut self, table: CodeTable) -> Self {
        self.code_tables.push(table);
        self
    }

    /// Set the fuzzy acceptance threshold.
    #[must_use]
    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    /// Set the transaction name.
    #[must_use]
    pub fn with_transaction_name(mut self, name: impl Into<String>) -> Self {
        self.transaction_name = Some(name.into());
        self
    }

    /// Check every table and threshold.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.matcher()?;
        self.coercer()?;
        Ok(())
    }

    /// Build the value coercer described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for invalid rules or tables.
    pub fn coercer(&self) -> Result<ValueCoercer, ConfigError> {
        ValueCoercer::new(self.input_unit, &self.unit_rules, &self.code_tables)
    }

    /// Build the fuzzy matcher described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ThresholdOutOfRange` for a bad threshold.
    pub fn matcher(&self) -> Result<FuzzyMatcher, ConfigError> {
        FuzzyMatcher::with_threshold(self.fuzzy_threshold)
    }

    /// Parse and validate JSON.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` or a validation error.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(|e| ConfigError::Parse {
            format: "json",
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate TOML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` or a validation error.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse {
            format: "toml",
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` or `.toml` file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io`, `UnsupportedFormat`, `Parse` or a
    /// validation error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Self::from_json_str(&std::fs::read_to_string(path)?),
            "toml" => Self::from_toml_str(&std::fs::read_to_string(path)?),
            _ => Err(ConfigError::UnsupportedFormat { extension }),
        }
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            format: "json",
            message: e.to_string(),
        })
    }
}

//! Unit-conversion and symbolic-code tables.
//!
//! Both tables select their entries by matching the attribute name against a
//! [`NamePattern`]. Tables are ordered; the first matching entry wins.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Pattern matched against attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePattern {
    /// Name contains the given text (case-sensitive).
    Contains(String),
    /// Name matches the given regular expression.
    Regex(String),
}

impl NamePattern {
    /// Pattern matching names that contain `text`.
    #[must_use]
    pub fn contains(text: impl Into<String>) -> Self {
        Self::Contains(text.into())
    }

    /// Pattern matching names against a regular expression.
    #[must_use]
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex(pattern.into())
    }

    pub(crate) fn compile(&self) -> Result<CompiledPattern, ConfigError> {
        match self {
            Self::Contains(text) if text.is_empty() => Err(ConfigError::InvalidPattern {
                pattern: text.clone(),
                reason: "empty pattern matches every attribute".to_string(),
            }),
            Self::Contains(text) => Ok(CompiledPattern::Contains(text.clone())),
            Self::Regex(pattern) => Regex::new(pattern)
                .map(CompiledPattern::Regex)
                .map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                }),
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains(text) => write!(f, "contains({text})"),
            Self::Regex(pattern) => write!(f, "regex({pattern})"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum CompiledPattern {
    Contains(String),
    Regex(Regex),
}

impl CompiledPattern {
    pub(crate) fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Contains(text) => name.contains(text.as_str()),
            Self::Regex(re) => re.is_match(name),
        }
    }
}

/// Unit in which external numeric values are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputUnit {
    /// Values are already in the host's internal units.
    #[default]
    Internal,
    /// Millimeters.
    Millimeters,
    /// Meters.
    Meters,
}

/// Divides parsed numbers for matching attribute names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRule {
    /// Rule name, reported in the value envelope.
    pub name: String,
    /// Attribute names the rule applies to.
    pub pattern: NamePattern,
    /// Input unit the rule converts from.
    pub unit: InputUnit,
    /// Parsed value is divided by this.
    pub divisor: f64,
}

impl UnitRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: NamePattern, unit: InputUnit, divisor: f64) -> Self {
        Self {
            name: name.into(),
            pattern,
            unit,
            divisor,
        }
    }
}

/// Maps human labels to integer codes for matching attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTable {
    /// Table name, reported in the value envelope.
    pub name: String,
    /// Attribute names the table applies to.
    pub pattern: NamePattern,
    /// Label to code.
    pub codes: BTreeMap<String, i64>,
}

impl CodeTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: NamePattern) -> Self {
        Self {
            name: name.into(),
            pattern,
            codes: BTreeMap::new(),
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn code(mut self, label: impl Into<String>, code: i64) -> Self {
        self.codes.insert(label.into(), code);
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledUnitRule {
    pub(crate) name: String,
    pub(crate) pattern: CompiledPattern,
    pub(crate) unit: InputUnit,
    pub(crate) divisor: f64,
}

impl CompiledUnitRule {
    pub(crate) fn compile(rule: &UnitRule) -> Result<Self, ConfigError> {
        if !rule.divisor.is_finite() || rule.divisor == 0.0 {
            return Err(ConfigError::InvalidDivisor {
                rule: rule.name.clone(),
                divisor: rule.divisor,
            });
        }
        Ok(Self {
            name: rule.name.clone(),
            pattern: rule.pattern.compile()?,
            unit: rule.unit,
            divisor: rule.divisor,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledCodeTable {
    pub(crate) name: String,
    pub(crate) pattern: CompiledPattern,
    /// Keyed by normalized label; value keeps the label as configured.
    pub(crate) by_label: BTreeMap<String, (String, i64)>,
}

impl CompiledCodeTable {
    pub(crate) fn compile(table: &CodeTable) -> Result<Self, ConfigError> {
        let mut by_label = BTreeMap::new();
        for (label, code) in &table.codes {
            let key = label_key(label);
            if key.is_empty() {
                return Err(ConfigError::EmptyCodeLabel {
                    table: table.name.clone(),
                });
            }
            if by_label.insert(key, (label.clone(), *code)).is_some() {
                return Err(ConfigError::DuplicateCodeLabel {
                    table: table.name.clone(),
                    label: label.clone(),
                });
            }
        }
        Ok(Self {
            name: table.name.clone(),
            pattern: table.pattern.compile()?,
            by_label,
        })
    }

    pub(crate) fn lookup(&self, label: &str) -> Option<&(String, i64)> {
        self.by_label.get(&label_key(label))
    }

    pub(crate) fn label_for(&self, code: i64) -> Option<&str> {
        self.by_label
            .values()
            .find(|(_, c)| *c == code)
            .map(|(label, _)| label.as_str())
    }
}

fn label_key(label: &str) -> String {
    label.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_is_case_sensitive() {
        let p = NamePattern::contains("Spacing").compile().unwrap();
        assert!(p.is_match("Bar Spacing"));
        assert!(!p.is_match("bar spacing"));
    }

    #[test]
    fn test_regex_pattern() {
        let p = NamePattern::regex("(?i)^offset").compile().unwrap();
        assert!(p.is_match("Offset From Host"));
        assert!(!p.is_match("Top Offset"));
    }

    #[test]
    fn test_invalid_patterns_rejected() {
        assert!(matches!(
            NamePattern::regex("(").compile(),
            Err(ConfigError::InvalidPattern { .. })
        ));
        assert!(NamePattern::contains("").compile().is_err());
    }

    #[test]
    fn test_zero_divisor_rejected() {
        let rule = UnitRule::new("bad", NamePattern::contains("X"), InputUnit::Millimeters, 0.0);
        assert!(matches!(
            CompiledUnitRule::compile(&rule),
            Err(ConfigError::InvalidDivisor { .. })
        ));
    }

    #[test]
    fn test_code_table_lookup_ignores_case_and_whitespace() {
        let table = CodeTable::new("Hook", NamePattern::contains("Hook"))
            .code("Left", 0)
            .code("Right", 1);
        let compiled = CompiledCodeTable::compile(&table).unwrap();
        assert_eq!(compiled.lookup("  right "), Some(&("Right".to_string(), 1)));
        assert_eq!(compiled.label_for(0), Some("Left"));
        assert!(compiled.lookup("up").is_none());
    }

    #[test]
    fn test_code_table_duplicate_labels_rejected() {
        let table = CodeTable::new("Hook", NamePattern::contains("Hook"))
            .code("Left", 0)
            .code("LEFT", 2);
        assert!(matches!(
            CompiledCodeTable::compile(&table),
            Err(ConfigError::DuplicateCodeLabel { .. })
        ));
    }

    #[test]
    fn test_pattern_serialization() {
        let json = serde_json::to_string(&NamePattern::contains("Spacing")).unwrap();
        assert_eq!(json, r#"{"contains":"Spacing"}"#);
    }
}

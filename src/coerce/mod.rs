//! Coercion of external values into native attribute values.
//!
//! - `Number`: digits, `.` and `-` are kept, the rest is dropped, then the
//!   result is parsed and divided by the first matching unit rule.
//! - `Integer`: symbolic code tables are consulted first, then the same
//!   numeric cleanup as for numbers, then an integer parse.
//! - `Text`: always succeeds.
//! - `Reference`: only an already-resolved reference is accepted.

mod rules;

use thiserror::Error;

use crate::attribute::StorageKind;
use crate::error::ConfigError;
use crate::value::{ConversionApplied, NativeValue, RawValue, ValueEnvelope};

pub use rules::{CodeTable, InputUnit, NamePattern, UnitRule};

use rules::{CompiledCodeTable, CompiledUnitRule};

/// Reasons a raw value cannot be coerced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    /// No number could be parsed from the input.
    #[error("Cannot parse {input:?} as {kind}")]
    Unparsable {
        /// Input as supplied.
        input: String,
        /// Target kind.
        kind: StorageKind,
    },

    /// The input is a number but not a whole one.
    #[error("Value {value} is not a whole number")]
    NotIntegral {
        /// Parsed value.
        value: f64,
    },

    /// The input parsed to NaN or infinity.
    #[error("Value is not finite")]
    NonFinite,

    /// References cannot be built from text or numbers.
    #[error("Attribute '{attribute}' needs a resolved reference, got {got}")]
    ReferenceRequired {
        /// Attribute being coerced.
        attribute: String,
        /// Type of the raw input.
        got: &'static str,
    },

    /// A reference was supplied for a non-reference attribute.
    #[error("Cannot store a reference in {kind} attribute '{attribute}'")]
    UnexpectedReference {
        /// Attribute being coerced.
        attribute: String,
        /// Target kind.
        kind: StorageKind,
    },
}

/// Converts raw values into an attribute's native representation.
///
/// Built from explicit configuration; an empty coercer performs no unit or
/// code conversion at all.
///
/// # Examples
///
/// ```
/// use paramkit::{InputUnit, NamePattern, RawValue, StorageKind, UnitRule, ValueCoercer};
///
/// let coercer = ValueCoercer::new(
///     InputUnit::Millimeters,
///     &[UnitRule::new("Spacing", NamePattern::contains("Spacing"), InputUnit::Millimeters, 304.8)],
///     &[],
/// )
/// .unwrap();
///
/// let env = coercer
///     .coerce(&RawValue::from("150 mm"), StorageKind::Number, "Bar Spacing")
///     .unwrap();
/// assert!((env.native.as_number().unwrap() - 150.0 / 304.8).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValueCoercer {
    input_unit: InputUnit,
    unit_rules: Vec<CompiledUnitRule>,
    code_tables: Vec<CompiledCodeTable>,
}

impl ValueCoercer {
    /// Compiles a coercer from rule and code tables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for invalid patterns, divisors or labels.
    pub fn new(
        input_unit: InputUnit,
        unit_rules: &[UnitRule],
        code_tables: &[CodeTable],
    ) -> Result<Self, ConfigError> {
        let unit_rules = unit_rules
            .iter()
            .map(CompiledUnitRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let code_tables = code_tables
            .iter()
            .map(CompiledCodeTable::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            input_unit,
            unit_rules,
            code_tables,
        })
    }

    /// Declared unit of external numeric values.
    #[must_use]
    pub const fn input_unit(&self) -> InputUnit {
        self.input_unit
    }

    /// Coerces `raw` into the native representation of `kind`.
    ///
    /// # Errors
    ///
    /// Returns a `CoercionError` when the value cannot be represented.
    pub fn coerce(
        &self,
        raw: &RawValue,
        kind: StorageKind,
        attribute: &str,
    ) -> Result<ValueEnvelope, CoercionError> {
        match kind {
            StorageKind::Number => self.coerce_number(raw, attribute),
            StorageKind::Integer => self.coerce_integer(raw, attribute),
            StorageKind::Text => Ok(coerce_text(raw)),
            StorageKind::Reference => match raw {
                RawValue::Reference(id) => Ok(ValueEnvelope::passthrough(
                    raw.clone(),
                    NativeValue::Reference(*id),
                )),
                other => Err(CoercionError::ReferenceRequired {
                    attribute: attribute.to_string(),
                    got: other.type_name(),
                }),
            },
        }
    }

    /// Formats a native value in external units.
    ///
    /// Numbers get the inverse of the unit rule applied by [`coerce`], and
    /// integers with a code table are shown by label.
    ///
    /// [`coerce`]: ValueCoercer::coerce
    #[must_use]
    pub fn present(&self, value: &NativeValue, attribute: &str) -> String {
        match value {
            NativeValue::Number(v) => {
                let external = self
                    .unit_rule_for(attribute)
                    .map_or(*v, |rule| v * rule.divisor);
                format_number(external)
            }
            NativeValue::Integer(code) => self
                .code_tables
                .iter()
                .filter(|t| t.pattern.is_match(attribute))
                .find_map(|t| t.label_for(*code))
                .map_or_else(|| code.to_string(), str::to_string),
            NativeValue::Text(s) => s.clone(),
            NativeValue::Reference(id) => id.to_string(),
        }
    }

    fn unit_rule_for(&self, attribute: &str) -> Option<&CompiledUnitRule> {
        self.unit_rules
            .iter()
            .find(|r| r.unit == self.input_unit && r.pattern.is_match(attribute))
    }

    fn coerce_number(&self, raw: &RawValue, attribute: &str) -> Result<ValueEnvelope, CoercionError> {
        let parsed = match raw {
            RawValue::Number(v) => *v,
            RawValue::Text(s) => parse_float(s, StorageKind::Number)?,
            RawValue::Reference(_) => {
                return Err(CoercionError::UnexpectedReference {
                    attribute: attribute.to_string(),
                    kind: StorageKind::Number,
                })
            }
        };
        if !parsed.is_finite() {
            return Err(CoercionError::NonFinite);
        }

        Ok(match self.unit_rule_for(attribute) {
            Some(rule) => ValueEnvelope {
                raw: raw.clone(),
                native: NativeValue::Number(parsed / rule.divisor),
                conversion: Some(ConversionApplied::Unit {
                    rule: rule.name.clone(),
                    divisor: rule.divisor,
                }),
            },
            None => ValueEnvelope::passthrough(raw.clone(), NativeValue::Number(parsed)),
        })
    }

    fn coerce_integer(&self, raw: &RawValue, attribute: &str) -> Result<ValueEnvelope, CoercionError> {
        if let RawValue::Text(label) = raw {
            let hit = self
                .code_tables
                .iter()
                .filter(|t| t.pattern.is_match(attribute))
                .find_map(|t| t.lookup(label).map(|entry| (t, entry)));
            if let Some((table, (matched, code))) = hit {
                return Ok(ValueEnvelope {
                    raw: raw.clone(),
                    native: NativeValue::Integer(*code),
                    conversion: Some(ConversionApplied::SymbolicCode {
                        table: table.name.clone(),
                        label: matched.clone(),
                    }),
                });
            }
        }

        let parsed = match raw {
            RawValue::Number(v) => *v,
            RawValue::Text(s) => {
                let cleaned = clean_numeric(s);
                if let Ok(v) = cleaned.parse::<i64>() {
                    return Ok(ValueEnvelope::passthrough(raw.clone(), NativeValue::Integer(v)));
                }
                parse_float(s, StorageKind::Integer)?
            }
            RawValue::Reference(_) => {
                return Err(CoercionError::UnexpectedReference {
                    attribute: attribute.to_string(),
                    kind: StorageKind::Integer,
                })
            }
        };

        integral(parsed).map(|v| ValueEnvelope::passthrough(raw.clone(), NativeValue::Integer(v)))
    }
}

fn coerce_text(raw: &RawValue) -> ValueEnvelope {
    let text = match raw {
        RawValue::Text(s) => s.clone(),
        RawValue::Number(v) => format_number(*v),
        RawValue::Reference(id) => id.to_string(),
    };
    ValueEnvelope::passthrough(raw.clone(), NativeValue::Text(text))
}

/// Keeps digits, `.` and `-`.
fn clean_numeric(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect()
}

fn parse_float(s: &str, kind: StorageKind) -> Result<f64, CoercionError> {
    clean_numeric(s)
        .parse::<f64>()
        .map_err(|_| CoercionError::Unparsable {
            input: s.to_string(),
            kind,
        })
}

fn integral(v: f64) -> Result<i64, CoercionError> {
    if !v.is_finite() {
        return Err(CoercionError::NonFinite);
    }
    #[allow(clippy::cast_precision_loss)]
    let in_range = v >= i64::MIN as f64 && v < i64::MAX as f64;
    if v.fract() != 0.0 || !in_range {
        return Err(CoercionError::NotIntegral { value: v });
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(v as i64)
}

/// Fixed six decimals with trailing zeros trimmed.
fn format_number(v: f64) -> String {
    let s = format!("{v:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

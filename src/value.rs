//! Raw external values and native attribute values.
//!
//! External data (import rows, tool inputs) arrives as [`RawValue`]. The
//! coercer turns it into a [`NativeValue`] matching the attribute's storage
//! kind and records what it did in a [`ValueEnvelope`].

use serde::{Deserialize, Serialize};

use crate::attribute::StorageKind;
use crate::entity::EntityId;

/// A value as supplied by a caller, before coercion.
///
/// # Examples
///
/// ```
/// use paramkit::RawValue;
///
/// let text: RawValue = "150 mm".into();
/// let number: RawValue = 150.0.into();
/// assert!(text.as_text().is_some());
/// assert_eq!(number.as_number(), Some(150.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RawValue {
    /// Text, typically a spreadsheet cell or dialog input.
    Text(String),
    /// A number that has already been parsed by the caller.
    Number(f64),
    /// An already-resolved element reference.
    Reference(EntityId),
}

impl RawValue {
    /// Returns the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the number if this is a numeric value.
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Reference(_) => "reference",
        }
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Reference(v) => write!(f, "ref:{v}"),
        }
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        Self::Number(v as f64)
    }
}

impl From<EntityId> for RawValue {
    fn from(v: EntityId) -> Self {
        Self::Reference(v)
    }
}

/// A value in an attribute's native storage representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum NativeValue {
    /// Floating point value in internal units.
    Number(f64),
    /// Integer value.
    Integer(i64),
    /// Text value.
    Text(String),
    /// Element reference.
    Reference(EntityId),
}

impl NativeValue {
    /// Storage kind this value belongs to.
    #[must_use]
    pub const fn kind(&self) -> StorageKind {
        match self {
            Self::Number(_) => StorageKind::Number,
            Self::Integer(_) => StorageKind::Integer,
            Self::Text(_) => StorageKind::Text,
            Self::Reference(_) => StorageKind::Reference,
        }
    }

    /// Returns the number, reading integers as floats.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns the integer if this is an integer value.
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the reference if this is a reference value.
    pub const fn as_reference(&self) -> Option<EntityId> {
        match self {
            Self::Reference(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for NativeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Reference(v) => write!(f, "ref:{v}"),
        }
    }
}

impl From<f64> for NativeValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for NativeValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<EntityId> for NativeValue {
    fn from(v: EntityId) -> Self {
        Self::Reference(v)
    }
}

/// A conversion rule that was applied during coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversionApplied {
    /// A unit rule divided the parsed number.
    Unit {
        /// Name of the rule.
        rule: String,
        /// Divisor applied to the parsed number.
        divisor: f64,
    },
    /// A symbolic label was mapped to an integer code.
    SymbolicCode {
        /// Name of the code table.
        table: String,
        /// Label as matched in the table.
        label: String,
    },
}

/// Raw value, its coerced native form, and the conversion applied (if any).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueEnvelope {
    /// Value as supplied by the caller.
    pub raw: RawValue,
    /// Value in native storage representation.
    pub native: NativeValue,
    /// Conversion rule applied, if any.
    pub conversion: Option<ConversionApplied>,
}

impl ValueEnvelope {
    /// Envelope for a value that needed no conversion.
    #[must_use]
    pub fn passthrough(raw: RawValue, native: NativeValue) -> Self {
        Self {
            raw,
            native,
            conversion: None,
        }
    }
}

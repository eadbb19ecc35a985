//! Mutation requests and their builder.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::ParamError;
use crate::resolve::AcceptedNames;
use crate::value::RawValue;

/// How the attribute name of a request is looked up.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "accepted", rename_all = "snake_case")]
pub enum NameLookup {
    /// Exact, case-sensitive name.
    #[default]
    Exact,
    /// Fuzzy match restricted to the accepted names.
    Fuzzy(AcceptedNames),
}

/// One write to perform: (entity, attribute name, raw value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRequest {
    /// Target entity.
    pub entity: EntityId,
    /// Attribute name or, for fuzzy lookups, the text to match.
    pub attribute: String,
    /// Value to write, before coercion.
    pub value: RawValue,
    /// Name lookup mode.
    #[serde(default)]
    pub lookup: NameLookup,
}

impl MutationRequest {
    /// Request with an exact attribute name.
    #[must_use]
    pub fn new(entity: EntityId, attribute: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Self {
            entity,
            attribute: attribute.into(),
            value: value.into(),
            lookup: NameLookup::Exact,
        }
    }

    /// Request whose attribute name is matched fuzzily.
    #[must_use]
    pub fn fuzzy(
        entity: EntityId,
        attribute: impl Into<String>,
        value: impl Into<RawValue>,
        accepted: AcceptedNames,
    ) -> Self {
        Self {
            entity,
            attribute: attribute.into(),
            value: value.into(),
            lookup: NameLookup::Fuzzy(accepted),
        }
    }

    /// Start a builder.
    #[must_use]
    pub fn builder() -> MutationRequestBuilder {
        MutationRequestBuilder::default()
    }
}

/// Builder for [`MutationRequest`].
///
/// # Example
/// ```rust
/// use paramkit::{EntityId, MutationRequest};
///
/// let request = MutationRequest::builder()
///     .entity(EntityId::new())
///     .attribute("Bar Spacing")
///     .value("150")
///     .build()
///     .unwrap();
/// assert_eq!(request.attribute, "Bar Spacing");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MutationRequestBuilder {
    entity: Option<EntityId>,
    attribute: Option<String>,
    value: Option<RawValue>,
    lookup: NameLookup,
}

impl MutationRequestBuilder {
    /// Set the target entity (required).
    #[must_use]
    pub fn entity(mut self, id: EntityId) -> Self {
        self.entity = Some(id);
        self
    }

    /// Set the attribute name (required).
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute = Some(name.into());
        self
    }

    /// Set the raw value (required).
    #[must_use]
    pub fn value(mut self, value: impl Into<RawValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Match the attribute name fuzzily (default: exact).
    #[must_use]
    pub fn fuzzy(mut self, accepted: AcceptedNames) -> Self {
        self.lookup = NameLookup::Fuzzy(accepted);
        self
    }

    /// Build the request.
    ///
    /// Returns `ParamError::InvalidRequest` if a required field is missing
    /// or the attribute name is blank.
    pub fn build(self) -> Result<MutationRequest, ParamError> {
        let missing = |field: &str| ParamError::InvalidRequest {
            reason: format!("missing field '{field}'"),
        };

        let entity = self.entity.ok_or_else(|| missing("entity"))?;
        let attribute = self.attribute.ok_or_else(|| missing("attribute"))?;
        if attribute.trim().is_empty() {
            return Err(ParamError::InvalidRequest {
                reason: "attribute name is blank".to_string(),
            });
        }
        let value = self.value.ok_or_else(|| missing("value"))?;

        Ok(MutationRequest {
            entity,
            attribute,
            value,
            lookup: self.lookup,
        })
    }
}

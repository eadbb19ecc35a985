//! Attribute descriptors and resolved handles.
//!
//! An attribute is a named, typed field that lives at exactly one scope:
//! directly on an entity, on the template the entity defers to, or in the
//! global shared pool. Names are unique within a scope but the same name may
//! exist at several scopes, in which case the narrower scope shadows the
//! wider one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, TemplateId};

/// Native storage representation of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Floating point value in internal units.
    Number,
    /// Integer value (also used for enumerations and flags).
    Integer,
    /// Free text.
    Text,
    /// Reference to another element.
    Reference,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => write!(f, "number"),
            Self::Integer => write!(f, "integer"),
            Self::Text => write!(f, "text"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

/// Scope an attribute lives at.
///
/// The declaration order is the resolution order: `Instance` shadows
/// `Template`, which shadows `Shared`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Stored on the entity itself.
    Instance,
    /// Stored on the template the entity defers to.
    Template,
    /// Stored in the global shared pool.
    Shared,
}

impl Scope {
    /// Scopes in resolution order.
    pub const CHAIN: [Scope; 3] = [Scope::Instance, Scope::Template, Scope::Shared];
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance => write!(f, "instance"),
            Self::Template => write!(f, "template"),
            Self::Shared => write!(f, "shared"),
        }
    }
}

/// The graph element that physically stores an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AttributeOwner {
    /// An entity.
    Entity(EntityId),
    /// A template.
    Template(TemplateId),
    /// The global shared pool.
    SharedPool,
}

impl AttributeOwner {
    /// Scope implied by this owner.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        match self {
            Self::Entity(_) => Scope::Instance,
            Self::Template(_) => Scope::Template,
            Self::SharedPool => Scope::Shared,
        }
    }
}

impl fmt::Display for AttributeOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(id) => write!(f, "entity:{id}"),
            Self::Template(id) => write!(f, "template:{id}"),
            Self::SharedPool => write!(f, "shared"),
        }
    }
}

/// Physical location of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeAddress {
    /// Element holding the value.
    pub owner: AttributeOwner,
    /// Attribute name, unique within the owner.
    pub name: String,
}

impl AttributeAddress {
    /// Creates a new address.
    #[must_use]
    pub fn new(owner: AttributeOwner, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }
}

impl fmt::Display for AttributeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Attribute as enumerated by the document graph for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    /// Where the value lives.
    pub address: AttributeAddress,
    /// Native storage kind.
    pub kind: StorageKind,
}

impl AttributeDescriptor {
    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.address.name
    }

    /// Scope of the attribute.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.address.owner.scope()
    }
}

/// A resolved attribute, ready for reading and writing.
///
/// `scope` and `mutable` are captured once at resolution time and are
/// authoritative for the rest of the mutation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeHandle {
    /// Entity the attribute was resolved for.
    pub entity: EntityId,
    /// Where the value lives.
    pub address: AttributeAddress,
    /// Native storage kind.
    pub kind: StorageKind,
    /// Scope the attribute was found at.
    pub scope: Scope,
    /// Whether the host allows writing the attribute.
    pub mutable: bool,
}

impl AttributeHandle {
    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.address.name
    }
}

impl fmt::Display for AttributeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.address, self.scope, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_chain_order() {
        assert_eq!(Scope::CHAIN, [Scope::Instance, Scope::Template, Scope::Shared]);
        assert!(Scope::Instance < Scope::Template);
        assert!(Scope::Template < Scope::Shared);
    }

    #[test]
    fn test_owner_scope() {
        assert_eq!(AttributeOwner::Entity(EntityId::new()).scope(), Scope::Instance);
        assert_eq!(AttributeOwner::Template(TemplateId::new()).scope(), Scope::Template);
        assert_eq!(AttributeOwner::SharedPool.scope(), Scope::Shared);
    }

    #[test]
    fn test_address_display() {
        let addr = AttributeAddress::new(AttributeOwner::SharedPool, "Mark");
        assert_eq!(addr.to_string(), "shared/Mark");
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&StorageKind::Reference).unwrap();
        assert_eq!(json, "\"reference\"");
        let kind: StorageKind = serde_json::from_str("\"integer\"").unwrap();
        assert_eq!(kind, StorageKind::Integer);
    }
}

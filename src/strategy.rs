//! Scope-specific read/write strategies.
//!
//! The strategy is picked from the scope recorded on a resolved handle and
//! is final: a failed write is reported, never retried at another scope.

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeAddress, AttributeHandle, AttributeOwner, Scope};
use crate::entity::{EntityId, TemplateId};
use crate::error::{ParamError, ParamResult};
use crate::graph::{DocumentGraph, GraphError};
use crate::value::NativeValue;

/// Result of a single strategy write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The value was written.
    Applied,
    /// The attribute is not writable; the graph was not changed.
    ReadOnly,
}

/// How to read and write one resolved attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationStrategy {
    /// Attribute stored on the entity.
    Instance {
        /// Owning entity.
        entity: EntityId,
        /// Attribute name.
        attribute: String,
        /// Mutability captured at resolution.
        mutable: bool,
    },
    /// Attribute stored on the entity's template.
    Template {
        /// Owning template.
        template: TemplateId,
        /// Attribute name.
        attribute: String,
        /// Mutability captured at resolution.
        mutable: bool,
    },
    /// Attribute stored in the shared pool.
    Shared {
        /// Attribute name.
        attribute: String,
        /// Mutability captured at resolution.
        mutable: bool,
    },
}

impl MutationStrategy {
    /// Select the strategy for a resolved handle.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the handle's scope and owner disagree.
    pub fn select(handle: &AttributeHandle) -> ParamResult<Self> {
        let attribute = handle.address.name.clone();
        let mutable = handle.mutable;
        match (handle.scope, handle.address.owner) {
            (Scope::Instance, AttributeOwner::Entity(entity)) => Ok(Self::Instance {
                entity,
                attribute,
                mutable,
            }),
            (Scope::Template, AttributeOwner::Template(template)) => Ok(Self::Template {
                template,
                attribute,
                mutable,
            }),
            (Scope::Shared, AttributeOwner::SharedPool) => Ok(Self::Shared { attribute, mutable }),
            (scope, owner) => Err(ParamError::internal(format!(
                "handle scope {scope} does not match owner {owner}"
            ))),
        }
    }

    /// Scope this strategy writes to.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        match self {
            Self::Instance { .. } => Scope::Instance,
            Self::Template { .. } => Scope::Template,
            Self::Shared { .. } => Scope::Shared,
        }
    }

    /// Whether writes are allowed.
    #[must_use]
    pub const fn is_mutable(&self) -> bool {
        match self {
            Self::Instance { mutable, .. }
            | Self::Template { mutable, .. }
            | Self::Shared { mutable, .. } => *mutable,
        }
    }

    /// Address the strategy reads and writes.
    #[must_use]
    pub fn address(&self) -> AttributeAddress {
        match self {
            Self::Instance { entity, attribute, .. } => {
                AttributeAddress::new(AttributeOwner::Entity(*entity), attribute.clone())
            }
            Self::Template { template, attribute, .. } => {
                AttributeAddress::new(AttributeOwner::Template(*template), attribute.clone())
            }
            Self::Shared { attribute, .. } => {
                AttributeAddress::new(AttributeOwner::SharedPool, attribute.clone())
            }
        }
    }

    /// Read the current value.
    ///
    /// # Errors
    ///
    /// Propagates host failures.
    pub fn read(&self, graph: &dyn DocumentGraph) -> Result<NativeValue, GraphError> {
        graph.read(&self.address())
    }

    /// Write `value` with exactly one host write, or none when read-only.
    ///
    /// # Errors
    ///
    /// Host failures other than a read-only refusal are returned as-is.
    pub fn apply(&self, graph: &dyn DocumentGraph, value: &NativeValue) -> Result<ApplyOutcome, GraphError> {
        if !self.is_mutable() {
            return Ok(ApplyOutcome::ReadOnly);
        }
        match graph.write(&self.address(), value) {
            Ok(()) => Ok(ApplyOutcome::Applied),
            Err(GraphError::ReadOnly(_)) => Ok(ApplyOutcome::ReadOnly),
            Err(e) => Err(e),
        }
    }
}

//! Abstract document graph trait.

use thiserror::Error;

use crate::attribute::{AttributeAddress, AttributeDescriptor, Scope, StorageKind};
use crate::entity::{EntityId, TemplateId};
use crate::value::NativeValue;

/// Errors reported by a document graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// Entity not found.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Template not found.
    #[error("Template not found: {0}")]
    TemplateNotFound(TemplateId),

    /// No attribute at the given address.
    #[error("Attribute not found: {0}")]
    AttributeNotFound(AttributeAddress),

    /// Attribute already defined at the given address.
    #[error("Attribute already defined: {0}")]
    DuplicateAttribute(AttributeAddress),

    /// The host refuses writes to this attribute.
    #[error("Attribute is read-only: {0}")]
    ReadOnly(AttributeAddress),

    /// Value kind does not match the attribute kind.
    #[error("Kind mismatch for {address}: expected {expected}, got {actual}")]
    KindMismatch {
        /// Target attribute.
        address: AttributeAddress,
        /// Attribute kind.
        expected: StorageKind,
        /// Kind of the supplied value.
        actual: StorageKind,
    },

    /// The host rejected the value (range check, missing reference, ...).
    #[error("Value rejected for {address}: {reason}")]
    Rejected {
        /// Target attribute.
        address: AttributeAddress,
        /// Host-supplied reason.
        reason: String,
    },

    /// A transaction is already open on this graph.
    #[error("Transaction already open: {name}")]
    TransactionAlreadyOpen {
        /// Name of the open transaction.
        name: String,
    },

    /// A write, commit or rollback was attempted without a transaction.
    #[error("No open transaction")]
    NoOpenTransaction,

    /// Backend failure.
    #[error("Document graph backend error: {0}")]
    Backend(String),
}

impl GraphError {
    /// True for errors that concern one attribute write and leave the
    /// transaction usable. Everything else is a fault.
    #[must_use]
    pub const fn is_item_rejection(&self) -> bool {
        matches!(
            self,
            Self::ReadOnly(_) | Self::KindMismatch { .. } | Self::Rejected { .. }
        )
    }
}

/// Contract of the host document graph.
///
/// # Transactions
/// - At most one transaction is open at a time; `begin_transaction` fails
///   with `TransactionAlreadyOpen` otherwise.
/// - `write` is only valid between `begin_transaction` and
///   `commit`/`rollback`.
/// - `rollback` restores every value written since `begin_transaction`.
pub trait DocumentGraph: Send + Sync {
    /// Attributes of `entity` stored at `scope`.
    ///
    /// An entity without a template has no template-scope attributes.
    fn list_attributes(&self, entity: EntityId, scope: Scope) -> Result<Vec<AttributeDescriptor>, GraphError>;

    /// Read the current value of an attribute.
    fn read(&self, address: &AttributeAddress) -> Result<NativeValue, GraphError>;

    /// Write an attribute value inside the open transaction.
    fn write(&self, address: &AttributeAddress, value: &NativeValue) -> Result<(), GraphError>;

    /// Whether the host allows writing the attribute.
    fn is_mutable(&self, address: &AttributeAddress) -> Result<bool, GraphError>;

    /// Open a named transaction.
    fn begin_transaction(&self, name: &str) -> Result<(), GraphError>;

    /// Commit the open transaction.
    fn commit(&self) -> Result<(), GraphError>;

    /// Roll back the open transaction.
    fn rollback(&self) -> Result<(), GraphError>;

    /// True while a transaction is open.
    fn has_open_transaction(&self) -> bool;
}

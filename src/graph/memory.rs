//! In-memory document graph.
//!
//! Thread-safe reference implementation of [`DocumentGraph`]. It keeps an
//! undo journal for the open transaction, counts commits and rollbacks, and
//! can inject write faults so failure paths can be exercised without a host.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeAddress, AttributeDescriptor, AttributeOwner, Scope};
use crate::entity::{EntityId, TemplateId};
use crate::graph::traits::{DocumentGraph, GraphError};
use crate::value::NativeValue;

fn lock_err(context: &'static str) -> GraphError {
    GraphError::Backend(format!("poisoned lock: {context}"))
}

/// Failure injected into writes of one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "reason", rename_all = "snake_case")]
pub enum WriteFault {
    /// The host rejects the value; the transaction stays usable.
    Reject(String),
    /// The host fails internally.
    Fault(String),
}

#[derive(Debug, Clone)]
struct StoredAttribute {
    value: NativeValue,
    mutable: bool,
}

#[derive(Debug, Clone)]
struct TemplateRecord {
    name: String,
    attributes: BTreeMap<String, StoredAttribute>,
}

#[derive(Debug, Clone)]
struct EntityRecord {
    name: String,
    template: Option<TemplateId>,
    attributes: BTreeMap<String, StoredAttribute>,
}

#[derive(Debug)]
struct OpenTransaction {
    name: String,
    undo: Vec<(AttributeAddress, NativeValue)>,
}

#[derive(Debug, Default)]
struct GraphState {
    templates: HashMap<TemplateId, TemplateRecord>,
    entities: HashMap<EntityId, EntityRecord>,
    shared: BTreeMap<String, StoredAttribute>,
    transaction: Option<OpenTransaction>,
    faults: HashMap<AttributeAddress, WriteFault>,
    commits: usize,
    rollbacks: usize,
    writes: usize,
}

impl GraphState {
    fn attributes(&self, owner: AttributeOwner) -> Result<&BTreeMap<String, StoredAttribute>, GraphError> {
        match owner {
            AttributeOwner::Entity(id) => self
                .entities
                .get(&id)
                .map(|e| &e.attributes)
                .ok_or(GraphError::EntityNotFound(id)),
            AttributeOwner::Template(id) => self
                .templates
                .get(&id)
                .map(|t| &t.attributes)
                .ok_or(GraphError::TemplateNotFound(id)),
            AttributeOwner::SharedPool => Ok(&self.shared),
        }
    }

    fn attributes_mut(
        &mut self,
        owner: AttributeOwner,
    ) -> Result<&mut BTreeMap<String, StoredAttribute>, GraphError> {
        match owner {
            AttributeOwner::Entity(id) => self
                .entities
                .get_mut(&id)
                .map(|e| &mut e.attributes)
                .ok_or(GraphError::EntityNotFound(id)),
            AttributeOwner::Template(id) => self
                .templates
                .get_mut(&id)
                .map(|t| &mut t.attributes)
                .ok_or(GraphError::TemplateNotFound(id)),
            AttributeOwner::SharedPool => Ok(&mut self.shared),
        }
    }

    fn slot(&self, address: &AttributeAddress) -> Result<&StoredAttribute, GraphError> {
        self.attributes(address.owner)?
            .get(&address.name)
            .ok_or_else(|| GraphError::AttributeNotFound(address.clone()))
    }

    fn slot_mut(&mut self, address: &AttributeAddress) -> Result<&mut StoredAttribute, GraphError> {
        self.attributes_mut(address.owner)?
            .get_mut(&address.name)
            .ok_or_else(|| GraphError::AttributeNotFound(address.clone()))
    }
}

fn descriptors(owner: AttributeOwner, attrs: &BTreeMap<String, StoredAttribute>) -> Vec<AttributeDescriptor> {
    attrs
        .iter()
        .map(|(name, slot)| AttributeDescriptor {
            address: AttributeAddress::new(owner, name.clone()),
            kind: slot.value.kind(),
        })
        .collect()
}

/// Thread-safe in-memory document graph.
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    state: RwLock<GraphState>,
}

impl InMemoryGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template.
    pub fn add_template(&self, name: impl Into<String>) -> Result<TemplateId, GraphError> {
        let mut state = self.state.write().map_err(|_| lock_err("graph.add_template"))?;
        let id = TemplateId::new();
        state.templates.insert(
            id,
            TemplateRecord {
                name: name.into(),
                attributes: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    /// Add an entity, optionally deferring to a template.
    pub fn add_entity(
        &self,
        name: impl Into<String>,
        template: Option<TemplateId>,
    ) -> Result<EntityId, GraphError> {
        let mut state = self.state.write().map_err(|_| lock_err("graph.add_entity"))?;
        if let Some(t) = template {
            if !state.templates.contains_key(&t) {
                return Err(GraphError::TemplateNotFound(t));
            }
        }
        let id = EntityId::new();
        state.entities.insert(
            id,
            EntityRecord {
                name: name.into(),
                template,
                attributes: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    /// Define an attribute with its initial value. The value fixes the kind.
    pub fn define_attribute(
        &self,
        owner: AttributeOwner,
        name: impl Into<String>,
        value: NativeValue,
        mutable: bool,
    ) -> Result<(), GraphError> {
        let mut state = self.state.write().map_err(|_| lock_err("graph.define_attribute"))?;
        let address = AttributeAddress::new(owner, name);
        let attrs = state.attributes_mut(owner)?;
        if attrs.contains_key(&address.name) {
            return Err(GraphError::DuplicateAttribute(address));
        }
        attrs.insert(address.name, StoredAttribute { value, mutable });
        Ok(())
    }

    /// Make writes to `address` fail.
    pub fn inject_fault(&self, address: AttributeAddress, fault: WriteFault) -> Result<(), GraphError> {
        let mut state = self.state.write().map_err(|_| lock_err("graph.inject_fault"))?;
        state.faults.insert(address, fault);
        Ok(())
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) -> Result<(), GraphError> {
        let mut state = self.state.write().map_err(|_| lock_err("graph.clear_faults"))?;
        state.faults.clear();
        Ok(())
    }

    /// Number of committed transactions.
    pub fn commit_count(&self) -> Result<usize, GraphError> {
        let state = self.state.read().map_err(|_| lock_err("graph.commit_count"))?;
        Ok(state.commits)
    }

    /// Number of rolled back transactions.
    pub fn rollback_count(&self) -> Result<usize, GraphError> {
        let state = self.state.read().map_err(|_| lock_err("graph.rollback_count"))?;
        Ok(state.rollbacks)
    }

    /// Number of successful writes, including rolled back ones.
    pub fn write_count(&self) -> Result<usize, GraphError> {
        let state = self.state.read().map_err(|_| lock_err("graph.write_count"))?;
        Ok(state.writes)
    }

    /// Name of the open transaction, if any.
    pub fn open_transaction_name(&self) -> Result<Option<String>, GraphError> {
        let state = self.state.read().map_err(|_| lock_err("graph.open_transaction_name"))?;
        Ok(state.transaction.as_ref().map(|t| t.name.clone()))
    }

    /// Export the current values.
    pub fn snapshot(&self) -> Result<GraphSnapshot, GraphError> {
        let state = self.state.read().map_err(|_| lock_err("graph.snapshot"))?;

        let export = |attrs: &BTreeMap<String, StoredAttribute>| {
            attrs
                .iter()
                .map(|(name, slot)| SnapshotAttribute {
                    name: name.clone(),
                    value: slot.value.clone(),
                    mutable: slot.mutable,
                })
                .collect::<Vec<_>>()
        };

        let mut templates: Vec<SnapshotTemplate> = state
            .templates
            .iter()
            .map(|(id, t)| SnapshotTemplate {
                id: *id,
                name: t.name.clone(),
                attributes: export(&t.attributes),
            })
            .collect();
        templates.sort_by_key(|t| t.id);

        let mut entities: Vec<SnapshotEntity> = state
            .entities
            .iter()
            .map(|(id, e)| SnapshotEntity {
                id: *id,
                name: e.name.clone(),
                template: e.template,
                attributes: export(&e.attributes),
            })
            .collect();
        entities.sort_by_key(|e| e.id);

        Ok(GraphSnapshot {
            templates,
            entities,
            shared: export(&state.shared),
        })
    }

    /// Build a graph from a snapshot.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self, GraphError> {
        let import = |attrs: Vec<SnapshotAttribute>, owner: AttributeOwner| {
            let mut out = BTreeMap::new();
            for a in attrs {
                let address = AttributeAddress::new(owner, a.name);
                if out.contains_key(&address.name) {
                    return Err(GraphError::DuplicateAttribute(address));
                }
                out.insert(
                    address.name,
                    StoredAttribute {
                        value: a.value,
                        mutable: a.mutable,
                    },
                );
            }
            Ok(out)
        };

        let mut state = GraphState::default();
        for t in snapshot.templates {
            let attributes = import(t.attributes, AttributeOwner::Template(t.id))?;
            state.templates.insert(
                t.id,
                TemplateRecord {
                    name: t.name,
                    attributes,
                },
            );
        }
        for e in snapshot.entities {
            if let Some(t) = e.template {
                if !state.templates.contains_key(&t) {
                    return Err(GraphError::TemplateNotFound(t));
                }
            }
            let attributes = import(e.attributes, AttributeOwner::Entity(e.id))?;
            state.entities.insert(
                e.id,
                EntityRecord {
                    name: e.name,
                    template: e.template,
                    attributes,
                },
            );
        }
        state.shared = import(snapshot.shared, AttributeOwner::SharedPool)?;

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Build a graph from a JSON snapshot.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let snapshot: GraphSnapshot = serde_json::from_str(json)
            .map_err(|e| GraphError::Backend(format!("deserialize snapshot: {e}")))?;
        Self::from_snapshot(snapshot)
    }
}

impl DocumentGraph for InMemoryGraph {
    fn list_attributes(&self, entity: EntityId, scope: Scope) -> Result<Vec<AttributeDescriptor>, GraphError> {
        let state = self.state.read().map_err(|_| lock_err("graph.list_attributes"))?;
        let record = state
            .entities
            .get(&entity)
            .ok_or(GraphError::EntityNotFound(entity))?;

        match scope {
            Scope::Instance => Ok(descriptors(AttributeOwner::Entity(entity), &record.attributes)),
            Scope::Template => match record.template {
                Some(t) => {
                    let owner = AttributeOwner::Template(t);
                    Ok(descriptors(owner, state.attributes(owner)?))
                }
                None => Ok(Vec::new()),
            },
            Scope::Shared => Ok(descriptors(AttributeOwner::SharedPool, &state.shared)),
        }
    }

    fn read(&self, address: &AttributeAddress) -> Result<NativeValue, GraphError> {
        let state = self.state.read().map_err(|_| lock_err("graph.read"))?;
        Ok(state.slot(address)?.value.clone())
    }

    fn write(&self, address: &AttributeAddress, value: &NativeValue) -> Result<(), GraphError> {
        let mut state = self.state.write().map_err(|_| lock_err("graph.write"))?;
        if state.transaction.is_none() {
            return Err(GraphError::NoOpenTransaction);
        }

        match state.faults.get(address) {
            Some(WriteFault::Reject(reason)) => {
                return Err(GraphError::Rejected {
                    address: address.clone(),
                    reason: reason.clone(),
                })
            }
            Some(WriteFault::Fault(reason)) => return Err(GraphError::Backend(reason.clone())),
            None => {}
        }

        if let NativeValue::Reference(target) = value {
            if !state.entities.contains_key(target) {
                return Err(GraphError::Rejected {
                    address: address.clone(),
                    reason: format!("reference target {target} does not exist"),
                });
            }
        }

        let slot = state.slot_mut(address)?;
        if !slot.mutable {
            return Err(GraphError::ReadOnly(address.clone()));
        }
        let expected = slot.value.kind();
        if expected != value.kind() {
            return Err(GraphError::KindMismatch {
                address: address.clone(),
                expected,
                actual: value.kind(),
            });
        }
        let previous = std::mem::replace(&mut slot.value, value.clone());

        state.writes += 1;
        if let Some(txn) = state.transaction.as_mut() {
            txn.undo.push((address.clone(), previous));
        }
        Ok(())
    }

    fn is_mutable(&self, address: &AttributeAddress) -> Result<bool, GraphError> {
        let state = self.state.read().map_err(|_| lock_err("graph.is_mutable"))?;
        Ok(state.slot(address)?.mutable)
    }

    fn begin_transaction(&self, name: &str) -> Result<(), GraphError> {
        let mut state = self.state.write().map_err(|_| lock_err("graph.begin_transaction"))?;
        if let Some(open) = state.transaction.as_ref() {
            return Err(GraphError::TransactionAlreadyOpen {
                name: open.name.clone(),
            });
        }
        state.transaction = Some(OpenTransaction {
            name: name.to_string(),
            undo: Vec::new(),
        });
        Ok(())
    }

    fn commit(&self) -> Result<(), GraphError> {
        let mut state = self.state.write().map_err(|_| lock_err("graph.commit"))?;
        if state.transaction.take().is_none() {
            return Err(GraphError::NoOpenTransaction);
        }
        state.commits += 1;
        Ok(())
    }

    fn rollback(&self) -> Result<(), GraphError> {
        let mut state = self.state.write().map_err(|_| lock_err("graph.rollback"))?;
        let txn = state.transaction.take().ok_or(GraphError::NoOpenTransaction)?;
        for (address, previous) in txn.undo.into_iter().rev() {
            state.slot_mut(&address)?.value = previous;
        }
        state.rollbacks += 1;
        Ok(())
    }

    fn has_open_transaction(&self) -> bool {
        self.state
            .read()
            .map(|s| s.transaction.is_some())
            .unwrap_or(true)
    }
}

/// Serializable graph contents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Templates.
    #[serde(default)]
    pub templates: Vec<SnapshotTemplate>,
    /// Entities.
    #[serde(default)]
    pub entities: Vec<SnapshotEntity>,
    /// Shared pool attributes.
    #[serde(default)]
    pub shared: Vec<SnapshotAttribute>,
}

/// Template in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTemplate {
    /// Template ID.
    pub id: TemplateId,
    /// Display name.
    pub name: String,
    /// Template-scope attributes.
    #[serde(default)]
    pub attributes: Vec<SnapshotAttribute>,
}

/// Entity in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntity {
    /// Entity ID.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Template the entity defers to.
    #[serde(default)]
    pub template: Option<TemplateId>,
    /// Instance-scope attributes.
    #[serde(default)]
    pub attributes: Vec<SnapshotAttribute>,
}

/// Attribute in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotAttribute {
    /// Attribute name.
    pub name: String,
    /// Current value; its type fixes the storage kind.
    pub value: NativeValue,
    /// Whether the attribute can be written.
    #[serde(default = "default_mutable")]
    pub mutable: bool,
}

const fn default_mutable() -> bool {
    true
}

//! Attribute resolution across the scope chain.
//!
//! An entity sees the attributes stored on itself, on its template and in the
//! shared pool. When a name exists at several scopes the narrowest one wins:
//! `Instance` shadows `Template` shadows `Shared`.
//!
//! Two entry points exist on purpose. `resolve_exact` is for tools that know
//! the attribute name and must fail loudly on a typo. `resolve_fuzzy` is for
//! import mapping, where headers only approximate attribute names.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::attribute::{AttributeDescriptor, AttributeHandle, Scope};
use crate::entity::EntityId;
use crate::graph::{DocumentGraph, GraphError};
use crate::matching::{FuzzyMatch, FuzzyMatcher};
use crate::value::NativeValue;

/// Errors raised while resolving an attribute.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// No attribute with this exact name at any scope.
    #[error("Attribute '{name}' not found on entity {entity}")]
    NotFound {
        /// Entity searched.
        entity: EntityId,
        /// Requested name.
        name: String,
    },

    /// The matcher found no acceptable candidate.
    #[error("No attribute on entity {entity} matches '{query}'")]
    NoMatch {
        /// Entity searched.
        entity: EntityId,
        /// Query text.
        query: String,
    },

    /// Several candidates matched equally well.
    #[error("'{query}' is ambiguous: '{chosen}' ties with {tied_with:?}")]
    Ambiguous {
        /// Query text.
        query: String,
        /// Lexicographically smallest of the tied candidates.
        chosen: String,
        /// Remaining tied candidates.
        tied_with: Vec<String>,
    },

    /// The document graph failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Names a fuzzy lookup may resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "names", rename_all = "snake_case")]
pub enum AcceptedNames {
    /// Every attribute visible to the entity.
    #[default]
    All,
    /// Only these attribute names (exact, case-sensitive).
    Only(BTreeSet<String>),
}

impl AcceptedNames {
    /// Restrict to the given names.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    /// Whether `name` may be returned.
    #[must_use]
    pub fn accepts(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.contains(name),
        }
    }
}

/// Result of a fuzzy lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyResolution {
    /// Resolved attribute.
    pub handle: AttributeHandle,
    /// How the name was matched.
    pub matched: FuzzyMatch,
}

/// Finds attribute handles for entities.
#[derive(Clone)]
pub struct AttributeResolver {
    graph: Arc<dyn DocumentGraph>,
    matcher: FuzzyMatcher,
}

impl std::fmt::Debug for AttributeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeResolver")
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

impl AttributeResolver {
    /// Create a resolver with the default matcher.
    #[must_use]
    pub fn new(graph: Arc<dyn DocumentGraph>) -> Self {
        Self::with_matcher(graph, FuzzyMatcher::default())
    }

    /// Create a resolver with a specific matcher.
    #[must_use]
    pub fn with_matcher(graph: Arc<dyn DocumentGraph>, matcher: FuzzyMatcher) -> Self {
        Self { graph, matcher }
    }

    /// Matcher used by [`resolve_fuzzy`](Self::resolve_fuzzy).
    #[must_use]
    pub const fn matcher(&self) -> &FuzzyMatcher {
        &self.matcher
    }

    /// Resolve `name` exactly (case-sensitive), walking
    /// Instance, Template, Shared in order.
    ///
    /// # Errors
    ///
    /// `NotFound` when no scope has the name; `Graph` on host failures.
    pub fn resolve_exact(&self, entity: EntityId, name: &str) -> Result<AttributeHandle, ResolveError> {
        for scope in Scope::CHAIN {
            let found = self
                .graph
                .list_attributes(entity, scope)?
                .into_iter()
                .find(|d| d.name() == name);
            if let Some(descriptor) = found {
                return self.handle_for(entity, descriptor);
            }
        }
        Err(ResolveError::NotFound {
            entity,
            name: name.to_string(),
        })
    }

    /// Resolve `query` through the fuzzy matcher.
    ///
    /// # Errors
    ///
    /// `NoMatch` when nothing is accepted, `Ambiguous` on a tie, `Graph` on
    /// host failures.
    pub fn resolve_fuzzy(
        &self,
        entity: EntityId,
        query: &str,
        accepted: &AcceptedNames,
    ) -> Result<FuzzyResolution, ResolveError> {
        let visible = self.visible_attributes(entity)?;
        let names = visible
            .iter()
            .map(AttributeDescriptor::name)
            .filter(|n| accepted.accepts(n));

        let Some(matched) = self.matcher.find_match(query, names) else {
            return Err(ResolveError::NoMatch {
                entity,
                query: query.to_string(),
            });
        };

        if matched.is_ambiguous() {
            debug!(
                query,
                chosen = %matched.candidate,
                ties = matched.tied_with.len(),
                "ambiguous attribute match"
            );
            return Err(ResolveError::Ambiguous {
                query: query.to_string(),
                chosen: matched.candidate,
                tied_with: matched.tied_with,
            });
        }

        let descriptor = visible
            .into_iter()
            .find(|d| d.name() == matched.candidate)
            .ok_or_else(|| ResolveError::NotFound {
                entity,
                name: matched.candidate.clone(),
            })?;

        debug!(
            query,
            attribute = %matched.candidate,
            strategy = %matched.strategy,
            score = matched.score,
            "fuzzy attribute match"
        );

        Ok(FuzzyResolution {
            handle: self.handle_for(entity, descriptor)?,
            matched,
        })
    }

    /// Attributes visible to `entity` after shadowing, ordered by name.
    ///
    /// # Errors
    ///
    /// Propagates host failures.
    pub fn visible_attributes(&self, entity: EntityId) -> Result<Vec<AttributeDescriptor>, ResolveError> {
        let mut visible: BTreeMap<String, AttributeDescriptor> = BTreeMap::new();
        for scope in Scope::CHAIN {
            for descriptor in self.graph.list_attributes(entity, scope)? {
                visible
                    .entry(descriptor.name().to_string())
                    .or_insert(descriptor);
            }
        }
        Ok(visible.into_values().collect())
    }

    /// Resolve exactly and read the current value.
    ///
    /// # Errors
    ///
    /// As [`resolve_exact`](Self::resolve_exact), plus read failures.
    pub fn read_exact(&self, entity: EntityId, name: &str) -> Result<NativeValue, ResolveError> {
        let handle = self.resolve_exact(entity, name)?;
        Ok(self.graph.read(&handle.address)?)
    }

    fn handle_for(&self, entity: EntityId, descriptor: AttributeDescriptor) -> Result<AttributeHandle, ResolveError> {
        let mutable = self.graph.is_mutable(&descriptor.address)?;
        let scope = descriptor.scope();
        Ok(AttributeHandle {
            entity,
            address: descriptor.address,
            kind: descriptor.kind,
            scope,
            mutable,
        })
    }
}

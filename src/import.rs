//! Tabular import mapping.
//!
//! Headers of an external table rarely spell attribute names exactly. A
//! [`HeaderMapping`] is built once against an exemplar entity through the
//! fuzzy resolver, and then turns each `{header -> value}` row into exact-name
//! [`MutationRequest`]s. Headers that could not be mapped are kept so the
//! caller can resolve them manually.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attribute::Scope;
use crate::batch::MutationRequest;
use crate::entity::EntityId;
use crate::error::{ParamError, ParamResult};
use crate::matching::MatchStrategy;
use crate::resolve::{AcceptedNames, AttributeResolver, ResolveError};
use crate::value::RawValue;

/// One table row, keyed by header text.
pub type ImportRow = BTreeMap<String, RawValue>;

/// A header mapped to an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedColumn {
    /// Header text as it appears in the table.
    pub header: String,
    /// Exact attribute name.
    pub attribute: String,
    /// Scope the attribute resolved at on the exemplar.
    pub scope: Scope,
    /// Matcher stage that accepted the header; `None` when assigned manually.
    pub strategy: Option<MatchStrategy>,
    /// Match score in `[0, 1]`.
    pub score: f64,
}

/// Why a header was left unmapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No attribute matched well enough.
    NoMatch,
    /// Several attributes matched equally well.
    Ambiguous {
        /// Suggested candidate.
        chosen: String,
        /// Other tied candidates.
        tied_with: Vec<String>,
    },
    /// The matched attribute is already claimed by another header.
    DuplicateTarget {
        /// Attribute both headers matched.
        attribute: String,
        /// Header that claimed it first.
        claimed_by: String,
    },
}

/// A header the caller has to map by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedHeader {
    /// Header text.
    pub header: String,
    /// Why it was not mapped.
    pub reason: UnresolvedReason,
}

/// Requests produced from one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowRequests {
    /// Exact-name requests for mapped, non-blank cells.
    pub requests: Vec<MutationRequest>,
    /// Cells under headers with no mapping.
    pub unmapped: Vec<(String, RawValue)>,
    /// Mapped headers whose cell was blank.
    pub skipped_blank: Vec<String>,
}

/// Header-to-attribute mapping for one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderMapping {
    columns: Vec<MappedColumn>,
    unresolved: Vec<UnresolvedHeader>,
}

impl HeaderMapping {
    /// Map `headers` against the attributes visible on `exemplar`.
    ///
    /// Headers are processed in order; when two headers land on the same
    /// attribute the first one keeps it.
    ///
    /// # Errors
    ///
    /// Returns `ParamError::Resolve` if the graph fails.
    pub fn build<I, S>(
        resolver: &AttributeResolver,
        exemplar: EntityId,
        headers: I,
        accepted: &AcceptedNames,
    ) -> ParamResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mapping = Self::default();
        for header in headers {
            let header = header.as_ref();
            if mapping.contains_header(header) {
                continue;
            }
            match resolver.resolve_fuzzy(exemplar, header, accepted) {
                Ok(resolution) => {
                    let attribute = resolution.handle.name().to_string();
                    if let Some(claimed_by) = mapping.header_for(&attribute) {
                        let claimed_by = claimed_by.to_string();
                        mapping.unresolve(header, UnresolvedReason::DuplicateTarget { attribute, claimed_by });
                        continue;
                    }
                    mapping.columns.push(MappedColumn {
                        header: header.to_string(),
                        attribute,
                        scope: resolution.handle.scope,
                        strategy: Some(resolution.matched.strategy),
                        score: resolution.matched.score,
                    });
                }
                Err(ResolveError::NoMatch { .. } | ResolveError::NotFound { .. }) => {
                    mapping.unresolve(header, UnresolvedReason::NoMatch);
                }
                Err(ResolveError::Ambiguous { chosen, tied_with, .. }) => {
                    mapping.unresolve(header, UnresolvedReason::Ambiguous { chosen, tied_with });
                }
                Err(e @ ResolveError::Graph(_)) => return Err(e.into()),
            }
        }

        debug!(
            mapped = mapping.columns.len(),
            unresolved = mapping.unresolved.len(),
            "header mapping built"
        );
        Ok(mapping)
    }

    /// Map `header` to an exact attribute name chosen by the caller.
    ///
    /// Replaces any existing mapping of the header and clears it from the
    /// unresolved list.
    ///
    /// # Errors
    ///
    /// `ParamError::Resolve` if the attribute does not exist on the exemplar,
    /// `ParamError::InvalidRequest` if another header already maps to it.
    pub fn assign(
        &mut self,
        resolver: &AttributeResolver,
        exemplar: EntityId,
        header: &str,
        attribute: &str,
    ) -> ParamResult<()> {
        let handle = resolver.resolve_exact(exemplar, attribute)?;
        if let Some(other) = self.header_for(attribute).filter(|h| *h != header) {
            return Err(ParamError::InvalidRequest {
                reason: format!("attribute '{attribute}' is already mapped from header '{other}'"),
            });
        }

        self.columns.retain(|c| c.header != header);
        self.unresolved.retain(|u| u.header != header);
        self.columns.push(MappedColumn {
            header: header.to_string(),
            attribute: handle.name().to_string(),
            scope: handle.scope,
            strategy: None,
            score: 1.0,
        });
        Ok(())
    }

    /// Mapped columns in header order.
    #[must_use]
    pub fn columns(&self) -> &[MappedColumn] {
        &self.columns
    }

    /// Headers still needing a manual mapping.
    #[must_use]
    pub fn unresolved(&self) -> &[UnresolvedHeader] {
        &self.unresolved
    }

    /// Whether every header is mapped.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Attribute mapped from `header`.
    #[must_use]
    pub fn attribute_for(&self, header: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.header == header)
            .map(|c| c.attribute.as_str())
    }

    /// Build exact-name requests for one row.
    ///
    /// Blank text cells under mapped headers are skipped, not written.
    #[must_use]
    pub fn requests_for_row(&self, entity: EntityId, row: &ImportRow) -> RowRequests {
        let mut out = RowRequests::default();
        for column in &self.columns {
            let Some(value) = row.get(&column.header) else {
                continue;
            };
            if matches!(value, RawValue::Text(s) if s.trim().is_empty()) {
                out.skipped_blank.push(column.header.clone());
                continue;
            }
            out.requests
                .push(MutationRequest::new(entity, column.attribute.clone(), value.clone()));
        }

        let mapped: BTreeSet<&str> = self.columns.iter().map(|c| c.header.as_str()).collect();
        out.unmapped = row
            .iter()
            .filter(|(header, _)| !mapped.contains(header.as_str()))
            .map(|(header, value)| (header.clone(), value.clone()))
            .collect();
        out
    }

    fn contains_header(&self, header: &str) -> bool {
        self.columns.iter().any(|c| c.header == header) || self.unresolved.iter().any(|u| u.header == header)
    }

    fn header_for(&self, attribute: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.attribute == attribute)
            .map(|c| c.header.as_str())
    }

    fn unresolve(&mut self, header: &str, reason: UnresolvedReason) {
        debug!(header, ?reason, "header left unmapped");
        self.unresolved.push(UnresolvedHeader {
            header: header.to_string(),
            reason,
        });
    }
}

//! # paramkit - Attribute Resolution and Batch Mutation for Document Graphs
//!
//! paramkit finds named attributes on the elements of a hierarchical document
//! graph, converts external values into each attribute's native storage kind,
//! and applies sets of writes atomically inside a single host transaction.
//!
//! ## Core Concepts
//!
//! - **Scope chain**: an entity sees attributes on itself, on its template and
//!   in the shared pool; the narrowest scope shadows the wider ones
//! - **AttributeResolver**: exact lookups for tools, fuzzy lookups for imports
//! - **ValueCoercer**: text and numbers to native values, with unit and
//!   symbolic-code conversion driven by configuration
//! - **TransactionCoordinator**: pre-validates a batch, opens exactly one
//!   transaction, applies, then commits or rolls back as a whole
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use paramkit::{
//!     AttributeOwner, BatchMode, InMemoryGraph, MutationRequest, NativeValue, Outcome,
//!     ParamConfig, TransactionCoordinator,
//! };
//!
//! let graph = Arc::new(InMemoryGraph::new());
//! let group = graph.add_entity("Rebar Set 1", None).unwrap();
//! graph
//!     .define_attribute(AttributeOwner::Entity(group), "Bar Spacing", 0.5.into(), true)
//!     .unwrap();
//!
//! let coordinator =
//!     TransactionCoordinator::new(graph.clone(), ParamConfig::millimeter_preset()).unwrap();
//! let result = coordinator.run_batch(
//!     vec![MutationRequest::new(group, "Bar Spacing", "150")],
//!     BatchMode::Strict,
//! );
//!
//! assert_eq!(result.outcomes(), vec![Outcome::Applied]);
//! let stored = result.items[0].value.as_ref().and_then(NativeValue::as_number).unwrap();
//! assert!((stored - 150.0 / 304.8).abs() < 1e-9);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod attribute;
pub mod entity;
pub mod error;
pub mod value;

// Matching and coercion
pub mod coerce;
pub mod matching;

// Graph access and resolution
pub mod graph;
pub mod resolve;
pub mod strategy;

// Batches, configuration and reporting
pub mod batch;
pub mod config;
pub mod import;
pub mod report;

pub use attribute::{AttributeAddress, AttributeDescriptor, AttributeHandle, AttributeOwner, Scope, StorageKind};
pub use entity::{BatchId, EntityId, TemplateId};
pub use error::{ConfigError, ParamError, ParamResult};
pub use value::{ConversionApplied, NativeValue, RawValue, ValueEnvelope};

pub use coerce::{CodeTable, CoercionError, InputUnit, NamePattern, UnitRule, ValueCoercer};
pub use matching::{FuzzyMatch, FuzzyMatcher, MatchStrategy};

pub use graph::{
    DocumentGraph, GraphError, GraphSnapshot, InMemoryGraph, SnapshotAttribute, SnapshotEntity,
    SnapshotTemplate, WriteFault,
};
pub use resolve::{AcceptedNames, AttributeResolver, FuzzyResolution, ResolveError};
pub use strategy::{ApplyOutcome, MutationStrategy};

pub use batch::{
    BatchMode, BatchOutcome, BatchResult, BatchState, BatchSummary, CancelToken, MutationRequest,
    MutationRequestBuilder, MutationResult, NameLookup, Outcome, TransactionCoordinator,
};
pub use config::ParamConfig;
pub use import::{HeaderMapping, ImportRow, MappedColumn, RowRequests, UnresolvedHeader, UnresolvedReason};
pub use report::{CollectingReportSink, ReportSink, TracingReportSink};

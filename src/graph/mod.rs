//! Document graph boundary.
//!
//! The host application owns the document graph and its transaction
//! primitives. [`DocumentGraph`] is the contract this crate consumes;
//! [`InMemoryGraph`] is a reference implementation for tests and for
//! embedders without a live host.

mod memory;
mod traits;

pub use memory::{GraphSnapshot, InMemoryGraph, SnapshotAttribute, SnapshotEntity, SnapshotTemplate, WriteFault};
pub use traits::{DocumentGraph, GraphError};

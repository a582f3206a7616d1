//! Dependency Network for Dataflow Operations
//!
//! This module builds the bipartite dependency graph between *data nodes*
//! (named value slots) and *operation nodes* (registered computations), and
//! validates it at construction time. It enables:
//!
//! - Composing independently declared operations into one network
//! - Lazy creation and sharing of data-node identity by name
//! - Cycle detection over operation-data-operation chains
//! - Read-only introspection and DOT export for debugging
//!
//! # Design Principles
//!
//! Following Parnas's information hiding principles:
//! - This module hides the graph representation (an index arena with
//!   interned names, not reference-linked nodes)
//! - Exposes only abstract operations: [`compose`], producers/consumers
//!   lookup, and iteration in declaration order

mod error;
mod network;

pub use error::{ComposeError, ComposeResult};
pub use network::{compose, DataId, Network, OpId};

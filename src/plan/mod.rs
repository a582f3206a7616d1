//! Plan Compilation for Dataflow Networks
//!
//! This module prunes a [`Network`](crate::Network) down to the minimal
//! sub-graph that can serve one concrete (inputs, outputs) request, and
//! orders the surviving operations into an immutable [`Plan`]. It enables:
//!
//! - Backward reachability from requested outputs to bound the candidates
//! - Forward feasibility from the given inputs to drop unrunnable candidates
//! - Deterministic topological ordering (Kahn's algorithm, declaration-order
//!   tie-break)
//! - Early, structured failure when a requested output cannot be reached
//!
//! A compiled plan is specific to one request *shape* and reusable across
//! any number of executions with different input values.

mod compile;
mod error;

pub use compile::Plan;
pub use error::{CompileError, CompileResult};

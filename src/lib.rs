//! Plegma: Dataflow Computation-Graph Engine for Rust
//!
//! `plegma` (πλέγμα, Greek for "mesh" or "network") wires independently
//! declared, named operations into a dependency graph, compiles that graph
//! down to the minimal ordered plan for one concrete request, and executes
//! the plan against concrete values while tracking which values got
//! overwritten along the way.
//!
//! # Features
//!
//! - **Compose**: Build a validated network from reusable operations -
//!   duplicate names, empty output sets, and dependency cycles are rejected
//!   at construction time
//! - **Compile**: Prune the network to exactly the operations a given
//!   (inputs, outputs) request needs, deterministically ordered
//! - **Execute**: Run a plan sequentially or with automatic parallelization
//!   of independent steps
//! - **Provenance**: Every displaced value is recorded in an overwrite
//!   history, reproducible across runs
//!
//! # Quick Start
//!
//! ```
//! use plegma::prelude::*;
//! use serde_json::json;
//!
//! let add = FnOperation::new("add", &["a", "b"], &["sum"], |inputs: &ValueMap| {
//!     let sum = inputs["a"].as_i64().unwrap() + inputs["b"].as_i64().unwrap();
//!     Ok(ValueMap::from([("sum".to_string(), json!(sum))]))
//! });
//! let double = FnOperation::new("double", &["sum"], &["doubled"], |inputs: &ValueMap| {
//!     let doubled = inputs["sum"].as_i64().unwrap() * 2;
//!     Ok(ValueMap::from([("doubled".to_string(), json!(doubled))]))
//! });
//!
//! let network = compose([add.into_arc(), double.into_arc()]).unwrap();
//! let plan = network.compile(["a", "b"], ["doubled"]).unwrap();
//!
//! let values = ValueMap::from([
//!     ("a".to_string(), json!(2)),
//!     ("b".to_string(), json!(3)),
//! ]);
//! let solution = plan.execute(&values).unwrap();
//! assert_eq!(solution.get("doubled"), Some(&json!(10)));
//! ```
//!
//! # Module Organization
//!
//! Following Parnas's information hiding principles, each module hides
//! specific design decisions that are likely to change:
//!
//! - [`core`]: Operation contract and value currency (hides the dynamic
//!   value representation)
//! - [`graph`]: Network composition and validation (hides the graph
//!   representation)
//! - [`plan`]: Request-specific compilation (hides the pruning and ordering
//!   strategy)
//! - [`executor`]: Plan execution (hides the scheduling strategy and store
//!   management)
//!
//! # Concurrency Model
//!
//! Networks and plans are immutable after construction and safe to share
//! read-only across threads. Each execution call owns its value store
//! exclusively; the same plan may be executed concurrently by any number of
//! calls.

pub mod core;
pub mod executor;
pub mod graph;
pub mod plan;

// Re-export commonly used types for convenience
pub use crate::core::{BoxError, FnOperation, Operation, OperationResult, Value, ValueMap};
pub use executor::{ExecutionError, ExecutionMethod, ExecutionResult, Executor, Overwrites, Solution};
pub use graph::{compose, ComposeError, ComposeResult, Network};
pub use plan::{CompileError, CompileResult, Plan};

// Re-export dependencies used in the public API so downstream crates don't
// hit version mismatches
pub use serde_json;
pub use tokio;

/// Prelude module for convenient glob imports
///
/// # Example
///
/// ```
/// use plegma::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{BoxError, FnOperation, Operation, OperationResult, Value, ValueMap};
    pub use crate::executor::{
        ExecutionError, ExecutionMethod, ExecutionResult, Executor, Overwrites, Solution,
    };
    pub use crate::graph::{compose, ComposeError, ComposeResult, Network};
    pub use crate::plan::{CompileError, CompileResult, Plan};

    pub use std::sync::Arc;
}

//! Plan Execution Engine
//!
//! This module walks a compiled [`Plan`](crate::Plan) against concrete input
//! values and produces a [`Solution`]: the accumulated value store plus the
//! overwrite history of every name that was written more than once.
//!
//! Two execution strategies are provided behind one surface:
//!
//! - [`Plan::execute`](crate::Plan::execute): sequential, synchronous,
//!   steps run strictly in plan order
//! - [`Executor`] with [`ExecutionMethod::Parallel`]: independent steps of
//!   the same readiness wave run concurrently on blocking workers, while
//!   merges stay serialized in plan order so overwrite histories remain
//!   reproducible
//!
//! # Design Decision Hidden
//!
//! Following Parnas's information hiding principle, this module hides *how*
//! values move through an execution: the per-call store, overwrite
//! recording, and contract verification are internal. A plan itself carries
//! no execution state, so one plan may be executed concurrently by any
//! number of calls.

mod error;
mod execution;
mod parallel;

pub use error::{ExecutionError, ExecutionResult};
pub use execution::{Overwrites, Solution};
pub use parallel::{ExecutionMethod, Executor};

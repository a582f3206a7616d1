//! Core types for the plegma dataflow engine.
//!
//! This module provides the fundamental building blocks the rest of the
//! engine consumes:
//!
//! # Domain Model
//! - [`Operation`]: The contract every computation step fulfils - a name,
//!   declared input slots (`needs`), declared output slots (`provides`), and
//!   an invocable body
//! - [`FnOperation`]: A closure-backed [`Operation`] for registering plain
//!   functions without writing a trait impl
//!
//! # Value Currency
//! - [`Value`]: Dynamic value type flowing between operations
//!   (re-exported from `serde_json`)
//! - [`ValueMap`]: Named values keyed by data-slot name
//!
//! Operations are registered by value from outside the engine; the engine
//! never parses operation definitions from text or files.

mod operation;

pub use operation::{BoxError, FnOperation, Operation, OperationResult, Value, ValueMap};

//! The operation contract
//!
//! This module defines the [`Operation`] trait, the capability every
//! computation step exposes to the engine, and [`FnOperation`], the
//! closure-backed implementation most callers use.
//!
//! # Design Decision
//!
//! An operation declares its inputs and outputs as *names* rather than
//! types. This keeps the engine agnostic of what flows through it: the graph
//! is wired purely from name sets, and values are dynamic
//! ([`serde_json::Value`]). Declared contracts are validated at runtime by
//! the executor (an operation must return every name it promised) instead of
//! relying on structural typing.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Dynamic value flowing between operations.
pub use serde_json::Value;

/// Named values keyed by data-slot name.
pub type ValueMap = HashMap<String, Value>;

/// Boxed error returned by a failing operation body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of invoking an operation body.
pub type OperationResult = std::result::Result<ValueMap, BoxError>;

/// A named, pure computation over named input/output slots.
///
/// Implementations must be cheap to share (`Send + Sync`); the engine holds
/// them as `Arc<dyn Operation>` and may invoke them from multiple threads
/// when parallel execution is enabled.
///
/// # Contract
///
/// - `name()` is unique within a composed network
/// - `provides()` is non-empty (checked at compose time)
/// - `invoke()` receives exactly the values named in `needs()` and must
///   return a value for every name in `provides()` (checked at execute time)
pub trait Operation: Send + Sync {
    /// Returns the unique name of this operation.
    fn name(&self) -> &str;

    /// Returns the names of the input slots this operation requires.
    fn needs(&self) -> &[String];

    /// Returns the names of the output slots this operation produces.
    fn provides(&self) -> &[String];

    /// Runs the computation over the given inputs.
    ///
    /// The engine only passes the values named in [`needs`](Self::needs).
    /// Any error aborts the surrounding execution atomically.
    fn invoke(&self, inputs: &ValueMap) -> OperationResult;
}

impl fmt::Debug for dyn Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name())
            .field("needs", &self.needs())
            .field("provides", &self.provides())
            .finish()
    }
}

type OperationBody = Box<dyn Fn(&ValueMap) -> OperationResult + Send + Sync>;

/// A closure-backed [`Operation`].
///
/// This is the registration surface for plain functions: give the closure a
/// name and declare which slots it reads and writes.
///
/// # Example
///
/// ```
/// use plegma::core::{FnOperation, Value, ValueMap};
///
/// let add = FnOperation::new("add", &["a", "b"], &["sum"], |inputs: &ValueMap| {
///     let a = inputs["a"].as_i64().unwrap_or(0);
///     let b = inputs["b"].as_i64().unwrap_or(0);
///     Ok(ValueMap::from([("sum".to_string(), Value::from(a + b))]))
/// });
/// assert_eq!(add.name(), "add");
/// # use plegma::core::Operation;
/// ```
pub struct FnOperation {
    name: String,
    needs: Vec<String>,
    provides: Vec<String>,
    body: OperationBody,
}

impl FnOperation {
    /// Creates a new operation from a closure.
    pub fn new<F>(name: impl Into<String>, needs: &[&str], provides: &[&str], body: F) -> Self
    where
        F: Fn(&ValueMap) -> OperationResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            needs: needs.iter().map(|s| s.to_string()).collect(),
            provides: provides.iter().map(|s| s.to_string()).collect(),
            body: Box::new(body),
        }
    }

    /// Wraps this operation in an `Arc`, ready for [`compose`](crate::compose).
    pub fn into_arc(self) -> Arc<dyn Operation> {
        Arc::new(self)
    }
}

impl Operation for FnOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn needs(&self) -> &[String] {
        &self.needs
    }

    fn provides(&self) -> &[String] {
        &self.provides
    }

    fn invoke(&self, inputs: &ValueMap) -> OperationResult {
        (self.body)(inputs)
    }
}

impl fmt::Debug for FnOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperation")
            .field("name", &self.name)
            .field("needs", &self.needs)
            .field("provides", &self.provides)
            .finish()
    }
}

impl From<FnOperation> for Arc<dyn Operation> {
    fn from(op: FnOperation) -> Self {
        Arc::new(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fn_operation_declares_contract() {
        let op = FnOperation::new("scale", &["x"], &["scaled"], |inputs| {
            let x = inputs["x"].as_f64().unwrap_or(0.0);
            Ok(ValueMap::from([("scaled".to_string(), json!(x * 2.0))]))
        });

        assert_eq!(op.name(), "scale");
        assert_eq!(op.needs(), &["x".to_string()]);
        assert_eq!(op.provides(), &["scaled".to_string()]);
    }

    #[test]
    fn test_fn_operation_invoke() {
        let op = FnOperation::new("add", &["a", "b"], &["sum"], |inputs| {
            let a = inputs["a"].as_i64().unwrap();
            let b = inputs["b"].as_i64().unwrap();
            Ok(ValueMap::from([("sum".to_string(), json!(a + b))]))
        });

        let inputs = ValueMap::from([("a".to_string(), json!(2)), ("b".to_string(), json!(3))]);
        let outputs = op.invoke(&inputs).unwrap();
        assert_eq!(outputs["sum"], json!(5));
    }

    #[test]
    fn test_fn_operation_error_propagates() {
        let op = FnOperation::new("boom", &[], &["out"], |_| {
            Err("deliberate failure".to_string().into())
        });

        let err = op.invoke(&ValueMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "deliberate failure");
    }

    #[test]
    fn test_dyn_operation_debug() {
        let op: Arc<dyn Operation> =
            FnOperation::new("noop", &["in"], &["out"], |_| Ok(ValueMap::new())).into();
        let rendered = format!("{:?}", op);
        assert!(rendered.contains("noop"));
        assert!(rendered.contains("out"));
    }
}

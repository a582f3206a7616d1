//! Error types for plan execution

use crate::core::BoxError;
use thiserror::Error;

/// Result type for execution
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Errors that can occur while executing a compiled plan
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecutionError {
    /// The supplied values do not cover the plan's required inputs
    #[error("missing input values: {}", names.join(", "))]
    MissingInputs {
        /// The missing input names, sorted
        names: Vec<String>,
    },

    /// An operation's compute body failed
    ///
    /// Execution aborts at the first failure; no partial solution is
    /// returned.
    #[error("operation '{operation}' failed")]
    OperationFailed {
        /// The failing operation
        operation: String,
        /// The underlying failure
        #[source]
        source: BoxError,
    },

    /// An operation returned fewer outputs than it declared
    #[error("operation '{operation}' broke its contract, missing outputs: {}", missing.join(", "))]
    ContractViolation {
        /// The offending operation
        operation: String,
        /// Declared provides absent from the returned values
        missing: Vec<String>,
    },

    /// An operation body panicked while running on a worker
    #[error("operation '{operation}' panicked")]
    TaskPanic {
        /// The panicking operation
        operation: String,
    },

    /// The engine's own ordering invariant was violated
    ///
    /// Unreachable for plans produced by
    /// [`Network::compile`](crate::Network::compile); signals an engine bug,
    /// not a user error.
    #[error("internal consistency violation: {detail}")]
    InternalConsistency {
        /// What was violated
        detail: String,
    },
}

impl ExecutionError {
    /// Creates a missing inputs error; names are sorted for deterministic
    /// reporting.
    pub fn missing_inputs(mut names: Vec<String>) -> Self {
        names.sort();
        Self::MissingInputs { names }
    }

    /// Creates an operation failure error
    pub fn operation_failed(operation: impl Into<String>, source: BoxError) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            source,
        }
    }

    /// Creates a contract violation error
    pub fn contract_violation(operation: impl Into<String>, missing: Vec<String>) -> Self {
        Self::ContractViolation {
            operation: operation.into(),
            missing,
        }
    }

    /// Creates a task panic error
    pub fn task_panic(operation: impl Into<String>) -> Self {
        Self::TaskPanic {
            operation: operation.into(),
        }
    }

    /// Creates an internal consistency error
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::InternalConsistency {
            detail: detail.into(),
        }
    }
}

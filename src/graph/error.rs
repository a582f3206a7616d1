//! Error types for network composition
//!
//! This module hides error representation details and provides a unified
//! error type for building networks from operation sets.

use thiserror::Error;

/// Result type for composition operations
pub type ComposeResult<T> = Result<T, ComposeError>;

/// Errors that can occur while composing operations into a network
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum ComposeError {
    /// Two operations were registered under the same name
    #[error("duplicate operation name: {name}")]
    DuplicateOperation {
        /// The name shared by more than one operation
        name: String,
    },

    /// An operation declared no outputs
    #[error("operation '{operation}' provides no outputs")]
    EmptyProvides {
        /// The operation with an empty `provides` set
        operation: String,
    },

    /// A cycle was detected in the operation dependency graph
    #[error("cycle detected in operation graph: {}", cycle.join(" -> "))]
    CycleDetected {
        /// The operations forming the cycle, in traversal order
        cycle: Vec<String>,
    },
}

impl ComposeError {
    /// Creates a duplicate operation error
    pub fn duplicate_operation(name: impl Into<String>) -> Self {
        Self::DuplicateOperation { name: name.into() }
    }

    /// Creates an empty provides error
    pub fn empty_provides(operation: impl Into<String>) -> Self {
        Self::EmptyProvides {
            operation: operation.into(),
        }
    }

    /// Creates a cycle detected error from the ordered cycle path
    pub fn cycle(cycle: Vec<String>) -> Self {
        Self::CycleDetected { cycle }
    }
}

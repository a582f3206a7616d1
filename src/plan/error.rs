//! Error types for plan compilation

use thiserror::Error;

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors that can occur while compiling a network into a plan
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum CompileError {
    /// Requested outputs cannot be produced from the requested inputs
    #[error("unsatisfiable outputs: {}", outputs.join(", "))]
    UnsatisfiableOutputs {
        /// The requested output names with no producing path, sorted
        outputs: Vec<String>,
    },

    /// A cycle survived into compilation
    ///
    /// Networks built by [`compose`](crate::compose) are already acyclic,
    /// so this is a defensive re-check and should be unreachable.
    #[error("cycle detected in operation graph: {}", cycle.join(" -> "))]
    CycleDetected {
        /// The operations involved in the cycle
        cycle: Vec<String>,
    },
}

impl CompileError {
    /// Creates an unsatisfiable outputs error; names are sorted for
    /// deterministic reporting.
    pub fn unsatisfiable(mut outputs: Vec<String>) -> Self {
        outputs.sort();
        Self::UnsatisfiableOutputs { outputs }
    }

    /// Creates a cycle detected error
    pub fn cycle(cycle: Vec<String>) -> Self {
        Self::CycleDetected { cycle }
    }
}

//! Node-executor error types.

use thiserror::Error;

/// Errors raised while executing a single node through its interceptor chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// No executor is registered for this node type.
    #[error("no executor registered for node type {node_type}")]
    NoExecutor {
        /// The unregistered node type.
        node_type: String,
    },

    /// An input validator rejected the (possibly transformed) inputs.
    #[error("input validation failed for {node_type}: {message}")]
    InputValidation {
        /// The node type being executed.
        node_type: String,
        /// Why validation failed.
        message: String,
    },

    /// An output validator rejected the executor's raw outputs.
    #[error("output validation failed for {node_type}: {message}")]
    OutputValidation {
        /// The node type being executed.
        node_type: String,
        /// Why validation failed.
        message: String,
    },

    /// The executor, a transform, or a validator raised an error of its own.
    #[error("{node_type} raised an error: {message}")]
    UserCode {
        /// The node type being executed.
        node_type: String,
        /// The error message.
        message: String,
    },
}

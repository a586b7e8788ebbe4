//! Execution-context error types.

use nebula_core::NodeId;
use thiserror::Error;

/// Errors raised while driving or inspecting a single run's execution context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// An invalid status transition was attempted (e.g. resuming a run that
    /// isn't paused).
    #[error("invalid execution status transition: {from} -> {to}")]
    InvalidTransition {
        /// The status the execution was in.
        from: String,
        /// The status transition that was rejected.
        to: String,
    },

    /// An invalid per-node status transition was attempted.
    #[error("invalid node status transition for {node_id}: {from} -> {to}")]
    InvalidNodeTransition {
        /// The node whose status transition was rejected.
        node_id: NodeId,
        /// The status the node was in.
        from: String,
        /// The status transition that was rejected.
        to: String,
    },
}

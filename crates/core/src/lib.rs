//! # Nebula Flow Core
//!
//! Identifiers and small shared types used across the Nebula Flow
//! workspace. Every other crate in the workspace depends on this one;
//! it depends on nothing workspace-internal.

pub mod id;

pub use id::{ConnectionId, ExecutionId, NodeId, SubscriptionId, WorkflowId};

/// Direction of a port on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// An input port — receives data from an incoming connection.
    In,
    /// An output port — sends data along outgoing connections.
    Out,
}

/// Common prelude for Nebula Flow crates.
pub mod prelude {
    pub use crate::{ConnectionId, Direction, ExecutionId, NodeId, SubscriptionId, WorkflowId};
}

//! Workflow-model error types.

use nebula_core::{ConnectionId, NodeId};
use thiserror::Error;

/// Errors raised while building or validating a workflow's structure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// A node referenced by a connection does not exist in the workflow.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A port referenced by a connection does not exist on its node.
    #[error("port not found: node {node}, port {port}")]
    PortNotFound {
        /// The node the port was looked up on.
        node: NodeId,
        /// The port key that was not found.
        port: String,
    },

    /// A connection's source port is not an output port, or its target
    /// port is not an input port.
    #[error("connection {0} has the wrong port directions")]
    WrongDirection(ConnectionId),

    /// Source and target port data-type tags do not match exactly.
    #[error("connection {connection} type mismatch: {source_type} != {target_type}")]
    TypeMismatch {
        /// The offending connection.
        connection: ConnectionId,
        /// The source port's data-type tag.
        source_type: String,
        /// The target port's data-type tag.
        target_type: String,
    },

    /// A target input port already has an incoming connection.
    #[error("fan-in violation: node {node} port {port} already has an incoming connection")]
    FanInViolation {
        /// The target node.
        node: NodeId,
        /// The target port key.
        port: String,
    },

    /// The same 4-tuple (source node/port, target node/port) is connected twice.
    #[error("duplicate connection between node {source_node} port {source_port} and node {target_node} port {target_port}")]
    DuplicateConnection {
        /// Source node id.
        source_node: NodeId,
        /// Source port key.
        source_port: String,
        /// Target node id.
        target_node: NodeId,
        /// Target port key.
        target_port: String,
    },

    /// The workflow graph contains a cycle; the named node is on it.
    #[error("cycle detected at node {0}")]
    CycleDetected(NodeId),

    /// The workflow has no nodes.
    #[error("workflow has no nodes")]
    EmptyWorkflow,
}

//! The `Workflow` aggregate — a named graph of nodes and connections.

use std::collections::HashMap;

use nebula_core::{ConnectionId, NodeId, WorkflowId};
use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::node::{Node, NodeMap};

/// A directed graph of nodes and connections with named entry and exit nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier.
    pub id: WorkflowId,
    /// Human-readable name.
    pub name: String,
    /// Nodes keyed by id.
    pub nodes: NodeMap,
    /// Connections keyed by id.
    pub connections: HashMap<ConnectionId, Connection>,
    /// Ordered list of node ids that receive seed inputs at run start.
    #[serde(default)]
    pub entry_points: Vec<NodeId>,
    /// Ordered list of node ids whose outputs form the run's result.
    #[serde(default)]
    pub exit_points: Vec<NodeId>,
    /// Arbitrary workflow-level metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Workflow {
    /// Construct a new, empty workflow.
    #[must_use]
    pub fn new(id: WorkflowId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            nodes: HashMap::new(),
            connections: HashMap::new(),
            entry_points: Vec::new(),
            exit_points: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Add a node, registering it by id.
    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.insert(node.id, node);
        self
    }

    /// Add a connection, registering it by id.
    pub fn add_connection(&mut self, connection: Connection) -> &mut Self {
        self.connections.insert(connection.id, connection);
        self
    }

    /// Mark a node as an entry point.
    pub fn add_entry_point(&mut self, node_id: NodeId) -> &mut Self {
        self.entry_points.push(node_id);
        self
    }

    /// Mark a node as an exit point.
    pub fn add_exit_point(&mut self, node_id: NodeId) -> &mut Self {
        self.exit_points.push(node_id);
        self
    }

    /// All connections whose source is `node_id`, in insertion order is not
    /// guaranteed (backed by a `HashMap`); callers needing determinism should
    /// sort by `Connection::id`.
    #[must_use]
    pub fn outgoing_connections(&self, node_id: NodeId) -> Vec<&Connection> {
        self.connections
            .values()
            .filter(|c| c.source_node_id == node_id)
            .collect()
    }

    /// All connections whose target is `node_id`.
    #[must_use]
    pub fn incoming_connections(&self, node_id: NodeId) -> Vec<&Connection> {
        self.connections
            .values()
            .filter(|c| c.target_node_id == node_id)
            .collect()
    }
}

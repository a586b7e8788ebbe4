//! Connections — directed edges from an output port to an input port.

use nebula_core::{ConnectionId, NodeId};
use serde::{Deserialize, Serialize};

use crate::port::PortId;

/// A directed edge from an output port of one node to an input port of another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique identifier within the owning workflow.
    pub id: ConnectionId,
    /// The node the edge originates from.
    pub source_node_id: NodeId,
    /// The output port on the source node.
    pub source_port_id: PortId,
    /// The node the edge terminates at.
    pub target_node_id: NodeId,
    /// The input port on the target node.
    pub target_port_id: PortId,
}

impl Connection {
    /// Build a new connection with a fresh id.
    #[must_use]
    pub fn new(
        source_node_id: NodeId,
        source_port_id: impl Into<PortId>,
        target_node_id: NodeId,
        target_port_id: impl Into<PortId>,
    ) -> Self {
        Self {
            id: ConnectionId::v4(),
            source_node_id,
            source_port_id: source_port_id.into(),
            target_node_id,
            target_port_id: target_port_id.into(),
        }
    }

    /// The 4-tuple that identifies this edge regardless of its id, used to
    /// detect duplicate connections.
    #[must_use]
    pub fn endpoints(&self) -> (NodeId, &str, NodeId, &str) {
        (
            self.source_node_id,
            self.source_port_id.as_str(),
            self.target_node_id,
            self.target_port_id.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_connection_gets_distinct_ids() {
        let a = NodeId::v4();
        let b = NodeId::v4();
        let c1 = Connection::new(a, "out", b, "in");
        let c2 = Connection::new(a, "out", b, "in");
        assert_ne!(c1.id, c2.id);
    }

    #[test]
    fn endpoints_identify_the_edge() {
        let a = NodeId::v4();
        let b = NodeId::v4();
        let c = Connection::new(a, "out", b, "in");
        assert_eq!(c.endpoints(), (a, "out", b, "in"));
    }

    #[test]
    fn serde_roundtrip() {
        let c = Connection::new(NodeId::v4(), "out", NodeId::v4(), "in");
        let json = serde_json::to_string(&c).unwrap();
        let back: Connection = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}

//! Node definitions — typed units of computation wired into a workflow.

use std::collections::HashMap;

use nebula_core::NodeId;
use serde::{Deserialize, Serialize};

use crate::port::Port;

/// The lifecycle status of a node within a particular run.
///
/// This mirrors the status field carried on [`Node`] itself (spec §3);
/// the engine updates a node's status as it drives a run forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Not yet scheduled.
    #[default]
    Idle,
    /// Currently executing.
    Processing,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Execution was cancelled before or during this node.
    Cancelled,
    /// Waiting on something external (reserved for future node kinds).
    Waiting,
}

impl NodeStatus {
    /// Returns `true` if this status will never change again within a run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// A typed unit of computation with input and output ports, configuration,
/// and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within its owning workflow.
    pub id: NodeId,
    /// String key into the node-type / executor registry.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Human-readable name.
    pub name: String,
    /// Ordered input ports (direction = in).
    #[serde(default)]
    pub inputs: Vec<Port>,
    /// Ordered output ports (direction = out).
    #[serde(default)]
    pub outputs: Vec<Port>,
    /// Arbitrary per-node configuration.
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
    /// Arbitrary per-node metadata (not consumed by the engine).
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Current lifecycle status.
    #[serde(default)]
    pub status: NodeStatus,
}

impl Node {
    /// Construct a new idle node with no ports, config, or metadata.
    #[must_use]
    pub fn new(id: NodeId, node_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            node_type: node_type.into(),
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            config: HashMap::new(),
            metadata: HashMap::new(),
            status: NodeStatus::Idle,
        }
    }

    /// Append an input port.
    #[must_use]
    pub fn with_input(mut self, port: Port) -> Self {
        self.inputs.push(port);
        self
    }

    /// Append an output port.
    #[must_use]
    pub fn with_output(mut self, port: Port) -> Self {
        self.outputs.push(port);
        self
    }

    /// Set a config entry.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Find an input port by id.
    #[must_use]
    pub fn input_port(&self, port_id: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.id == port_id)
    }

    /// Find an output port by id.
    #[must_use]
    pub fn output_port(&self, port_id: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.id == port_id)
    }

    /// Returns `true` if any input port id repeats among this node's input
    /// ports, or any output port id repeats among its output ports (an id
    /// may be reused across directions). Checked by `Validator`'s
    /// `unique_port_ids` rule, not enforced at construction.
    #[must_use]
    pub fn has_duplicate_port_ids(&self) -> bool {
        has_duplicates(self.inputs.iter().map(|p| p.id.as_str()))
            || has_duplicates(self.outputs.iter().map(|p| p.id.as_str()))
    }
}

fn has_duplicates<'a>(ids: impl Iterator<Item = &'a str>) -> bool {
    let mut seen: Vec<&str> = Vec::new();
    for id in ids {
        if seen.contains(&id) {
            return true;
        }
        seen.push(id);
    }
    false
}

/// A node definition paired with its id, as stored in a workflow's node map.
pub type NodeMap = HashMap<NodeId, Node>;

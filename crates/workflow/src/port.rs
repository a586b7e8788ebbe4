//! Port definitions — typed, named connection points on a node.

use nebula_core::Direction;
use serde::{Deserialize, Serialize};

/// Type alias for a port's key, unique within its node and direction.
pub type PortId = String;

/// A typed, named attachment point for a connection on a node.
///
/// Port ids are unique within their node and direction; direction is
/// immutable once a port is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Unique key within the owning node and direction.
    pub id: PortId,
    /// Human-readable name.
    pub name: String,
    /// String tag identifying the data type this port carries.
    ///
    /// Connection compatibility requires exact string equality between
    /// a source and target port's `data_type` — no subtype relation or
    /// conversion is defined (spec §9, open question resolved as-is).
    pub data_type: String,
    /// Whether this is an input or output port.
    pub direction: Direction,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional default value substituted when no input is supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl Port {
    /// Build a new input port.
    #[must_use]
    pub fn input(id: impl Into<PortId>, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_type: data_type.into(),
            direction: Direction::In,
            description: None,
            default: None,
        }
    }

    /// Build a new output port.
    #[must_use]
    pub fn output(id: impl Into<PortId>, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_type: data_type.into(),
            direction: Direction::Out,
            description: None,
            default: None,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a default value.
    #[must_use]
    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Returns `true` if this is an input port.
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.direction == Direction::In
    }

    /// Returns `true` if this is an output port.
    #[must_use]
    pub fn is_output(&self) -> bool {
        self.direction == Direction::Out
    }
}

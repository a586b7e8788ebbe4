//! # Nebula Flow Workflow
//!
//! The node model: ports, nodes, connections, the `Workflow` aggregate,
//! dependency-graph analysis (topological order and parallel levels), and
//! structural validation.
//!
//! This crate models the graph itself — it does not execute anything.
//! Execution lives in `nebula-execution` and `nebula-engine`.

pub mod connection;
pub mod error;
pub mod graph;
pub mod node;
pub mod port;
pub mod validator;
pub mod workflow;

pub use connection::Connection;
pub use error::WorkflowError;
pub use graph::DependencyGraph;
pub use node::{Node, NodeMap, NodeStatus};
pub use port::{Port, PortId};
pub use validator::{NodeValidation, Rule, ValidationError, Validator, WorkflowValidation};
pub use workflow::Workflow;

//! Dependency-graph analysis: topological order and parallel levels.

use std::collections::HashMap;

use nebula_core::NodeId;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction as PgDirection;

use crate::error::WorkflowError;
use crate::workflow::Workflow;

/// A dependency graph derived from a workflow's nodes and connections,
/// used to compute execution order and parallel levels.
///
/// A node depends on the nodes whose outputs feed its inputs — edges run
/// source → target, matching data flow.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<NodeId, ()>,
    index_of: HashMap<NodeId, NodeIndex>,
}

impl DependencyGraph {
    /// Build a dependency graph from a workflow's nodes and connections.
    ///
    /// Every node in the workflow is added, including nodes with no
    /// connections at all — spec: "every node runs exactly once".
    pub fn from_workflow(workflow: &Workflow) -> Result<Self, WorkflowError> {
        if workflow.nodes.is_empty() {
            return Err(WorkflowError::EmptyWorkflow);
        }

        let mut graph = DiGraph::new();
        let mut index_of = HashMap::with_capacity(workflow.nodes.len());

        for &node_id in workflow.nodes.keys() {
            let idx = graph.add_node(node_id);
            index_of.insert(node_id, idx);
        }

        for connection in workflow.connections.values() {
            let source = *index_of
                .get(&connection.source_node_id)
                .ok_or(WorkflowError::NodeNotFound(connection.source_node_id))?;
            let target = *index_of
                .get(&connection.target_node_id)
                .ok_or(WorkflowError::NodeNotFound(connection.target_node_id))?;
            graph.add_edge(source, target, ());
        }

        Ok(Self { graph, index_of })
    }

    /// Total number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Nodes with no predecessors (roots of the dependency graph).
    #[must_use]
    pub fn entry_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, PgDirection::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx])
            .collect();
        nodes.sort_by_key(|id| id.get());
        nodes
    }

    /// Nodes with no successors (sinks of the dependency graph).
    #[must_use]
    pub fn exit_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, PgDirection::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx])
            .collect();
        nodes.sort_by_key(|id| id.get());
        nodes
    }

    /// Compute a topological order consistent with the dependency edges.
    ///
    /// Fails with [`WorkflowError::CycleDetected`] naming one node on the
    /// cycle if the graph is not acyclic.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, WorkflowError> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|idx| self.graph[idx]).collect())
            .map_err(|cycle| WorkflowError::CycleDetected(self.graph[cycle.node_id()]))
    }

    /// Partition the topological order into levels by longest-path depth.
    ///
    /// Level 0 contains nodes with no predecessors among workflow nodes; a
    /// node's level is `1 + max(level of predecessors)`. Nodes within a
    /// level carry no ordering relative to one another and may run
    /// concurrently.
    pub fn compute_levels(&self) -> Result<Vec<Vec<NodeId>>, WorkflowError> {
        let order = self.topological_order()?;
        let mut level_of: HashMap<NodeId, usize> = HashMap::with_capacity(order.len());

        for &node_id in &order {
            let idx = self.index_of[&node_id];
            let level = self
                .graph
                .neighbors_directed(idx, PgDirection::Incoming)
                .map(|pred_idx| level_of[&self.graph[pred_idx]] + 1)
                .max()
                .unwrap_or(0);
            level_of.insert(node_id, level);
        }

        let max_level = level_of.values().copied().max().unwrap_or(0);
        let mut levels: Vec<Vec<NodeId>> = vec![Vec::new(); max_level + 1];
        for &node_id in &order {
            levels[level_of[&node_id]].push(node_id);
        }
        for level in &mut levels {
            level.sort_by_key(|id| id.get());
        }

        Ok(levels)
    }
}

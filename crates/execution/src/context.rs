//! Per-run execution state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use nebula_action::ExecutionSnapshot;
use nebula_core::{NodeId, WorkflowId};
use nebula_workflow::{NodeStatus, PortId, Workflow};
use serde_json::Value;

use crate::journal::{ExecutionJournal, JournalLevel};
use crate::status::ExecutionStatus;

/// Per-node output values, keyed by output port id.
pub type PortValues = HashMap<PortId, Value>;

/// Per-run state: node outputs, variables, status, and timing.
///
/// Created fresh for each run and owned exclusively by it; the workflow,
/// nodes, and connections it runs over are value-like and are never
/// mutated through this type (spec §3, "Ownership summary").
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The workflow this context is executing.
    pub workflow_id: WorkflowId,
    /// Outputs recorded so far, per node, per output port.
    node_outputs: HashMap<NodeId, PortValues>,
    /// Seed inputs for entry nodes, kept separate from `node_outputs` so an
    /// entry node's initial inputs are never conflated with its own output
    /// slot (spec §9, "Initial inputs on entry nodes").
    initial_inputs: HashMap<NodeId, PortValues>,
    /// Per-node lifecycle status for this run. The source `Node` values are
    /// not mutated; this is the run's own view of each node's progress.
    node_status: HashMap<NodeId, NodeStatus>,
    /// User-supplied and engine-seeded variables, readable by executors.
    pub variables: HashMap<String, Value>,
    /// Current run-level status.
    pub status: ExecutionStatus,
    /// Wall-clock start time.
    pub start_time: DateTime<Utc>,
    /// Count of nodes that have completed execution (successfully or not).
    pub nodes_executed: usize,
    /// Audit trail for this run.
    pub journal: ExecutionJournal,
}

impl ExecutionContext {
    /// Build a fresh context for a run, seeding `variables` from the caller.
    #[must_use]
    pub fn new(workflow_id: WorkflowId, variables: HashMap<String, Value>) -> Self {
        Self {
            workflow_id,
            node_outputs: HashMap::new(),
            initial_inputs: HashMap::new(),
            node_status: HashMap::new(),
            variables,
            status: ExecutionStatus::Created,
            start_time: Utc::now(),
            nodes_executed: 0,
            journal: ExecutionJournal::new(),
        }
    }

    /// Seed an entry node's initial inputs (keyed by input port id).
    pub fn seed_initial_inputs(&mut self, node_id: NodeId, inputs: PortValues) {
        self.initial_inputs.insert(node_id, inputs);
    }

    /// Record a node's outputs.
    pub fn store_outputs(&mut self, node_id: NodeId, outputs: PortValues) {
        self.node_outputs.insert(node_id, outputs);
        self.nodes_executed += 1;
    }

    /// Read a previously recorded output value for `(node_id, port_id)`.
    #[must_use]
    pub fn output(&self, node_id: NodeId, port_id: &str) -> Option<&Value> {
        self.node_outputs.get(&node_id)?.get(port_id)
    }

    /// All outputs recorded for a node, if any were recorded.
    #[must_use]
    pub fn node_outputs(&self, node_id: NodeId) -> Option<&PortValues> {
        self.node_outputs.get(&node_id)
    }

    /// Current per-run status of a node; `Idle` if never touched.
    #[must_use]
    pub fn node_status(&self, node_id: NodeId) -> NodeStatus {
        self.node_status.get(&node_id).copied().unwrap_or_default()
    }

    /// Set a node's per-run status.
    pub fn set_node_status(&mut self, node_id: NodeId, status: NodeStatus) {
        self.node_status.insert(node_id, status);
    }

    /// Gather a node's inputs per spec §4.5 step 2: for every incoming
    /// connection, read the source's recorded output at the source port and
    /// store it under the target port id. If `node_id` is an entry point,
    /// its seeded initial inputs are merged in first and connection-sourced
    /// values take precedence on conflict. Any input port still missing a
    /// value after that falls back to its declared `Port::default`.
    #[must_use]
    pub fn gather_inputs(&self, workflow: &Workflow, node_id: NodeId) -> PortValues {
        let mut inputs = self.initial_inputs.get(&node_id).cloned().unwrap_or_default();

        for connection in workflow.incoming_connections(node_id) {
            if let Some(value) = self.output(connection.source_node_id, &connection.source_port_id) {
                inputs.insert(connection.target_port_id.clone(), value.clone());
            }
        }

        if let Some(node) = workflow.nodes.get(&node_id) {
            for port in &node.inputs {
                if !inputs.contains_key(&port.id) {
                    if let Some(default) = &port.default {
                        inputs.insert(port.id.clone(), default.clone());
                    }
                }
            }
        }

        inputs
    }

    /// A read-only, owned snapshot of this context suitable for passing into
    /// a node executor (which must not depend on this crate — see
    /// [`nebula_action::ExecutionSnapshot`]).
    #[must_use]
    pub fn snapshot(&self) -> ExecutionSnapshot {
        ExecutionSnapshot::new(self.workflow_id, self.variables.clone())
    }

    /// Record an informational journal entry.
    pub fn log_info(&mut self, node_id: Option<NodeId>, message: impl Into<String>) {
        self.journal.record(JournalLevel::Info, node_id, message);
    }

    /// Record a warning journal entry.
    pub fn log_warning(&mut self, node_id: Option<NodeId>, message: impl Into<String>) {
        self.journal.record(JournalLevel::Warning, node_id, message);
    }

    /// Record an error journal entry.
    pub fn log_error(&mut self, node_id: Option<NodeId>, message: impl Into<String>) {
        self.journal.record(JournalLevel::Error, node_id, message);
    }
}

#[cfg(test)]
mod tests {
    use nebula_workflow::{Connection, Node, Port};
    use serde_json::json;

    use super::*;

    fn linear_workflow() -> (Workflow, NodeId, NodeId) {
        let mut wf = Workflow::new(WorkflowId::v4(), "wf");
        let a = Node::new(NodeId::v4(), "const", "A").with_output(Port::output("v", "V", "number"));
        let b = Node::new(NodeId::v4(), "double", "B").with_input(Port::input("v", "V", "number"));
        let a_id = a.id;
        let b_id = b.id;
        wf.add_node(a);
        wf.add_node(b);
        wf.add_connection(Connection::new(a_id, "v", b_id, "v"));
        (wf, a_id, b_id)
    }

    #[test]
    fn gather_inputs_reads_from_source_output() {
        let (wf, a_id, b_id) = linear_workflow();
        let mut ctx = ExecutionContext::new(wf.id, HashMap::new());
        ctx.store_outputs(a_id, HashMap::from([("v".to_string(), json!(7))]));

        let inputs = ctx.gather_inputs(&wf, b_id);
        assert_eq!(inputs.get("v"), Some(&json!(7)));
    }

    #[test]
    fn entry_node_seed_survives_when_no_incoming_connections() {
        let (wf, a_id, _b_id) = linear_workflow();
        let mut ctx = ExecutionContext::new(wf.id, HashMap::new());
        ctx.seed_initial_inputs(a_id, HashMap::from([("seed".to_string(), json!(1))]));

        let inputs = ctx.gather_inputs(&wf, a_id);
        assert_eq!(inputs.get("seed"), Some(&json!(1)));
        // the seed must never leak into the node's own output slot
        assert!(ctx.node_outputs(a_id).is_none());
    }

    #[test]
    fn connection_sourced_values_take_precedence_over_seed_on_conflict() {
        let (wf, a_id, b_id) = linear_workflow();
        let mut ctx = ExecutionContext::new(wf.id, HashMap::new());
        ctx.seed_initial_inputs(b_id, HashMap::from([("v".to_string(), json!("stale"))]));
        ctx.store_outputs(a_id, HashMap::from([("v".to_string(), json!(7))]));

        let inputs = ctx.gather_inputs(&wf, b_id);
        assert_eq!(inputs.get("v"), Some(&json!(7)));
    }

    #[test]
    fn failed_node_leaves_no_output_entry() {
        let (wf, a_id, _b_id) = linear_workflow();
        let ctx = ExecutionContext::new(wf.id, HashMap::new());
        assert!(ctx.node_outputs(a_id).is_none());
        assert_eq!(ctx.output(a_id, "v"), None);
    }

    #[test]
    fn node_status_defaults_to_idle() {
        let (wf, a_id, _) = linear_workflow();
        let ctx = ExecutionContext::new(wf.id, HashMap::new());
        assert_eq!(ctx.node_status(a_id), NodeStatus::Idle);
    }

    #[test]
    fn missing_input_falls_back_to_port_default() {
        let mut wf = Workflow::new(WorkflowId::v4(), "wf");
        let node = Node::new(NodeId::v4(), "const", "N")
            .with_input(Port::input("v", "V", "number").with_default(json!(42)));
        let node_id = node.id;
        wf.add_node(node);

        let ctx = ExecutionContext::new(wf.id, HashMap::new());
        let inputs = ctx.gather_inputs(&wf, node_id);
        assert_eq!(inputs.get("v"), Some(&json!(42)));
    }

    #[test]
    fn supplied_value_takes_precedence_over_port_default() {
        let mut wf = Workflow::new(WorkflowId::v4(), "wf");
        let node = Node::new(NodeId::v4(), "const", "N")
            .with_input(Port::input("v", "V", "number").with_default(json!(42)));
        let node_id = node.id;
        wf.add_node(node);

        let mut ctx = ExecutionContext::new(wf.id, HashMap::new());
        ctx.seed_initial_inputs(node_id, HashMap::from([("v".to_string(), json!(7))]));
        let inputs = ctx.gather_inputs(&wf, node_id);
        assert_eq!(inputs.get("v"), Some(&json!(7)));
    }
}

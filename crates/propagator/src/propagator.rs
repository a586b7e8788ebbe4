//! Routes events along a workflow's graph edges.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use nebula_core::{NodeId, WorkflowId};
use nebula_eventbus::EventBus;
use nebula_workflow::Workflow;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::error::PropagatorError;

/// A predicate over `(eventType, payload)`; all registered filters must
/// pass (AND semantics) for propagation along an edge to continue.
pub type FilterFn = Arc<dyn Fn(&str, &Value) -> bool + Send + Sync>;

/// Rewrites a per-edge payload given the source and target node.
pub type TransformFn = Arc<dyn Fn(Value, NodeId, NodeId) -> Value + Send + Sync>;

/// Options controlling a single `propagate_event` call.
#[derive(Clone, Default)]
pub struct PropagateOptions {
    /// If `true`, recurse from each target node using the transformed payload.
    pub propagate_chain: bool,
    /// Per-edge payload rewrite, applied after the `sourceNodeId` merge.
    pub transform: Option<TransformFn>,
}

/// Routes an event from a source node along a workflow's outgoing
/// connections, applying filters and transforms, with cycle-safe traversal.
pub struct EventPropagator {
    bus: EventBus,
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
    filters: RwLock<Vec<Option<FilterFn>>>,
}

/// A handle to a registered filter, returned by `add_event_filter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterId(usize);

impl EventPropagator {
    /// Build a propagator that publishes addressed events on `bus`.
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            workflows: RwLock::new(HashMap::new()),
            filters: RwLock::new(Vec::new()),
        }
    }

    /// Register a workflow so events can be propagated across its edges.
    pub fn register_workflow(&self, workflow: Workflow) {
        self.workflows.write().insert(workflow.id, workflow);
    }

    /// Remove a workflow's registration.
    pub fn unregister_workflow(&self, workflow_id: WorkflowId) {
        self.workflows.write().remove(&workflow_id);
    }

    /// Whether a workflow is currently registered.
    #[must_use]
    pub fn has_workflow(&self, workflow_id: WorkflowId) -> bool {
        self.workflows.read().contains_key(&workflow_id)
    }

    /// Register an event filter; returns a handle for later removal.
    pub fn add_event_filter(&self, filter: FilterFn) -> FilterId {
        let mut filters = self.filters.write();
        filters.push(Some(filter));
        FilterId(filters.len() - 1)
    }

    /// Remove a previously registered filter. Idempotent.
    pub fn remove_event_filter(&self, id: FilterId) {
        if let Some(slot) = self.filters.write().get_mut(id.0) {
            *slot = None;
        }
    }

    /// Remove every registered filter.
    pub fn clear_event_filters(&self) {
        self.filters.write().clear();
    }

    /// Propagate `event_type`/`payload` from `source_node_id` along every
    /// outgoing connection of `workflow_id`, per spec §4.2.
    pub async fn propagate_event(
        &self,
        workflow_id: WorkflowId,
        source_node_id: NodeId,
        event_type: &str,
        payload: Value,
        options: PropagateOptions,
    ) -> Result<(), PropagatorError> {
        let workflow = self
            .workflows
            .read()
            .get(&workflow_id)
            .cloned()
            .ok_or(PropagatorError::UnknownWorkflow { workflow_id })?;

        let mut visited = HashSet::new();
        visited.insert(source_node_id);

        let mut queue = VecDeque::new();
        queue.push_back((source_node_id, payload));

        while let Some((current_id, current_payload)) = queue.pop_front() {
            for connection in workflow.outgoing_connections(current_id) {
                let target_node_id = connection.target_node_id;
                if visited.contains(&target_node_id) {
                    continue;
                }

                let mut edge_payload = merge_source_node_id(current_payload.clone(), current_id);
                if let Some(transform) = &options.transform {
                    edge_payload = transform(edge_payload, current_id, target_node_id);
                }

                if !self.passes_filters(event_type, &edge_payload) {
                    debug!(%event_type, %target_node_id, "propagation rejected by filter");
                    continue;
                }

                let addressed_event = format!("node:{target_node_id}:{event_type}");
                self.bus.publish(addressed_event, edge_payload.clone()).await;
                visited.insert(target_node_id);

                if options.propagate_chain {
                    queue.push_back((target_node_id, edge_payload));
                }
            }
        }

        Ok(())
    }

    fn passes_filters(&self, event_type: &str, payload: &Value) -> bool {
        self.filters
            .read()
            .iter()
            .flatten()
            .all(|filter| filter(event_type, payload))
    }
}

fn merge_source_node_id(payload: Value, source_node_id: NodeId) -> Value {
    match payload {
        Value::Object(mut map) => {
            map.insert("sourceNodeId".to_string(), Value::String(source_node_id.to_string()));
            Value::Object(map)
        }
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other);
            map.insert("sourceNodeId".to_string(), Value::String(source_node_id.to_string()));
            Value::Object(map)
        }
    }
}

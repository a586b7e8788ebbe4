//! A read-only view of run state passed to executors, transforms, and validators.

use std::collections::HashMap;

use nebula_core::WorkflowId;
use serde_json::Value;

/// An owned, point-in-time view of the run an executor is operating within.
///
/// This exists so `nebula-action` never needs to depend on `nebula-execution`
/// (which depends on `nebula-action` for the interceptor pipeline itself) —
/// the engine builds one of these from its `ExecutionContext` before each
/// node invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionSnapshot {
    /// The workflow this run belongs to.
    pub workflow_id: Option<WorkflowId>,
    /// The run's variables, as of the moment the snapshot was taken.
    pub variables: HashMap<String, Value>,
}

impl ExecutionSnapshot {
    /// Build a snapshot.
    #[must_use]
    pub fn new(workflow_id: WorkflowId, variables: HashMap<String, Value>) -> Self {
        Self {
            workflow_id: Some(workflow_id),
            variables,
        }
    }

    /// Look up a variable by name.
    #[must_use]
    pub fn variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }
}

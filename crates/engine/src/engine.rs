//! The workflow engine: validation, scheduling, and run control.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nebula_action::{ActionError, NodeRegistry, PortMap};
use nebula_core::{NodeId, WorkflowId};
use nebula_eventbus::EventBus;
use nebula_execution::{ExecutionContext, ExecutionStatus, JournalEntry, PortValues};
use nebula_workflow::{DependencyGraph, NodeStatus, Workflow};
use parking_lot::RwLock;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::EngineError;
use crate::handle::RunHandle;

/// Options accepted by [`Engine::execute_workflow`].
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Seed inputs applied to every entry node.
    pub inputs: PortMap,
    /// `None`/`Some(Duration::ZERO)` both mean "no timeout" (spec §8).
    pub timeout: Option<Duration>,
    /// Whether to schedule by level (`true`) or strictly in topological
    /// order (`false`, the default).
    pub parallel: bool,
    /// Variables seeded into the run's execution context.
    pub variables: HashMap<String, Value>,
}

/// Timing envelope attached to a settled run.
#[derive(Debug, Clone)]
pub struct ExecutionStats {
    /// When the run started.
    pub start_time: DateTime<Utc>,
    /// When the run settled.
    pub end_time: DateTime<Utc>,
    /// Wall-clock duration of the run, in milliseconds.
    pub execution_time_ms: i64,
    /// Count of nodes that completed execution.
    pub nodes_executed: usize,
}

/// The outcome of a settled (successful) run.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The workflow that ran.
    pub workflow_id: WorkflowId,
    /// Always [`ExecutionStatus::Completed`] — failures are returned as
    /// `Err(EngineError)` instead of a populated error field, the
    /// idiomatic Rust shape for spec.md's `{status, outputs, stats, error?}`.
    pub status: ExecutionStatus,
    /// Exit-node outputs, keyed by exit node id.
    pub outputs: HashMap<NodeId, PortValues>,
    /// Timing and node-count statistics.
    pub stats: ExecutionStats,
    /// The run's in-memory audit trail, in recording order.
    pub journal: Vec<JournalEntry>,
}

/// Validates a graph, derives execution order, and drives nodes to
/// completion under sequential or parallel scheduling.
pub struct Engine {
    bus: EventBus,
    registry: Arc<NodeRegistry>,
    runs: RwLock<HashMap<WorkflowId, RunHandle>>,
}

impl Engine {
    /// Build an engine that emits lifecycle events on `bus` and executes
    /// nodes through `registry`.
    #[must_use]
    pub fn new(bus: EventBus, registry: Arc<NodeRegistry>) -> Self {
        Self {
            bus,
            registry,
            runs: RwLock::new(HashMap::new()),
        }
    }

    /// The event bus this engine publishes lifecycle events on.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Run a workflow to completion (or failure), per spec §4.5.
    #[instrument(skip(self, workflow, options), fields(workflow_id = %workflow.id))]
    pub async fn execute_workflow(
        &self,
        workflow: &Workflow,
        options: ExecuteOptions,
    ) -> Result<ExecutionResult, EngineError> {
        let workflow_id = workflow.id;

        if workflow.nodes.is_empty() {
            let now = Utc::now();
            return Ok(ExecutionResult {
                workflow_id,
                status: ExecutionStatus::Completed,
                outputs: HashMap::new(),
                stats: ExecutionStats {
                    start_time: now,
                    end_time: now,
                    execution_time_ms: 0,
                    nodes_executed: 0,
                },
                journal: Vec::new(),
            });
        }

        let handle = RunHandle::new();
        self.runs.write().insert(workflow_id, handle.clone());

        let mut context = ExecutionContext::new(workflow_id, options.variables.clone());
        context.status = ExecutionStatus::Running;
        context.log_info(None, "workflow started");
        handle.set_status(ExecutionStatus::Running);

        self.bus
            .publish("workflow:started", json!({"workflowId": workflow_id}))
            .await;

        if let Some(timeout) = options.timeout.filter(|d| !d.is_zero()) {
            let timeout_handle = handle.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if !timeout_handle.is_cancelled() {
                    timeout_handle.mark_timed_out();
                    timeout_handle.cancel();
                }
            });
        }

        for &entry_id in &workflow.entry_points {
            context.seed_initial_inputs(entry_id, options.inputs.clone());
        }

        let graph = match DependencyGraph::from_workflow(workflow) {
            Ok(graph) => graph,
            Err(err) => {
                context.log_error(None, format!("workflow rejected: {err}"));
                return self.settle_failure(&handle, workflow_id, EngineError::from(err)).await;
            }
        };

        let outcome = if options.parallel {
            self.run_parallel(workflow, &graph, &handle, &mut context).await
        } else {
            self.run_sequential(workflow, &graph, &handle, &mut context).await
        };

        match outcome {
            Ok(()) => self.settle_success(workflow, &handle, workflow_id, context).await,
            Err(err) => {
                if matches!(err, EngineError::Cancelled) {
                    context.log_warning(None, "workflow cancelled");
                } else {
                    context.log_error(None, format!("workflow failed: {err}"));
                }
                self.settle_failure(&handle, workflow_id, err).await
            }
        }
    }

    async fn run_sequential(
        &self,
        workflow: &Workflow,
        graph: &DependencyGraph,
        handle: &RunHandle,
        context: &mut ExecutionContext,
    ) -> Result<(), EngineError> {
        let order = graph.topological_order()?;

        for node_id in order {
            if handle.is_cancelled() {
                break;
            }
            handle.wait_while_paused().await;
            if handle.is_cancelled() {
                break;
            }

            let node = workflow.nodes[&node_id].clone();
            let inputs = context.gather_inputs(workflow, node_id);
            context.set_node_status(node_id, NodeStatus::Processing);
            let snapshot = context.snapshot();
            let registry = Arc::clone(&self.registry);

            // Spec §5: an already-started node runs to completion; it is
            // never forcibly terminated. So a started node is spawned onto
            // its own task and, if cancellation arrives first, we stop
            // awaiting it here and move on to settling the run — the task
            // itself keeps running on the runtime rather than being dropped.
            let task = tokio::spawn(async move { registry.execute_node(&node, inputs, snapshot).await });

            let outcome = tokio::select! {
                result = task => Some(result),
                () = handle.cancellation_token().cancelled() => None,
            };

            match outcome {
                Some(Ok(Ok(outputs))) => {
                    context.store_outputs(node_id, outputs);
                    context.set_node_status(node_id, NodeStatus::Completed);
                }
                Some(Ok(Err(source))) => {
                    context.set_node_status(node_id, NodeStatus::Failed);
                    context.log_error(Some(node_id), format!("node failed: {source}"));
                    handle.cancel();
                    return Err(EngineError::NodeFailed { node_id, source });
                }
                Some(Err(join_err)) => {
                    context.set_node_status(node_id, NodeStatus::Failed);
                    let source = ActionError::UserCode {
                        node_type: workflow.nodes[&node_id].node_type.clone(),
                        message: join_err.to_string(),
                    };
                    context.log_error(Some(node_id), format!("node failed: {source}"));
                    handle.cancel();
                    return Err(EngineError::NodeFailed { node_id, source });
                }
                None => {
                    context.set_node_status(node_id, NodeStatus::Cancelled);
                    context.log_warning(Some(node_id), "run cancelled while node was in flight");
                    break;
                }
            }
        }

        if handle.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }

    async fn run_parallel(
        &self,
        workflow: &Workflow,
        graph: &DependencyGraph,
        handle: &RunHandle,
        context: &mut ExecutionContext,
    ) -> Result<(), EngineError> {
        let levels = graph.compute_levels()?;

        for level in levels {
            if handle.is_cancelled() {
                break;
            }
            handle.wait_while_paused().await;
            if handle.is_cancelled() {
                break;
            }

            let mut tasks = Vec::with_capacity(level.len());
            for node_id in level {
                let node = workflow.nodes[&node_id].clone();
                let inputs = context.gather_inputs(workflow, node_id);
                let snapshot = context.snapshot();
                let registry = Arc::clone(&self.registry);
                tasks.push((
                    node_id,
                    tokio::spawn(async move { registry.execute_node(&node, inputs, snapshot).await }),
                ));
            }

            let mut failure = None;
            for (node_id, task) in tasks {
                match task.await {
                    Ok(Ok(outputs)) => {
                        context.store_outputs(node_id, outputs);
                        context.set_node_status(node_id, NodeStatus::Completed);
                    }
                    Ok(Err(source)) => {
                        context.set_node_status(node_id, NodeStatus::Failed);
                        context.log_error(Some(node_id), format!("node failed: {source}"));
                        handle.cancel();
                        failure.get_or_insert(EngineError::NodeFailed { node_id, source });
                    }
                    Err(join_err) => {
                        context.set_node_status(node_id, NodeStatus::Failed);
                        let source = ActionError::UserCode {
                            node_type: workflow.nodes[&node_id].node_type.clone(),
                            message: join_err.to_string(),
                        };
                        context.log_error(Some(node_id), format!("node failed: {source}"));
                        handle.cancel();
                        failure.get_or_insert(EngineError::NodeFailed { node_id, source });
                    }
                }
            }

            if let Some(err) = failure {
                return Err(err);
            }
        }

        if handle.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }

    async fn settle_success(
        &self,
        workflow: &Workflow,
        handle: &RunHandle,
        workflow_id: WorkflowId,
        mut context: ExecutionContext,
    ) -> Result<ExecutionResult, EngineError> {
        let mut outputs = HashMap::new();
        for &exit_id in &workflow.exit_points {
            if let Some(values) = context.node_outputs(exit_id) {
                outputs.insert(exit_id, values.clone());
            }
        }

        context.log_info(None, "workflow completed");
        handle.set_status(ExecutionStatus::Completed);
        self.bus
            .publish("workflow:completed", json!({"workflowId": workflow_id}))
            .await;
        self.runs.write().remove(&workflow_id);

        let end_time = Utc::now();
        Ok(ExecutionResult {
            workflow_id,
            status: ExecutionStatus::Completed,
            outputs,
            stats: ExecutionStats {
                start_time: context.start_time,
                end_time,
                execution_time_ms: (end_time - context.start_time).num_milliseconds(),
                nodes_executed: context.nodes_executed,
            },
            journal: context.journal.entries().to_vec(),
        })
    }

    async fn settle_failure(
        &self,
        handle: &RunHandle,
        workflow_id: WorkflowId,
        err: EngineError,
    ) -> Result<ExecutionResult, EngineError> {
        let status = if handle.timed_out() {
            ExecutionStatus::TimedOut
        } else if matches!(err, EngineError::Cancelled) {
            ExecutionStatus::Cancelled
        } else {
            ExecutionStatus::Failed
        };
        handle.set_status(status);

        self.bus
            .publish("workflow:failed", json!({"workflowId": workflow_id, "error": err.to_string()}))
            .await;
        self.runs.write().remove(&workflow_id);

        let err = if handle.timed_out() { EngineError::TimedOut } else { err };
        Err(err)
    }

    /// Pause a running workflow. Requires the run to currently be `Running`.
    pub fn pause_workflow(&self, workflow_id: WorkflowId) -> Result<(), EngineError> {
        let runs = self.runs.read();
        let handle = runs.get(&workflow_id).ok_or(EngineError::UnknownRun { workflow_id })?;
        if handle.status() != ExecutionStatus::Running {
            return Err(EngineError::InvalidControl { workflow_id, operation: "pause" });
        }
        handle.pause();
        Ok(())
    }

    /// Resume a paused workflow. Requires the run to currently be `Paused`.
    pub fn resume_workflow(&self, workflow_id: WorkflowId) -> Result<(), EngineError> {
        let runs = self.runs.read();
        let handle = runs.get(&workflow_id).ok_or(EngineError::UnknownRun { workflow_id })?;
        if handle.status() != ExecutionStatus::Paused {
            return Err(EngineError::InvalidControl { workflow_id, operation: "resume" });
        }
        handle.resume();
        Ok(())
    }

    /// Request cancellation of a run. The in-flight `execute_workflow` call
    /// observes this and is the one that settles the run and emits
    /// `workflow:failed` — not this method — so the event fires exactly once.
    pub async fn stop_workflow(&self, workflow_id: WorkflowId) -> Result<(), EngineError> {
        let handle = {
            let runs = self.runs.read();
            runs.get(&workflow_id).cloned().ok_or(EngineError::UnknownRun { workflow_id })?
        };
        handle.cancel();
        Ok(())
    }

    /// Current status of a run, or `Completed` if no handle exists —
    /// absence is treated as past completion (spec §4.5).
    #[must_use]
    pub fn get_workflow_status(&self, workflow_id: WorkflowId) -> ExecutionStatus {
        self.runs
            .read()
            .get(&workflow_id)
            .map_or(ExecutionStatus::Completed, RunHandle::status)
    }
}

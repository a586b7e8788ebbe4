//! Engine-level error types.

use nebula_action::ActionError;
use nebula_core::{NodeId, WorkflowId};
use nebula_workflow::WorkflowError;
use thiserror::Error;

/// Errors that can cause a run's future to reject.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Structural error in the workflow graph (cycle, dangling reference, etc).
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A node failed during execution; the run aborts immediately.
    #[error("node {node_id} failed: {source}")]
    NodeFailed {
        /// The node that failed.
        node_id: NodeId,
        /// The underlying executor/validator/transform error.
        #[source]
        source: ActionError,
    },

    /// The run was cancelled via `stopWorkflow` (or a node failure cancelled it).
    #[error("run was cancelled")]
    Cancelled,

    /// The run exceeded its configured timeout.
    #[error("run timed out")]
    TimedOut,

    /// A control operation (`pauseWorkflow`/`resumeWorkflow`/`stopWorkflow`) named a
    /// workflow with no active run.
    #[error("no active run for workflow {workflow_id}")]
    UnknownRun {
        /// The workflow named by the control call.
        workflow_id: WorkflowId,
    },

    /// A control operation was attempted from a status that doesn't permit it
    /// (e.g. resuming a run that isn't paused).
    #[error("cannot {operation} workflow {workflow_id}: invalid current status")]
    InvalidControl {
        /// The workflow named by the control call.
        workflow_id: WorkflowId,
        /// The operation that was rejected (`pause`, `resume`, `stop`).
        operation: &'static str,
    },
}

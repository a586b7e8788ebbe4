//! Event-propagator error types.

use nebula_core::WorkflowId;
use thiserror::Error;

/// Errors raised by the event propagator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropagatorError {
    /// `propagateEvent` (or a registry lookup) named a workflow that was
    /// never registered.
    #[error("workflow {workflow_id} is not registered with the propagator")]
    UnknownWorkflow {
        /// The unregistered workflow.
        workflow_id: WorkflowId,
    },
}

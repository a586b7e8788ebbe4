//! State machine transition validation for execution and node statuses.

use nebula_core::NodeId;
use nebula_workflow::NodeStatus;

use crate::error::ExecutionError;
use crate::status::ExecutionStatus;

/// Returns `true` if the execution-level transition from `from` to `to` is valid.
#[must_use]
pub fn can_transition_execution(from: ExecutionStatus, to: ExecutionStatus) -> bool {
    matches!(
        (from, to),
        (ExecutionStatus::Created, ExecutionStatus::Running)
            | (ExecutionStatus::Running, ExecutionStatus::Paused)
            | (ExecutionStatus::Running, ExecutionStatus::Cancelling)
            | (ExecutionStatus::Running, ExecutionStatus::Completed)
            | (ExecutionStatus::Running, ExecutionStatus::Failed)
            | (ExecutionStatus::Running, ExecutionStatus::TimedOut)
            | (ExecutionStatus::Paused, ExecutionStatus::Running)
            | (ExecutionStatus::Paused, ExecutionStatus::Cancelling)
            | (ExecutionStatus::Cancelling, ExecutionStatus::Cancelled)
            | (ExecutionStatus::Cancelling, ExecutionStatus::Failed)
    )
}

/// Validate an execution-level transition, returning an error if invalid.
pub fn validate_execution_transition(
    from: ExecutionStatus,
    to: ExecutionStatus,
) -> Result<(), ExecutionError> {
    if can_transition_execution(from, to) {
        Ok(())
    } else {
        Err(ExecutionError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Returns `true` if the per-node transition from `from` to `to` is valid.
#[must_use]
pub fn can_transition_node(from: NodeStatus, to: NodeStatus) -> bool {
    matches!(
        (from, to),
        (NodeStatus::Idle, NodeStatus::Processing)
            | (NodeStatus::Idle, NodeStatus::Waiting)
            | (NodeStatus::Idle, NodeStatus::Cancelled)
            | (NodeStatus::Waiting, NodeStatus::Processing)
            | (NodeStatus::Waiting, NodeStatus::Cancelled)
            | (NodeStatus::Processing, NodeStatus::Completed)
            | (NodeStatus::Processing, NodeStatus::Failed)
            | (NodeStatus::Processing, NodeStatus::Cancelled)
    )
}

/// Validate a per-node transition, returning an error if invalid.
pub fn validate_node_transition(
    node_id: NodeId,
    from: NodeStatus,
    to: NodeStatus,
) -> Result<(), ExecutionError> {
    if can_transition_node(from, to) {
        Ok(())
    } else {
        Err(ExecutionError::InvalidNodeTransition {
            node_id,
            from: format!("{from:?}"),
            to: format!("{to:?}"),
        })
    }
}

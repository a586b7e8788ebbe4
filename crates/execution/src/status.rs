//! Run-level status.

use serde::{Deserialize, Serialize};

/// The lifecycle status of a single workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Run handle allocated, context built, but scheduling hasn't started.
    Created,
    /// Actively scheduling and executing nodes.
    Running,
    /// Paused; the scheduler will not start further nodes or levels until resumed.
    Paused,
    /// A cancellation has been requested; already-started nodes are draining.
    Cancelling,
    /// Every node ran to completion.
    Completed,
    /// A node failed and the run could not continue.
    Failed,
    /// The run was cancelled via `stopWorkflow`.
    Cancelled,
    /// The run exceeded its configured timeout.
    TimedOut,
}

impl ExecutionStatus {
    /// Returns `true` if this status will never change again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::TimedOut
        )
    }

    /// Returns `true` if the scheduler is actively driving nodes forward.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Cancelling)
    }

    /// Returns `true` if the run settled successfully.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns `true` if the run settled unsuccessfully.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut | Self::Cancelled)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Cancelling => write!(f, "cancelling"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

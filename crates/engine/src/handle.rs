//! Per-run control handle, owned by the engine's run table.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nebula_execution::ExecutionStatus;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

struct Inner {
    status: RwLock<ExecutionStatus>,
    cancellation_token: CancellationToken,
    pause_notify: tokio::sync::Notify,
    timed_out: AtomicBool,
}

/// Per-run bookkeeping: status, cancellation, and the pause gate.
///
/// Cheap to clone; every clone shares the same underlying state. The
/// engine keeps one of these per in-flight run, keyed by workflow id.
#[derive(Clone)]
pub struct RunHandle {
    inner: Arc<Inner>,
}

impl RunHandle {
    /// Build a new handle in the `Created` status.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                status: RwLock::new(ExecutionStatus::Created),
                cancellation_token: CancellationToken::new(),
                pause_notify: tokio::sync::Notify::new(),
                timed_out: AtomicBool::new(false),
            }),
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ExecutionStatus {
        *self.inner.status.read()
    }

    /// Overwrite the status unconditionally.
    pub fn set_status(&self, status: ExecutionStatus) {
        *self.inner.status.write() = status;
    }

    /// The run's cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.inner.cancellation_token
    }

    /// Whether cancellation has been requested (by `stopWorkflow`, a node
    /// failure, or a timeout).
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancellation_token.is_cancelled()
    }

    /// Request cancellation and wake a scheduler that might be blocked
    /// waiting for a resume that will never come.
    pub fn cancel(&self) {
        self.inner.cancellation_token.cancel();
        self.inner.pause_notify.notify_waiters();
    }

    /// Mark the run as having exceeded its timeout, distinguishing a timeout
    /// cancellation from a user-requested one at settlement time.
    pub fn mark_timed_out(&self) {
        self.inner.timed_out.store(true, Ordering::Release);
    }

    /// Whether the run was cancelled because of a timeout.
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.inner.timed_out.load(Ordering::Acquire)
    }

    /// Pause the run: the scheduler will not start further nodes or levels
    /// until [`Self::resume`] is called.
    pub fn pause(&self) {
        self.set_status(ExecutionStatus::Paused);
    }

    /// Resume a paused run and wake any scheduler awaiting it.
    pub fn resume(&self) {
        self.set_status(ExecutionStatus::Running);
        self.inner.pause_notify.notify_waiters();
    }

    /// Block until the run is no longer paused (or is cancelled). A no-op if
    /// the run isn't currently paused.
    pub async fn wait_while_paused(&self) {
        loop {
            if self.status() != ExecutionStatus::Paused || self.is_cancelled() {
                return;
            }
            let notified = self.inner.pause_notify.notified();
            if self.status() != ExecutionStatus::Paused || self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for RunHandle {
    fn default() -> Self {
        Self::new()
    }
}

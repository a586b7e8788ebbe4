//! # Nebula Flow Execution
//!
//! Per-run execution state: the [`context::ExecutionContext`] that owns
//! node outputs, variables, and timing for a single run; run- and
//! node-level status enums; transition validation; and an in-memory
//! journal. Nothing here persists across process restarts.

pub mod context;
pub mod error;
pub mod journal;
pub mod status;
pub mod transition;

pub use context::{ExecutionContext, PortValues};
pub use error::ExecutionError;
pub use journal::{ExecutionJournal, JournalEntry, JournalLevel};
pub use status::ExecutionStatus;
pub use transition::{can_transition_execution, can_transition_node};

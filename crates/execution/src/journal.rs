//! In-memory audit trail for a single run.
//!
//! Entries live only for the lifetime of the run's [`crate::context::ExecutionContext`]
//! — there is no persistence layer, replay, or cross-run journal here.

use chrono::{DateTime, Utc};
use nebula_core::NodeId;
use serde::{Deserialize, Serialize};

/// Severity of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalLevel {
    /// Informational lifecycle note.
    Info,
    /// Recoverable or advisory condition.
    Warning,
    /// A node or the run failed.
    Error,
}

/// A single recorded event in a run's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: JournalLevel,
    /// The node this entry concerns, if any.
    pub node_id: Option<NodeId>,
    /// Human-readable message.
    pub message: String,
}

/// An append-only, in-memory log of everything that happened during a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionJournal {
    entries: Vec<JournalEntry>,
}

impl ExecutionJournal {
    /// An empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry.
    pub fn record(&mut self, level: JournalLevel, node_id: Option<NodeId>, message: impl Into<String>) {
        self.entries.push(JournalEntry {
            timestamp: Utc::now(),
            level,
            node_id,
            message: message.into(),
        });
    }

    /// All recorded entries, in recording order.
    #[must_use]
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Activity history.
//!
//! Append-only audit trail shown in the history panel. Entries are kept
//! most-recent-first and are never edited; the whole log can be cleared.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Created,
    Moved,
    Deleted,
    Timer,
    Cleared,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Moved => "moved",
            Self::Deleted => "deleted",
            Self::Timer => "timer",
            Self::Cleared => "cleared",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub action: HistoryAction,
    pub description: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap entries that are already in most-recent-first order.
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    /// Prepend a new entry and return it.
    pub fn record(
        &mut self,
        action: HistoryAction,
        description: impl Into<String>,
        metadata: Option<serde_json::Value>,
        timestamp: DateTime<Utc>,
    ) -> &HistoryEntry {
        let entry = HistoryEntry {
            id: Ulid::new().to_string().to_lowercase(),
            action,
            description: description.into(),
            metadata,
            timestamp,
        };
        tracing::debug!(action = %entry.action, id = %entry.id, "history recorded");
        self.entries.insert(0, entry);
        &self.entries[0]
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }
}

//! Change notification for board observers.
//!
//! The board calls every subscribed [`BoardObserver`] after a mutation has
//! been applied. [`EventSink`] is the stock observer: it writes each change
//! as a JSON line to stdout or a file.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::history::HistoryEntry;
use crate::model::Task;
use crate::transition::StatusChange;

pub const EVENT_SCHEMA_VERSION: &str = "kanban.event.v1";

/// Something that changed on the board.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardChange {
    TaskCreated { task: Task },
    TaskEdited { task: Task },
    TaskDeleted { task: Task },
    TasksCleared { removed: usize },
    TimerStarted { task_id: String, started_at: i64 },
    TimerPaused { task_id: String, elapsed_ms: u64 },
    StatusChanged(StatusChange),
    /// Store order rewritten by a drop. `realigned` lists tasks whose status
    /// was corrected to match their column.
    Reordered { realigned: Vec<String> },
    HistoryRecorded { entry: HistoryEntry },
    HistoryCleared { removed: usize },
    Imported { tasks: usize, history: usize },
}

impl BoardChange {
    pub fn kind(&self) -> EventKind {
        match self {
            BoardChange::TaskCreated { .. } => EventKind::TaskCreated,
            BoardChange::TaskEdited { .. } => EventKind::TaskEdited,
            BoardChange::TaskDeleted { .. } => EventKind::TaskDeleted,
            BoardChange::TasksCleared { .. } => EventKind::TasksCleared,
            BoardChange::TimerStarted { .. } => EventKind::TimerStarted,
            BoardChange::TimerPaused { .. } => EventKind::TimerPaused,
            BoardChange::StatusChanged(_) => EventKind::StatusChanged,
            BoardChange::Reordered { .. } => EventKind::TasksReordered,
            BoardChange::HistoryRecorded { .. } => EventKind::HistoryRecorded,
            BoardChange::HistoryCleared { .. } => EventKind::HistoryCleared,
            BoardChange::Imported { .. } => EventKind::BoardImported,
        }
    }

    /// Event payload.
    pub fn data(&self) -> Result<serde_json::Value> {
        let value = match self {
            BoardChange::TaskCreated { task }
            | BoardChange::TaskEdited { task }
            | BoardChange::TaskDeleted { task } => serde_json::to_value(task)?,
            BoardChange::TasksCleared { removed } | BoardChange::HistoryCleared { removed } => {
                serde_json::json!({ "removed": removed })
            }
            BoardChange::TimerStarted {
                task_id,
                started_at,
            } => serde_json::json!({ "task_id": task_id, "started_at": started_at }),
            BoardChange::TimerPaused {
                task_id,
                elapsed_ms,
            } => serde_json::json!({ "task_id": task_id, "elapsed_ms": elapsed_ms }),
            BoardChange::StatusChanged(change) => serde_json::to_value(change)?,
            BoardChange::Reordered { realigned } => serde_json::json!({ "realigned": realigned }),
            BoardChange::HistoryRecorded { entry } => serde_json::to_value(entry)?,
            BoardChange::Imported { tasks, history } => {
                serde_json::json!({ "tasks": tasks, "history": history })
            }
        };
        Ok(value)
    }
}

/// Receives board changes after they are applied. `at` is the board
/// clock's time of the mutation.
pub trait BoardObserver {
    fn on_change(&mut self, change: &BoardChange, at: DateTime<Utc>);
}

impl<F: FnMut(&BoardChange, DateTime<Utc>)> BoardObserver for F {
    fn on_change(&mut self, change: &BoardChange, at: DateTime<Utc>) {
        self(change, at)
    }
}

#[derive(Debug, Clone)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed == "-" {
                return Some(EventDestination::Stdout);
            }
            Some(EventDestination::File(PathBuf::from(trimmed)))
        })
    }

    pub fn open(&self) -> Result<EventSink> {
        match self {
            EventDestination::Stdout => Ok(EventSink::stdout()),
            EventDestination::File(path) => EventSink::file(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskCreated,
    TaskEdited,
    TaskDeleted,
    TasksCleared,
    TimerStarted,
    TimerPaused,
    StatusChanged,
    TasksReordered,
    HistoryRecorded,
    HistoryCleared,
    BoardImported,
}

/// One JSONL record.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub schema_version: &'static str,
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Event {
    pub fn from_change(change: &BoardChange, timestamp: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            schema_version: EVENT_SCHEMA_VERSION,
            event: change.kind(),
            timestamp,
            data: Some(change.data()?),
        })
    }
}

/// Event sink that writes JSONL output to a destination.
pub struct EventSink {
    writer: Box<dyn Write + Send>,
}

impl EventSink {
    pub fn stdout() -> Self {
        Self::from_writer(std::io::stdout())
    }

    /// Append events to a file, creating it if necessary.
    pub fn file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::from_writer(file))
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Write a single event as JSONL.
    pub fn emit(&mut self, event: &Event) -> Result<()> {
        let serialized = serde_json::to_vec(event)?;
        self.writer.write_all(&serialized)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }
}

impl BoardObserver for EventSink {
    fn on_change(&mut self, change: &BoardChange, at: DateTime<Utc>) {
        let result = Event::from_change(change, at).and_then(|event| self.emit(&event));
        if let Err(err) = result {
            tracing::warn!(event = ?change.kind(), "failed to emit event: {err}");
        }
    }
}

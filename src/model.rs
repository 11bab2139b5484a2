//! Board domain types.
//!
//! Field names serialize in camelCase so snapshots stay compatible with the
//! `kanban-tasks` blobs written by earlier versions of the board.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Column a task lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Todo,
    Progress,
    OnHold,
    Done,
}

impl Status {
    /// Columns in on-screen order, left to right.
    pub const ALL: [Status; 4] = [Status::Todo, Status::Progress, Status::OnHold, Status::Done];

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" | "to-do" => Ok(Self::Todo),
            "progress" | "in-progress" | "in_progress" => Ok(Self::Progress),
            "on-hold" | "on_hold" | "hold" => Ok(Self::OnHold),
            "done" => Ok(Self::Done),
            other => Err(Error::InvalidArgument(format!(
                "invalid status '{other}': must be todo, progress, on-hold, or done"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Progress => "progress",
            Self::OnHold => "on-hold",
            Self::Done => "done",
        }
    }

    /// Column heading.
    pub fn label(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::Progress => "In Progress",
            Self::OnHold => "On Hold",
            Self::Done => "Done",
        }
    }

    /// Entering one of these columns stops a running timer.
    pub fn stops_timer(self) -> bool {
        matches!(self, Self::Todo | Self::Done)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(Error::InvalidArgument(format!(
                "invalid priority '{other}': must be low, medium, or high"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timer session. `end == None` marks the session that is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLog {
    /// Epoch milliseconds.
    pub start: i64,
    /// Epoch milliseconds, `None` while the session is open.
    pub end: Option<i64>,
}

impl TimeLog {
    pub fn open(start: i64) -> Self {
        Self { start, end: None }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Duration of a closed session.
    pub fn duration_ms(&self) -> Option<u64> {
        self.end
            .map(|end| u64::try_from(end.saturating_sub(self.start)).unwrap_or(0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub content: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    /// Closed-session time only, in milliseconds.
    pub total_time: u64,
    pub is_tracking: bool,
    /// Epoch milliseconds of the open session's start.
    pub last_start_time: Option<i64>,
    pub time_logs: Vec<TimeLog>,
}

impl Task {
    /// Build a fresh `todo` task from a validated draft.
    pub fn new(id: String, draft: TaskDraft, created_at: DateTime<Utc>) -> Result<Self> {
        let content = validate_content(&draft.content)?;
        Ok(Self {
            id,
            content,
            status: Status::Todo,
            created_at,
            priority: draft.priority,
            due_date: draft.due_date,
            tags: normalize_tags(&draft.tags),
            total_time: 0,
            is_tracking: false,
            last_start_time: None,
            time_logs: Vec::new(),
        })
    }

    /// Replace the user-editable fields. Status, timer state and logs are untouched.
    pub fn apply_draft(&mut self, draft: TaskDraft) -> Result<()> {
        self.content = validate_content(&draft.content)?;
        self.priority = draft.priority;
        self.due_date = draft.due_date;
        self.tags = normalize_tags(&draft.tags);
        Ok(())
    }

    pub fn open_log(&self) -> Option<&TimeLog> {
        self.time_logs.last().filter(|log| log.is_open())
    }

    /// Checks the tracking flag against the time log.
    pub fn timer_consistent(&self) -> bool {
        let open_count = self.time_logs.iter().filter(|log| log.is_open()).count();
        if self.is_tracking {
            open_count == 1
                && self
                    .open_log()
                    .map(|log| Some(log.start) == self.last_start_time)
                    .unwrap_or(false)
        } else {
            open_count == 0 && self.last_start_time.is_none()
        }
    }
}

/// User-editable task fields, as submitted by the task form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub content: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

impl TaskDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            content: task.content.clone(),
            priority: task.priority,
            due_date: task.due_date,
            tags: task.tags.clone(),
        }
    }
}

/// Trimmed task text; blank text is rejected.
pub fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("task content cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Trim, lowercase and de-duplicate tags, keeping first-seen order.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if tag.is_empty() || normalized.contains(&tag) {
            continue;
        }
        normalized.push(tag);
    }
    normalized
}

/// Split comma-separated tag input into normalized tags.
pub fn parse_tags(input: &str) -> Vec<String> {
    let parts: Vec<&str> = input.split(',').collect();
    normalize_tags(&parts)
}

/// Parse a due date. Accepts `YYYY-MM-DD` or a timestamp whose first ten
/// characters are a date. Empty input means no due date.
pub fn parse_due_date(input: &str) -> Result<Option<NaiveDate>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| Error::InvalidArgument(format!("invalid due date '{trimmed}' (expected YYYY-MM-DD)")))
}

//! Persistence for board snapshots.
//!
//! Tasks and history are stored as two JSON blobs under separate keys in a
//! key-value store. Loading is lenient: records written by older versions
//! are migrated on read, and a blob that no longer parses degrades to an
//! empty collection instead of failing the session.
//!
//! # On-disk layout ([`FileStore`])
//!
//! ```text
//! <data dir>/
//!   kanban.toml                 # Optional configuration
//!   kanban-tasks.json           # Ordered task records
//!   kanban-tasks.json.lock      # Guards reads/writes of the task blob
//!   kanban-history.json         # History entries, most recent first
//!   kanban-history.json.lock
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::history::{HistoryEntry, HistoryLog};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};
use crate::model::{
    normalize_tags, parse_due_date, validate_content, Priority, Status, Task, TimeLog,
};
use crate::state::BoardState;
use crate::store::TaskStore;

/// Durable string blobs addressed by key.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        lock::read_locked(self.path_for(key), self.lock_timeout_ms)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock::write_atomic_locked(self.path_for(key), value.as_bytes(), self.lock_timeout_ms)
    }
}

/// In-process store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.borrow_mut().insert(key.into(), value.into());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.insert(key, value);
        Ok(())
    }
}

/// Reads and writes board snapshots through a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct Gateway<S> {
    store: S,
    tasks_key: String,
    history_key: String,
}

impl<S: KeyValueStore> Gateway<S> {
    pub fn new(store: S, config: &StorageConfig) -> Self {
        Self {
            store,
            tasks_key: config.tasks_key.clone(),
            history_key: config.history_key.clone(),
        }
    }

    /// Load both namespaces. Never fails: unreadable blobs load as empty.
    pub fn load(&self, now: DateTime<Utc>) -> BoardState {
        BoardState::new(
            TaskStore::from_tasks(self.load_tasks(now)),
            HistoryLog::from_entries(self.load_history()),
        )
    }

    pub fn load_tasks(&self, now: DateTime<Utc>) -> Vec<Task> {
        let raw = match self.store.get(&self.tasks_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(key = %self.tasks_key, "failed to read tasks snapshot: {err}");
                return Vec::new();
            }
        };
        match parse_tasks(&self.tasks_key, &raw, now) {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::warn!("{err}; starting with an empty board");
                Vec::new()
            }
        }
    }

    pub fn load_history(&self) -> Vec<HistoryEntry> {
        let raw = match self.store.get(&self.history_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(key = %self.history_key, "failed to read history snapshot: {err}");
                return Vec::new();
            }
        };
        match parse_history(&self.history_key, &raw) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("{err}; starting with empty history");
                Vec::new()
            }
        }
    }

    pub fn save_tasks(&self, tasks: &TaskStore) -> Result<()> {
        let json = serde_json::to_string(tasks.as_slice())?;
        self.store.set(&self.tasks_key, &json)
    }

    pub fn save_history(&self, history: &HistoryLog) -> Result<()> {
        let json = serde_json::to_string(history.entries())?;
        self.store.set(&self.history_key, &json)
    }

    pub fn save(&self, state: &BoardState) -> Result<()> {
        self.save_tasks(&state.tasks)?;
        self.save_history(&state.history)
    }
}

/// Task record as it may appear in older snapshots: every field past the
/// identity is optional and backfilled on read.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTask {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub total_time: Option<f64>,
    #[serde(default)]
    pub is_tracking: Option<bool>,
    #[serde(default)]
    pub last_start_time: Option<i64>,
    #[serde(default)]
    pub time_logs: Option<Vec<TimeLog>>,
}

impl StoredTask {
    /// Fill defaults and repair timer bookkeeping. A record without an id
    /// or with blank content cannot become a task.
    pub fn migrate(self, now: DateTime<Utc>) -> Result<Task> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation("task id cannot be empty".to_string()));
        }
        let content = validate_content(&self.content)
            .map_err(|_| Error::Validation(format!("task '{}' has empty content", self.id)))?;
        let status = match self.status.as_deref().map(Status::parse) {
            Some(Ok(status)) => status,
            Some(Err(_)) => {
                tracing::warn!(task = %self.id, status = ?self.status, "unknown status, moving task to todo");
                Status::Todo
            }
            None => Status::Todo,
        };
        let priority = self
            .priority
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .and_then(|value| Priority::parse(value).ok())
            .unwrap_or_default();
        let due_date = self.due_date.as_deref().and_then(|raw| lenient_due_date(&self.id, raw));
        let total_time = self
            .total_time
            .filter(|ms| ms.is_finite() && *ms > 0.0)
            .map(|ms| ms.round() as u64)
            .unwrap_or(0);

        let mut task = Task {
            id: self.id,
            content,
            status,
            created_at: self.created_at.unwrap_or(now),
            priority,
            due_date,
            tags: normalize_tags(&self.tags.unwrap_or_default()),
            total_time,
            is_tracking: self.is_tracking.unwrap_or(false),
            last_start_time: self.last_start_time,
            time_logs: self.time_logs.unwrap_or_default(),
        };
        if repair_timer_state(&mut task) {
            tracing::warn!(task = %task.id, "repaired inconsistent timer state");
        }
        Ok(task)
    }
}

fn lenient_due_date(task_id: &str, raw: &str) -> Option<NaiveDate> {
    match parse_due_date(raw) {
        Ok(date) => date,
        Err(_) => {
            tracing::warn!(task = task_id, raw, "dropping unparseable due date");
            None
        }
    }
}

/// Make `is_tracking`, `last_start_time` and the open log entry agree.
/// Returns true when anything changed.
pub fn repair_timer_state(task: &mut Task) -> bool {
    let before = (task.is_tracking, task.last_start_time, task.time_logs.clone());

    if task.is_tracking && task.last_start_time.is_none() {
        task.is_tracking = false;
    }
    if !task.is_tracking {
        task.last_start_time = None;
    }

    let last_index = task.time_logs.len().checked_sub(1);
    for (index, log) in task.time_logs.iter_mut().enumerate() {
        let keep_open = task.is_tracking && Some(index) == last_index;
        if log.is_open() && !keep_open {
            log.end = Some(log.start);
        }
    }

    if let Some(start) = task.last_start_time {
        let has_matching_open = task
            .time_logs
            .last()
            .map(|log| log.is_open() && log.start == start)
            .unwrap_or(false);
        if !has_matching_open {
            if let Some(log) = task.time_logs.last_mut().filter(|log| log.is_open()) {
                log.end = Some(log.start);
            }
            task.time_logs.push(TimeLog::open(start));
        }
    }

    before != (task.is_tracking, task.last_start_time, task.time_logs.clone())
}

pub fn parse_tasks(key: &str, raw: &str, now: DateTime<Utc>) -> Result<Vec<Task>> {
    let stored: Vec<StoredTask> =
        serde_json::from_str(raw).map_err(|e| Error::Deserialization {
            key: key.to_string(),
            message: e.to_string(),
        })?;

    let mut seen = HashSet::with_capacity(stored.len());
    let mut tasks = Vec::with_capacity(stored.len());
    for record in stored {
        match record.migrate(now) {
            Ok(task) if seen.insert(task.id.clone()) => tasks.push(task),
            Ok(task) => tracing::warn!(key, task = %task.id, "dropping duplicate task record"),
            Err(err) => tracing::warn!(key, "dropping task record: {err}"),
        }
    }
    Ok(tasks)
}

pub fn parse_history(key: &str, raw: &str) -> Result<Vec<HistoryEntry>> {
    serde_json::from_str(raw).map_err(|e| Error::Deserialization {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    tasks: &'a [Task],
    history: &'a [HistoryEntry],
    export_date: DateTime<Utc>,
    version: &'a str,
}

/// Serialize the whole board as a backup document.
pub fn export_document(state: &BoardState, now: DateTime<Utc>, version: &str) -> Result<String> {
    let document = ExportDocument {
        tasks: state.tasks.as_slice(),
        history: state.history.entries(),
        export_date: now,
        version,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Parse a backup document into a replacement board state.
pub fn parse_import(raw: &str, now: DateTime<Utc>) -> Result<BoardState> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| Error::ImportFormat(format!("not valid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::ImportFormat("expected a JSON object".to_string()))?;

    let tasks = object
        .get("tasks")
        .filter(|tasks| tasks.is_array())
        .ok_or_else(|| Error::ImportFormat("'tasks' must be an array".to_string()))?;
    let history = object
        .get("history")
        .filter(|history| history.is_array())
        .ok_or_else(|| Error::ImportFormat("'history' must be an array".to_string()))?;

    let tasks: Vec<StoredTask> = serde_json::from_value(tasks.clone())
        .map_err(|e| Error::ImportFormat(format!("invalid task record: {e}")))?;
    let history: Vec<HistoryEntry> = serde_json::from_value(history.clone())
        .map_err(|e| Error::ImportFormat(format!("invalid history entry: {e}")))?;

    let mut seen = HashSet::with_capacity(tasks.len());
    let mut migrated = Vec::with_capacity(tasks.len());
    for record in tasks {
        let task = record
            .migrate(now)
            .map_err(|e| Error::ImportFormat(format!("invalid task record: {e}")))?;
        if !seen.insert(task.id.clone()) {
            return Err(Error::ImportFormat(format!("duplicate task id '{}'", task.id)));
        }
        migrated.push(task);
    }

    Ok(BoardState::new(
        TaskStore::from_tasks(migrated),
        HistoryLog::from_entries(history),
    ))
}

/// Default backup file name, e.g. `kanban-backup-2024-05-17.json`.
pub fn export_file_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}-{}.json", now.format("%Y-%m-%d"))
}

//! Board session facade.
//!
//! A [`Board`] owns the [`BoardState`] for one session and is the only thing
//! that mutates it. Every successful mutation is written through the
//! persistence [`Gateway`] and then announced to subscribed observers.
//! A failed write does not undo the mutation: the in-memory state stays
//! authoritative and the failure is parked until [`Board::take_persist_error`].

use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::clock::{Clock, SystemClock};
use crate::config::BoardConfig;
use crate::error::{Error, Result};
use crate::events::{BoardChange, BoardObserver};
use crate::history::{HistoryAction, HistoryEntry};
use crate::model::{Status, Task, TaskDraft};
use crate::reconcile::{self, BoardLayout, DropOutcome, DropRequest};
use crate::state::BoardState;
use crate::storage::{self, Gateway, KeyValueStore};
use crate::timer::{self, Session, TimerOutcome};

/// Which snapshot namespaces an operation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Touched {
    Tasks,
    History,
    Both,
}

pub struct Board<S: KeyValueStore, C: Clock = SystemClock> {
    state: BoardState,
    gateway: Gateway<S>,
    clock: C,
    config: BoardConfig,
    observers: Vec<Box<dyn BoardObserver>>,
    persist_error: Option<Error>,
}

impl<S: KeyValueStore, C: Clock> Board<S, C> {
    /// Load the board from `store`. Unreadable snapshots load as empty.
    pub fn open(store: S, clock: C, config: BoardConfig) -> Self {
        let gateway = Gateway::new(store, &config.storage);
        let state = gateway.load(clock.now());
        tracing::debug!(
            tasks = state.tasks.len(),
            history = state.history.len(),
            "board loaded"
        );
        Self {
            state,
            gateway,
            clock,
            config,
            observers: Vec::new(),
            persist_error: None,
        }
    }

    /// Re-read both snapshots, dropping in-memory state. Used by long-running
    /// readers to pick up writes made by other sessions.
    pub fn reload(&mut self) {
        self.state = self.gateway.load(self.clock.now());
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// All tasks in board order.
    pub fn tasks(&self) -> &[Task] {
        self.state.tasks.as_slice()
    }

    pub fn task(&self, id: &str) -> Result<&Task> {
        self.state.tasks.require(id)
    }

    /// History entries, most recent first.
    pub fn history(&self) -> &[HistoryEntry] {
        self.state.history.entries()
    }

    /// Resolve a full id or unique prefix to a task id.
    pub fn resolve_task_id(&self, input: &str) -> Result<String> {
        self.state.tasks.resolve_id(input)
    }

    /// Current on-screen arrangement of the columns.
    pub fn layout(&self) -> BoardLayout {
        BoardLayout::from_store(&self.state.tasks)
    }

    pub fn effective_total(&self, id: &str) -> Result<u64> {
        let task = self.state.tasks.require(id)?;
        Ok(timer::effective_total(task, self.clock.now_millis()))
    }

    /// Live elapsed time of every tracking task.
    pub fn tracking_totals(&self) -> Vec<(String, u64)> {
        timer::tracking_totals(&self.state.tasks, self.clock.now_millis())
    }

    pub fn sessions(&self, id: &str) -> Result<Vec<Session>> {
        Ok(timer::sessions(self.state.tasks.require(id)?))
    }

    pub fn subscribe(&mut self, observer: impl BoardObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Most recent persistence failure since the last call, if any.
    pub fn take_persist_error(&mut self) -> Option<Error> {
        self.persist_error.take()
    }

    /// Draft seeded with configured defaults.
    pub fn draft(&self, content: impl Into<String>) -> TaskDraft {
        TaskDraft::new(content).with_priority(self.config.defaults.priority)
    }

    /// Append a new `todo` task.
    pub fn create_task(&mut self, draft: TaskDraft) -> Result<Task> {
        let now = self.clock.now();
        let id = Ulid::new().to_string().to_lowercase();
        let task = Task::new(id, draft, now)?;
        self.state.tasks.push(task.clone());
        self.state.history.record(
            HistoryAction::Created,
            format!("Created \"{}\"", task.content),
            None,
            now,
        );
        tracing::debug!(task = %task.id, "task created");

        self.commit(Touched::Both, vec![BoardChange::TaskCreated { task: task.clone() }]);
        Ok(task)
    }

    /// Replace content, priority, due date and tags.
    pub fn edit_task(&mut self, id: &str, draft: TaskDraft) -> Result<Task> {
        let task = self.state.tasks.require_mut(id)?;
        task.apply_draft(draft)?;
        let task = task.clone();
        tracing::debug!(task = %task.id, "task edited");

        self.commit(Touched::Tasks, vec![BoardChange::TaskEdited { task: task.clone() }]);
        Ok(task)
    }

    pub fn delete_task(&mut self, id: &str) -> Result<Task> {
        let task = self.state.tasks.remove(id)?;
        self.state.history.record(
            HistoryAction::Deleted,
            format!("Deleted \"{}\"", task.content),
            Some(serde_json::json!({ "task": task.content })),
            self.clock.now(),
        );
        tracing::debug!(task = %task.id, "task deleted");

        self.commit(Touched::Both, vec![BoardChange::TaskDeleted { task: task.clone() }]);
        Ok(task)
    }

    /// Remove every task. Returns how many were removed.
    pub fn clear_all_tasks(&mut self) -> usize {
        let removed = self.state.tasks.clear().len();
        self.state.history.record(
            HistoryAction::Cleared,
            "Cleared all tasks",
            None,
            self.clock.now(),
        );
        tracing::debug!(removed, "tasks cleared");

        self.commit(Touched::Both, vec![BoardChange::TasksCleared { removed }]);
        removed
    }

    pub fn start_timer(&mut self, id: &str) -> Result<TimerOutcome> {
        let outcome = timer::start(&mut self.state.tasks, id, self.clock.now_millis())?;
        if let TimerOutcome::Started { at } = outcome {
            self.commit(
                Touched::Tasks,
                vec![BoardChange::TimerStarted {
                    task_id: id.to_string(),
                    started_at: at,
                }],
            );
        }
        Ok(outcome)
    }

    pub fn pause_timer(&mut self, id: &str) -> Result<TimerOutcome> {
        let outcome = timer::pause(&mut self.state.tasks, id, self.clock.now_millis())?;
        if let TimerOutcome::Paused { elapsed_ms, .. } = outcome {
            self.commit(
                Touched::Tasks,
                vec![BoardChange::TimerPaused {
                    task_id: id.to_string(),
                    elapsed_ms,
                }],
            );
        }
        Ok(outcome)
    }

    /// Apply a drop: status transition plus order reconciliation.
    pub fn change_status(&mut self, request: &DropRequest) -> Result<DropOutcome> {
        let outcome = reconcile::apply_drop(&mut self.state, request, self.clock.now())?;

        let mut changes: Vec<BoardChange> = outcome
            .status_change
            .iter()
            .chain(&outcome.realigned)
            .cloned()
            .map(BoardChange::StatusChanged)
            .collect();
        if outcome.order_changed || !outcome.realigned.is_empty() {
            changes.push(BoardChange::Reordered {
                realigned: outcome.realigned_ids(),
            });
        }
        // A drop always persists, even when nothing moved.
        let touched = if outcome.status_change.is_some() || !outcome.realigned.is_empty() {
            Touched::Both
        } else {
            Touched::Tasks
        };
        self.commit(touched, changes);
        Ok(outcome)
    }

    /// Drag-equivalent move: place the card in `to` before `position`
    /// (or at the end) and reconcile.
    pub fn move_task(
        &mut self,
        id: &str,
        to: Status,
        position: Option<usize>,
    ) -> Result<DropOutcome> {
        let task = self.state.tasks.require(id)?;
        crate::transition::ensure_allowed(task, to)?;

        let mut layout = self.layout();
        layout.place(id, to, position)?;
        self.change_status(&DropRequest {
            task_id: id.to_string(),
            target: to,
            layout,
        })
    }

    /// Record an arbitrary history entry.
    pub fn record_history(
        &mut self,
        action: HistoryAction,
        description: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) -> HistoryEntry {
        let entry = self
            .state
            .history
            .record(action, description, metadata, self.clock.now())
            .clone();
        self.commit(
            Touched::History,
            vec![BoardChange::HistoryRecorded {
                entry: entry.clone(),
            }],
        );
        entry
    }

    pub fn clear_history(&mut self) -> usize {
        let removed = self.state.history.clear();
        tracing::debug!(removed, "history cleared");
        self.commit(Touched::History, vec![BoardChange::HistoryCleared { removed }]);
        removed
    }

    /// Backup document for the whole board.
    pub fn export_snapshot(&self) -> Result<String> {
        storage::export_document(&self.state, self.clock.now(), &self.config.export.version)
    }

    /// Default file name for [`Board::export_snapshot`] output.
    pub fn export_file_name(&self) -> String {
        storage::export_file_name(&self.config.export.file_prefix, self.clock.now())
    }

    /// Replace the whole board with a backup document. A malformed document
    /// leaves the board untouched.
    pub fn import_snapshot(&mut self, raw: &str) -> Result<&BoardState> {
        let imported = storage::parse_import(raw, self.clock.now())?;
        let change = BoardChange::Imported {
            tasks: imported.tasks.len(),
            history: imported.history.len(),
        };
        self.state = imported;
        tracing::debug!(
            tasks = self.state.tasks.len(),
            history = self.state.history.len(),
            "board imported"
        );

        self.commit(Touched::Both, vec![change]);
        Ok(&self.state)
    }

    fn commit(&mut self, touched: Touched, changes: Vec<BoardChange>) {
        let result = match touched {
            Touched::Tasks => self.gateway.save_tasks(&self.state.tasks),
            Touched::History => self.gateway.save_history(&self.state.history),
            Touched::Both => self.gateway.save(&self.state),
        };
        if let Err(err) = result {
            tracing::warn!("failed to persist board: {err}");
            self.persist_error = Some(err);
        }

        let at = self.clock.now();
        for change in changes {
            for observer in &mut self.observers {
                observer.on_change(&change, at);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, key: &str, _value: &str) -> Result<()> {
            Err(Error::LockFailed(key.into()))
        }
    }

    fn board(clock: &ManualClock) -> Board<MemoryStore, &ManualClock> {
        Board::open(MemoryStore::new(), clock, BoardConfig::default())
    }

    #[test]
    fn create_appends_todo_and_records_history() {
        let clock = ManualClock::new();
        let mut board = board(&clock);
        let task = board.create_task(TaskDraft::new("Write spec")).unwrap();

        assert_eq!(task.status, Status::Todo);
        assert_eq!(board.tasks().len(), 1);
        assert_eq!(board.history()[0].action, HistoryAction::Created);
        assert_eq!(board.history()[0].description, "Created \"Write spec\"");
        assert_eq!(task.id, task.id.to_lowercase());
    }

    #[test]
    fn blank_content_is_rejected_before_mutation() {
        let clock = ManualClock::new();
        let mut board = board(&clock);
        assert!(matches!(
            board.create_task(TaskDraft::new("  ")),
            Err(Error::Validation(_))
        ));
        assert!(board.tasks().is_empty());
        assert!(board.history().is_empty());
    }

    #[test]
    fn mutations_write_through_to_the_store() {
        let clock = ManualClock::new();
        let store = MemoryStore::new();
        let mut board = Board::open(store.clone(), &clock, BoardConfig::default());
        let task = board.create_task(TaskDraft::new("persisted")).unwrap();

        let reopened = Board::open(store, &clock, BoardConfig::default());
        assert_eq!(reopened.tasks(), board.tasks());
        assert_eq!(reopened.history(), board.history());
        assert_eq!(reopened.task(&task.id).unwrap().content, "persisted");
    }

    #[test]
    fn observers_see_each_change_in_order() {
        let clock = ManualClock::new();
        let mut board = board(&clock);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        board.subscribe(move |change: &BoardChange, _at: DateTime<Utc>| {
            sink.borrow_mut().push(change.kind())
        });

        let task = board.create_task(TaskDraft::new("a")).unwrap();
        board.move_task(&task.id, Status::Progress, None).unwrap();
        board.start_timer(&task.id).unwrap();
        board.start_timer(&task.id).unwrap();

        use crate::events::EventKind::*;
        assert_eq!(
            *seen.borrow(),
            vec![TaskCreated, StatusChanged, TimerStarted]
        );
    }

    #[test]
    fn failed_write_keeps_state_and_parks_error() {
        let clock = ManualClock::new();
        let mut board = Board::open(FailingStore, &clock, BoardConfig::default());
        let task = board.create_task(TaskDraft::new("kept")).unwrap();

        assert_eq!(board.task(&task.id).unwrap().content, "kept");
        assert!(matches!(
            board.take_persist_error(),
            Some(Error::LockFailed(_))
        ));
        assert!(board.take_persist_error().is_none());
    }

    #[test]
    fn edit_replaces_fields_without_history() {
        let clock = ManualClock::new();
        let mut board = board(&clock);
        let task = board.create_task(TaskDraft::new("draft")).unwrap();
        let edited = board
            .edit_task(
                &task.id,
                TaskDraft::new("final").with_tags(["Docs", " docs "]),
            )
            .unwrap();
        assert_eq!(edited.content, "final");
        assert_eq!(edited.tags, vec!["docs"]);
        assert_eq!(board.history().len(), 1);
    }

    #[test]
    fn delete_and_clear_record_history() {
        let clock = ManualClock::new();
        let mut board = board(&clock);
        let a = board.create_task(TaskDraft::new("a")).unwrap();
        board.create_task(TaskDraft::new("b")).unwrap();

        board.delete_task(&a.id).unwrap();
        assert_eq!(board.history()[0].description, "Deleted \"a\"");
        assert_eq!(board.history()[0].metadata.as_ref().unwrap()["task"], "a");
        assert!(matches!(board.delete_task(&a.id), Err(Error::NotFound(_))));

        assert_eq!(board.clear_all_tasks(), 1);
        assert!(board.tasks().is_empty());
        assert_eq!(board.history()[0].action, HistoryAction::Cleared);
        assert_eq!(board.clear_history(), 4);
        assert!(board.history().is_empty());
    }

    #[test]
    fn record_history_prepends_and_persists() {
        let clock = ManualClock::new();
        let store = MemoryStore::new();
        let mut board = Board::open(store.clone(), &clock, BoardConfig::default());
        board.create_task(TaskDraft::new("a")).unwrap();

        clock.advance_millis(1000);
        let entry = board.record_history(
            HistoryAction::Timer,
            "Imported timer note",
            Some(serde_json::json!({ "source": "manual" })),
        );
        assert_eq!(board.history()[0], entry);
        assert_eq!(entry.timestamp, clock.now());

        let reopened = Board::open(store, &clock, BoardConfig::default());
        assert_eq!(reopened.history().len(), 2);
        assert_eq!(reopened.history()[0].id, entry.id);
    }

    #[test]
    fn recorded_history_notifies_observers_with_board_time() {
        let clock = ManualClock::new();
        let mut board = board(&clock);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        board.subscribe(move |change: &BoardChange, at: DateTime<Utc>| {
            sink.borrow_mut().push((change.clone(), at))
        });

        clock.advance_millis(2500);
        let entry = board.record_history(HistoryAction::Timer, "note", None);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, BoardChange::HistoryRecorded { entry });
        assert_eq!(seen[0].1, clock.now());
    }

    #[test]
    fn realigned_tasks_are_announced_as_status_changes() {
        let clock = ManualClock::new();
        let mut board = board(&clock);
        let a = board.create_task(TaskDraft::new("a")).unwrap().id;
        let b = board.create_task(TaskDraft::new("b")).unwrap().id;
        board.move_task(&a, Status::Progress, None).unwrap();
        board.move_task(&b, Status::Progress, None).unwrap();
        board.start_timer(&b).unwrap();
        clock.advance_millis(4000);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        board.subscribe(move |change: &BoardChange, _at: DateTime<Utc>| {
            sink.borrow_mut().push(change.kind())
        });

        let mut layout = board.layout();
        layout.place(&b, Status::Done, None).unwrap();
        let outcome = board
            .change_status(&DropRequest {
                task_id: a.clone(),
                target: Status::Progress,
                layout,
            })
            .unwrap();

        assert_eq!(outcome.realigned_ids(), vec![b.clone()]);
        assert_eq!(board.task(&b).unwrap().total_time, 4000);
        assert_eq!(board.history()[0].action, HistoryAction::Moved);
        assert_eq!(board.history()[1].action, HistoryAction::Timer);

        use crate::events::EventKind::*;
        assert_eq!(*seen.borrow(), vec![StatusChanged, TasksReordered]);
    }

    #[test]
    fn reload_picks_up_writes_from_another_session() {
        let clock = ManualClock::new();
        let store = MemoryStore::new();
        let mut watcher = Board::open(store.clone(), &clock, BoardConfig::default());
        let mut writer = Board::open(store, &clock, BoardConfig::default());

        let id = writer.create_task(TaskDraft::new("shared")).unwrap().id;
        writer.move_task(&id, Status::Progress, None).unwrap();
        writer.start_timer(&id).unwrap();
        assert!(watcher.tracking_totals().is_empty());

        watcher.reload();
        clock.advance_millis(1500);
        assert_eq!(watcher.tracking_totals(), vec![(id.clone(), 1500)]);

        writer.pause_timer(&id).unwrap();
        watcher.reload();
        assert!(watcher.tracking_totals().is_empty());
    }

    #[test]
    fn draft_uses_configured_priority() {
        let clock = ManualClock::new();
        let mut config = BoardConfig::default();
        config.defaults.priority = crate::model::Priority::High;
        let board = Board::open(MemoryStore::new(), &clock, config);
        assert_eq!(board.draft("x").priority, crate::model::Priority::High);
    }

    #[test]
    fn rejected_import_leaves_board_untouched() {
        let clock = ManualClock::new();
        let mut board = board(&clock);
        board.create_task(TaskDraft::new("keep me")).unwrap();
        let before = board.state().clone();

        assert!(matches!(
            board.import_snapshot(r#"{"tasks": []}"#),
            Err(Error::ImportFormat(_))
        ));
        assert_eq!(board.state(), &before);
    }
}

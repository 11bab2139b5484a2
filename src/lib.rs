//! kanban - task board core
//!
//! Tasks live in four columns (todo, progress, on-hold, done), carry a
//! start/pause timer, and are reordered by drag-and-drop. Every visible
//! change is recorded in a most-recent-first history log.
//!
//! # Core Concepts
//!
//! - **Task Store**: the ordered task collection; order is on-screen order
//! - **Timer Engine**: one open session per task, `total_time` holds closed time
//! - **Transitions**: a task that left `todo` never returns; entering `done`
//!   stops its timer
//! - **Reconciliation**: a drop supplies the full column layout, which is
//!   validated before the store is reordered to match it
//! - **Persistence**: tasks and history as two JSON snapshots, migrated on load
//!
//! # Module Organization
//!
//! - `board`: session facade with write-through persistence and observers
//! - `state`: `BoardState`, the owned task store plus history
//! - `model`: task, status, priority and time-log types
//! - `store`: ordered task collection and id resolution
//! - `timer`: start/pause protocol and elapsed-time queries
//! - `transition`: status policy and auto-stop
//! - `reconcile`: drop handling and insertion points
//! - `history`: history entries
//! - `storage`: key-value stores, snapshot migration, export/import
//! - `lock`: file locking and atomic writes for the file store
//! - `events`: change observers and the JSONL event sink
//! - `config`: `kanban.toml` loading
//! - `clock`: injectable wall clock
//! - `output`: CLI envelopes and duration formatting
//! - `cli`: command-line interface using clap
//! - `error`: error types and result aliases
//!
//! # Example
//!
//! ```
//! use kanban::{Board, BoardConfig, ManualClock, MemoryStore, Status, TaskDraft};
//!
//! let clock = ManualClock::new();
//! let mut board = Board::open(MemoryStore::new(), &clock, BoardConfig::default());
//! let task = board.create_task(TaskDraft::new("Write spec")).unwrap();
//!
//! board.move_task(&task.id, Status::Progress, None).unwrap();
//! board.start_timer(&task.id).unwrap();
//! clock.advance_millis(5000);
//! board.pause_timer(&task.id).unwrap();
//!
//! assert_eq!(board.task(&task.id).unwrap().total_time, 5000);
//! ```

pub mod board;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod lock;
pub mod model;
pub mod output;
pub mod reconcile;
pub mod state;
pub mod storage;
pub mod store;
pub mod timer;
pub mod transition;

pub use board::Board;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::BoardConfig;
pub use error::{Error, Result};
pub use events::{BoardChange, BoardObserver, EventSink};
pub use history::{HistoryAction, HistoryEntry};
pub use model::{Priority, Status, Task, TaskDraft, TimeLog};
pub use reconcile::{BoardLayout, DropOutcome, DropRequest};
pub use state::BoardState;
pub use storage::{FileStore, KeyValueStore, MemoryStore};

//! Owned board state: the task collection plus its history.

use crate::history::HistoryLog;
use crate::store::TaskStore;

/// Everything one board session mutates. Operations take it explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    pub tasks: TaskStore,
    pub history: HistoryLog,
}

impl BoardState {
    pub fn new(tasks: TaskStore, history: HistoryLog) -> Self {
        Self { tasks, history }
    }
}

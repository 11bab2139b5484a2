//! Drag-and-drop reconciliation.
//!
//! A drop hands us the dragged task, the column it landed in, and the final
//! visual arrangement of every column. The arrangement is checked against
//! the store before anything changes: it must name every task exactly once.
//! Only then is the status transition applied and the store reordered to
//! match the columns left to right, top to bottom.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::Status;
use crate::state::BoardState;
use crate::store::TaskStore;
use crate::transition::{self, StatusChange};

/// Ordered task ids per column, as currently arranged on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardLayout {
    pub todo: Vec<String>,
    pub progress: Vec<String>,
    #[serde(rename = "on-hold")]
    pub on_hold: Vec<String>,
    pub done: Vec<String>,
}

impl BoardLayout {
    /// Layout matching the store as it is rendered now.
    pub fn from_store(store: &TaskStore) -> Self {
        let mut layout = Self::default();
        for task in store.iter() {
            layout.column_mut(task.status).push(task.id.clone());
        }
        layout
    }

    pub fn column(&self, status: Status) -> &[String] {
        match status {
            Status::Todo => &self.todo,
            Status::Progress => &self.progress,
            Status::OnHold => &self.on_hold,
            Status::Done => &self.done,
        }
    }

    pub fn column_mut(&mut self, status: Status) -> &mut Vec<String> {
        match status {
            Status::Todo => &mut self.todo,
            Status::Progress => &mut self.progress,
            Status::OnHold => &mut self.on_hold,
            Status::Done => &mut self.done,
        }
    }

    /// Columns in display order.
    pub fn columns(&self) -> impl Iterator<Item = (Status, &[String])> {
        Status::ALL.into_iter().map(move |status| (status, self.column(status)))
    }

    pub fn len(&self) -> usize {
        self.columns().map(|(_, ids)| ids.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_of(&self, task_id: &str) -> Option<Status> {
        self.columns()
            .find(|(_, ids)| ids.iter().any(|id| id == task_id))
            .map(|(status, _)| status)
    }

    /// Move a card to `to`, inserting before `position` or at the end.
    pub fn place(&mut self, task_id: &str, to: Status, position: Option<usize>) -> Result<()> {
        let from = self
            .column_of(task_id)
            .ok_or_else(|| Error::NotFound(task_id.to_string()))?;
        self.column_mut(from).retain(|id| id != task_id);
        let column = self.column_mut(to);
        let index = position.map_or(column.len(), |pos| pos.min(column.len()));
        column.insert(index, task_id.to_string());
        Ok(())
    }
}

/// Vertical extent of a card that is not being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardBounds {
    pub top: f64,
    pub height: f64,
}

impl CardBounds {
    pub fn midpoint(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Index of the sibling the dragged card goes in front of, or `None` to
/// append. Picks the card whose midpoint is below the pointer and closest
/// to it.
pub fn insertion_index(siblings: &[CardBounds], pointer_y: f64) -> Option<usize> {
    let mut closest: Option<(usize, f64)> = None;
    for (index, card) in siblings.iter().enumerate() {
        let offset = pointer_y - card.midpoint();
        if offset < 0.0 && closest.map_or(true, |(_, best)| offset > best) {
            closest = Some((index, offset));
        }
    }
    closest.map(|(index, _)| index)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropRequest {
    pub task_id: String,
    pub target: Status,
    pub layout: BoardLayout,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DropOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_change: Option<StatusChange>,
    pub order_changed: bool,
    /// Other tasks whose stored status disagreed with their column. Each
    /// correction is a full status change with its own history entries.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub realigned: Vec<StatusChange>,
}

impl DropOutcome {
    pub fn realigned_ids(&self) -> Vec<String> {
        self.realigned.iter().map(|change| change.task_id.clone()).collect()
    }
}

/// Apply a drop to the board. On error nothing has been mutated and the
/// caller should restore its visual state.
pub fn apply_drop(
    state: &mut BoardState,
    request: &DropRequest,
    now: DateTime<Utc>,
) -> Result<DropOutcome> {
    let dragged = state.tasks.require(&request.task_id)?;
    transition::ensure_allowed(dragged, request.target)?;
    validate_layout(&state.tasks, request)?;

    let status_change =
        transition::change_status(state, &request.task_id, request.target, now)?;
    let realigned = realign_statuses(state, &request.layout, now)?;

    let before: Vec<String> = state.tasks.iter().map(|task| task.id.clone()).collect();
    rebuild_order(&mut state.tasks, &request.layout);
    let order_changed = state
        .tasks
        .iter()
        .map(|task| task.id.as_str())
        .ne(before.iter().map(String::as_str));

    tracing::debug!(
        task = %request.task_id,
        target = %request.target,
        order_changed,
        "drop reconciled"
    );

    Ok(DropOutcome {
        status_change,
        order_changed,
        realigned,
    })
}

fn validate_layout(store: &TaskStore, request: &DropRequest) -> Result<()> {
    let known = store.ids();
    let mut seen: HashSet<&str> = HashSet::with_capacity(known.len());

    for (_, ids) in request.layout.columns() {
        for id in ids {
            if !known.contains(id.as_str()) {
                return Err(Error::LayoutMismatch(format!("unknown task '{id}'")));
            }
            if !seen.insert(id.as_str()) {
                return Err(Error::LayoutMismatch(format!(
                    "task '{id}' appears more than once"
                )));
            }
        }
    }

    let mut missing: Vec<&str> = known.difference(&seen).copied().collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(Error::LayoutMismatch(format!(
            "missing tasks: {}",
            missing.join(", ")
        )));
    }

    if request.layout.column_of(&request.task_id) != Some(request.target) {
        return Err(Error::LayoutMismatch(format!(
            "task '{}' is not in the {} column",
            request.task_id, request.target
        )));
    }

    // Other cards may only sit in a column their status could legally reach.
    for task in store.iter().filter(|task| task.id != request.task_id) {
        if let Some(column) = request.layout.column_of(&task.id) {
            transition::ensure_allowed(task, column)?;
        }
    }

    Ok(())
}

/// Bring every task's status in line with the column it sits in. Runs the
/// full transition so auto-stops and moves are recorded. The layout has
/// already been validated, so every correction is an allowed move.
fn realign_statuses(
    state: &mut BoardState,
    layout: &BoardLayout,
    now: DateTime<Utc>,
) -> Result<Vec<StatusChange>> {
    let drifted: Vec<(String, Status)> = layout
        .columns()
        .flat_map(|(status, ids)| ids.iter().map(move |id| (id, status)))
        .filter(|(id, status)| {
            state
                .tasks
                .get(id)
                .map_or(false, |task| task.status != *status)
        })
        .map(|(id, status)| (id.clone(), status))
        .collect();

    let mut realigned = Vec::with_capacity(drifted.len());
    for (id, status) in drifted {
        tracing::warn!(task = %id, to = %status, "realigning task status to its column");
        if let Some(change) = transition::change_status(state, &id, status, now)? {
            realigned.push(change);
        }
    }
    Ok(realigned)
}

/// Reorder the store to follow the layout.
fn rebuild_order(store: &mut TaskStore, layout: &BoardLayout) {
    let mut by_id: HashMap<String, _> = std::mem::take(store)
        .into_tasks()
        .into_iter()
        .map(|task| (task.id.clone(), task))
        .collect();

    let mut ordered = Vec::with_capacity(by_id.len());
    for (_, ids) in layout.columns() {
        for id in ids {
            if let Some(task) = by_id.remove(id) {
                ordered.push(task);
            }
        }
    }

    if !by_id.is_empty() {
        tracing::warn!(count = by_id.len(), "tasks missing from layout kept at the end");
        ordered.extend(by_id.into_values());
    }

    *store = TaskStore::from_tasks(ordered);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryAction;
    use crate::model::{Task, TaskDraft};

    fn task(id: &str, status: Status) -> Task {
        let mut task = Task::new(id.to_string(), TaskDraft::new(id), Utc::now()).unwrap();
        task.status = status;
        task
    }

    fn state(tasks: Vec<Task>) -> BoardState {
        BoardState::new(TaskStore::from_tasks(tasks), Default::default())
    }

    fn order(state: &BoardState) -> Vec<&str> {
        state.tasks.iter().map(|task| task.id.as_str()).collect()
    }

    #[test]
    fn insertion_index_picks_first_card_below_pointer() {
        let cards = [
            CardBounds { top: 0.0, height: 40.0 },
            CardBounds { top: 50.0, height: 40.0 },
            CardBounds { top: 100.0, height: 40.0 },
        ];
        assert_eq!(insertion_index(&cards, 10.0), Some(0));
        assert_eq!(insertion_index(&cards, 30.0), Some(1));
        assert_eq!(insertion_index(&cards, 75.0), Some(2));
        assert_eq!(insertion_index(&cards, 130.0), None);
        assert_eq!(insertion_index(&[], 5.0), None);
    }

    #[test]
    fn drop_into_new_column_moves_and_reorders() {
        let mut state = state(vec![
            task("a", Status::Todo),
            task("b", Status::Todo),
            task("c", Status::Progress),
        ]);
        let mut layout = BoardLayout::from_store(&state.tasks);
        layout.place("b", Status::Progress, None).unwrap();

        let request = DropRequest {
            task_id: "b".to_string(),
            target: Status::Progress,
            layout,
        };
        let outcome = apply_drop(&mut state, &request, Utc::now()).unwrap();

        assert_eq!(outcome.status_change.unwrap().to, Status::Progress);
        assert!(outcome.order_changed);
        assert!(outcome.realigned.is_empty());
        assert_eq!(order(&state), vec!["a", "c", "b"]);
        assert_eq!(state.tasks.get("b").unwrap().status, Status::Progress);
        assert_eq!(state.history.latest().unwrap().action, HistoryAction::Moved);
    }

    #[test]
    fn reorder_within_column_records_no_history() {
        let mut state = state(vec![
            task("a", Status::Progress),
            task("b", Status::Progress),
        ]);
        let mut layout = BoardLayout::from_store(&state.tasks);
        layout.place("b", Status::Progress, Some(0)).unwrap();

        let request = DropRequest {
            task_id: "b".to_string(),
            target: Status::Progress,
            layout,
        };
        let outcome = apply_drop(&mut state, &request, Utc::now()).unwrap();
        assert!(outcome.status_change.is_none());
        assert!(outcome.order_changed);
        assert_eq!(order(&state), vec!["b", "a"]);
        assert!(state.history.is_empty());
    }

    #[test]
    fn drop_back_into_todo_is_rejected_untouched() {
        let mut state = state(vec![task("a", Status::Todo), task("b", Status::Progress)]);
        let before = state.clone();
        let mut layout = BoardLayout::from_store(&state.tasks);
        layout.place("b", Status::Todo, None).unwrap();

        let request = DropRequest {
            task_id: "b".to_string(),
            target: Status::Todo,
            layout,
        };
        let err = apply_drop(&mut state, &request, Utc::now()).unwrap_err();
        assert!(matches!(err, Error::PolicyViolation { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn layout_missing_or_duplicating_tasks_is_rejected() {
        let mut state = state(vec![task("a", Status::Todo), task("b", Status::Todo)]);
        let before = state.clone();

        let mut missing = BoardLayout::default();
        missing.progress.push("a".to_string());
        let request = DropRequest {
            task_id: "a".to_string(),
            target: Status::Progress,
            layout: missing,
        };
        assert!(matches!(
            apply_drop(&mut state, &request, Utc::now()),
            Err(Error::LayoutMismatch(_))
        ));

        let mut duplicated = BoardLayout::from_store(&state.tasks);
        duplicated.progress.push("a".to_string());
        let request = DropRequest {
            task_id: "a".to_string(),
            target: Status::Progress,
            layout: duplicated,
        };
        assert!(matches!(
            apply_drop(&mut state, &request, Utc::now()),
            Err(Error::LayoutMismatch(_))
        ));

        let mut stray = BoardLayout::from_store(&state.tasks);
        stray.done.push("ghost".to_string());
        let request = DropRequest {
            task_id: "a".to_string(),
            target: Status::Todo,
            layout: stray,
        };
        assert!(matches!(
            apply_drop(&mut state, &request, Utc::now()),
            Err(Error::LayoutMismatch(_))
        ));

        assert_eq!(state, before);
    }

    #[test]
    fn dragged_task_must_sit_in_target_column() {
        let mut state = state(vec![task("a", Status::Todo)]);
        let request = DropRequest {
            task_id: "a".to_string(),
            target: Status::Done,
            layout: BoardLayout::from_store(&state.tasks),
        };
        assert!(matches!(
            apply_drop(&mut state, &request, Utc::now()),
            Err(Error::LayoutMismatch(_))
        ));
    }

    #[test]
    fn drop_to_top_of_column_keeps_collection_order() {
        let mut state = state(vec![
            task("a", Status::Todo),
            task("b", Status::Todo),
            task("c", Status::Progress),
        ]);
        let mut layout = BoardLayout::from_store(&state.tasks);
        layout.place("b", Status::Progress, Some(0)).unwrap();

        let request = DropRequest {
            task_id: "b".to_string(),
            target: Status::Progress,
            layout,
        };
        let outcome = apply_drop(&mut state, &request, Utc::now()).unwrap();
        assert!(outcome.status_change.is_some());
        assert!(!outcome.order_changed);
        assert_eq!(order(&state), vec!["a", "b", "c"]);
    }

    #[test]
    fn realigning_a_running_task_into_done_records_stop_and_move() {
        let mut state = state(vec![task("a", Status::Progress), task("b", Status::Progress)]);
        let start = Utc::now();
        crate::timer::start(&mut state.tasks, "b", start.timestamp_millis()).unwrap();

        let mut layout = BoardLayout::from_store(&state.tasks);
        layout.place("b", Status::Done, None).unwrap();
        layout.place("a", Status::Progress, Some(0)).unwrap();
        let request = DropRequest {
            task_id: "a".to_string(),
            target: Status::Progress,
            layout,
        };
        let now = start + chrono::Duration::milliseconds(4000);
        let outcome = apply_drop(&mut state, &request, now).unwrap();

        assert!(outcome.status_change.is_none());
        assert_eq!(outcome.realigned.len(), 1);
        assert_eq!(outcome.realigned[0].task_id, "b");
        assert_eq!(outcome.realigned[0].auto_stopped_ms, Some(4000));

        let b = state.tasks.get("b").unwrap();
        assert_eq!(b.status, Status::Done);
        assert!(!b.is_tracking);
        assert_eq!(b.total_time, 4000);

        let actions: Vec<HistoryAction> =
            state.history.entries().iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![HistoryAction::Moved, HistoryAction::Timer]);
    }

    #[test]
    fn drifted_status_is_realigned_to_column() {
        let mut state = state(vec![task("a", Status::Progress), task("b", Status::Progress)]);
        let mut layout = BoardLayout::from_store(&state.tasks);
        layout.place("b", Status::OnHold, None).unwrap();

        let request = DropRequest {
            task_id: "a".to_string(),
            target: Status::Progress,
            layout,
        };
        let outcome = apply_drop(&mut state, &request, Utc::now()).unwrap();
        assert_eq!(outcome.realigned_ids(), vec!["b".to_string()]);
        assert_eq!(state.tasks.get("b").unwrap().status, Status::OnHold);
        assert_eq!(state.history.latest().unwrap().action, HistoryAction::Moved);
    }

    #[test]
    fn repeated_drops_never_change_cardinality() {
        let mut state = state(vec![
            task("a", Status::Todo),
            task("b", Status::Todo),
            task("c", Status::Todo),
            task("d", Status::Todo),
        ]);
        let moves = [
            ("a", Status::Progress, Some(0)),
            ("c", Status::Done, None),
            ("b", Status::OnHold, Some(3)),
            ("a", Status::Done, Some(0)),
            ("d", Status::Todo, Some(0)),
            ("b", Status::Progress, None),
        ];
        for (id, target, position) in moves {
            let mut layout = BoardLayout::from_store(&state.tasks);
            layout.place(id, target, position).unwrap();
            let request = DropRequest {
                task_id: id.to_string(),
                target,
                layout,
            };
            apply_drop(&mut state, &request, Utc::now()).unwrap();
            assert_eq!(state.tasks.len(), 4);
            let unique: HashSet<&str> = state.tasks.iter().map(|t| t.id.as_str()).collect();
            assert_eq!(unique.len(), 4);
        }
        assert_eq!(order(&state), vec!["d", "b", "a", "c"]);
    }
}

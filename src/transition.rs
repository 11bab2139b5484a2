//! Status transition policy.
//!
//! Once a task has left `todo` it can never return there. Every other move is
//! allowed. Entering `todo` or `done` stops a running timer first, and that
//! auto-stop is recorded before the move itself.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::history::HistoryAction;
use crate::model::{Status, Task};
use crate::state::BoardState;
use crate::timer::{self, TimerOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub task_id: String,
    pub from: Status,
    pub to: Status,
    /// Milliseconds folded into `total_time` when the move stopped a timer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_stopped_ms: Option<u64>,
}

pub fn is_allowed(from: Status, to: Status) -> bool {
    !(to == Status::Todo && from != Status::Todo)
}

pub fn ensure_allowed(task: &Task, to: Status) -> Result<()> {
    if is_allowed(task.status, to) {
        Ok(())
    } else {
        Err(Error::PolicyViolation {
            task: task.content.clone(),
            from: task.status,
            to,
        })
    }
}

/// Move a task to another column.
///
/// Returns `Ok(None)` when the task is already in `to`. A rejected move
/// leaves the state untouched.
pub fn change_status(
    state: &mut BoardState,
    task_id: &str,
    to: Status,
    now: DateTime<Utc>,
) -> Result<Option<StatusChange>> {
    let task = state.tasks.require_mut(task_id)?;
    ensure_allowed(task, to)?;
    let from = task.status;
    if from == to {
        return Ok(None);
    }

    let mut auto_stopped_ms = None;
    if to.stops_timer() && task.is_tracking {
        if let TimerOutcome::Paused { elapsed_ms, .. } =
            timer::pause_task(task, now.timestamp_millis())
        {
            auto_stopped_ms = Some(elapsed_ms);
        }
    }
    task.status = to;
    let content = task.content.clone();

    if let Some(elapsed_ms) = auto_stopped_ms {
        state.history.record(
            HistoryAction::Timer,
            format!("Auto-stopped timer for \"{content}\" (Moved to {to})"),
            Some(serde_json::json!({
                "task": content,
                "to": to,
                "elapsed": elapsed_ms,
            })),
            now,
        );
    }
    state.history.record(
        HistoryAction::Moved,
        format!("Moved \"{content}\" from {from} to {to}"),
        Some(serde_json::json!({
            "from": from,
            "to": to,
            "task": content,
        })),
        now,
    );
    tracing::debug!(task = task_id, %from, %to, "status changed");

    Ok(Some(StatusChange {
        task_id: task_id.to_string(),
        from,
        to,
        auto_stopped_ms,
    }))
}

//! Start/pause timer protocol.
//!
//! A task has at most one open session. `total_time` only accumulates closed
//! sessions; live elapsed time is derived on demand from `last_start_time`
//! and never written back by a read.

use serde::Serialize;

use crate::error::Result;
use crate::model::{Task, TimeLog};
use crate::store::TaskStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TimerOutcome {
    Started { at: i64 },
    AlreadyRunning,
    Paused { elapsed_ms: u64, closed_log: bool },
    NotRunning,
}

impl TimerOutcome {
    pub fn changed(self) -> bool {
        matches!(self, Self::Started { .. } | Self::Paused { .. })
    }
}

/// Open a session. A task that is already tracking is left alone.
pub fn start(store: &mut TaskStore, task_id: &str, now: i64) -> Result<TimerOutcome> {
    let task = store.require_mut(task_id)?;
    Ok(start_task(task, now))
}

/// Close the open session and fold its duration into `total_time`.
pub fn pause(store: &mut TaskStore, task_id: &str, now: i64) -> Result<TimerOutcome> {
    let task = store.require_mut(task_id)?;
    Ok(pause_task(task, now))
}

pub(crate) fn start_task(task: &mut Task, now: i64) -> TimerOutcome {
    if task.is_tracking {
        return TimerOutcome::AlreadyRunning;
    }
    task.is_tracking = true;
    task.last_start_time = Some(now);
    task.time_logs.push(TimeLog::open(now));
    tracing::debug!(task = %task.id, at = now, "timer started");
    TimerOutcome::Started { at: now }
}

pub(crate) fn pause_task(task: &mut Task, now: i64) -> TimerOutcome {
    if !task.is_tracking {
        return TimerOutcome::NotRunning;
    }
    let elapsed_ms = task
        .last_start_time
        .map(|start| elapsed_between(start, now))
        .unwrap_or(0);
    task.total_time = task.total_time.saturating_add(elapsed_ms);
    task.is_tracking = false;
    task.last_start_time = None;

    let closed_log = match task.time_logs.last_mut() {
        Some(log) if log.is_open() => {
            log.end = Some(now);
            true
        }
        _ => false,
    };
    if !closed_log {
        tracing::warn!(task = %task.id, "paused a tracking task without an open time log");
    }
    tracing::debug!(task = %task.id, elapsed_ms, "timer paused");
    TimerOutcome::Paused {
        elapsed_ms,
        closed_log,
    }
}

/// Closed time plus the running session, if any.
pub fn effective_total(task: &Task, now: i64) -> u64 {
    let live = if task.is_tracking {
        task.last_start_time
            .map(|start| elapsed_between(start, now))
            .unwrap_or(0)
    } else {
        0
    };
    task.total_time.saturating_add(live)
}

/// Live totals for every tracking task, in board order. Backs the display tick.
pub fn tracking_totals(store: &TaskStore, now: i64) -> Vec<(String, u64)> {
    store
        .tracking()
        .map(|task| (task.id.clone(), effective_total(task, now)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Session {
    pub start: i64,
    pub end: Option<i64>,
    /// `None` while the session is still running.
    pub duration_ms: Option<u64>,
}

/// Logged sessions, most recent first.
pub fn sessions(task: &Task) -> Vec<Session> {
    task.time_logs
        .iter()
        .rev()
        .map(|log| Session {
            start: log.start,
            end: log.end,
            duration_ms: log.duration_ms(),
        })
        .collect()
}

fn elapsed_between(start: i64, now: i64) -> u64 {
    u64::try_from(now.saturating_sub(start)).unwrap_or(0)
}

//! kanban board-wide commands: move, history, export, import.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;
use crate::history::HistoryEntry;
use crate::model::Status;
use crate::output::{format_duration, time_ago, HumanOutput};
use crate::reconcile::DropOutcome;

use super::context::{BoardContext, GlobalOptions};

pub struct MoveOptions {
    pub id: String,
    pub status: String,
    pub position: Option<usize>,
    pub global: GlobalOptions,
}

pub struct HistoryOptions {
    pub limit: Option<usize>,
    pub global: GlobalOptions,
}

pub struct HistoryClearOptions {
    pub global: GlobalOptions,
}

pub struct ExportOptions {
    pub output: Option<PathBuf>,
    pub global: GlobalOptions,
}

pub struct ImportOptions {
    pub file: PathBuf,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct MoveOutput {
    id: String,
    status: Status,
    position: usize,
    #[serde(flatten)]
    outcome: DropOutcome,
}

#[derive(Serialize)]
struct HistoryOutput<'a> {
    total: usize,
    entries: &'a [HistoryEntry],
}

#[derive(Serialize)]
struct ClearedOutput {
    removed: usize,
}

#[derive(Serialize)]
struct ExportOutput {
    path: PathBuf,
    tasks: usize,
    history: usize,
}

#[derive(Serialize)]
struct ImportOutput {
    file: PathBuf,
    tasks: usize,
    history: usize,
}

pub fn run_move(options: MoveOptions) -> Result<()> {
    let target = Status::parse(&options.status)?;
    let mut ctx = BoardContext::open(&options.global)?;
    let id = ctx.resolve(&options.id)?;
    let outcome = ctx.board.move_task(&id, target, options.position)?;

    let task = ctx.board.task(&id)?;
    let content = task.content.clone();
    let position = ctx
        .board
        .layout()
        .column(target)
        .iter()
        .position(|candidate| *candidate == id)
        .unwrap_or_default();

    let header = match &outcome.status_change {
        Some(change) => format!(
            "Moved \"{content}\" from {} to {}",
            change.from.label(),
            change.to.label()
        ),
        None => format!("Reordered \"{content}\" in {}", target.label()),
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("Position", position.to_string());
    if let Some(elapsed) = outcome.status_change.as_ref().and_then(|c| c.auto_stopped_ms) {
        human.push_summary("Timer stopped", format_duration(elapsed));
    }
    for realigned in &outcome.realigned {
        human.push_warning(format!(
            "status of {} corrected from {} to {} to match its column",
            realigned.task_id, realigned.from, realigned.to
        ));
    }

    let output = MoveOutput {
        id,
        status: target,
        position,
        outcome,
    };
    ctx.finish("move", &output, &human)
}

pub fn run_history(options: HistoryOptions) -> Result<()> {
    let ctx = BoardContext::open(&options.global)?;
    let all = ctx.board.history();
    let shown = options.limit.map_or(all.len(), |limit| limit.min(all.len()));
    let entries = &all[..shown];
    let now = ctx.board.now();

    let mut human = HumanOutput::new("History");
    human.push_summary("Entries", all.len().to_string());
    for entry in entries {
        human.push_detail(format!(
            "{:<8} {}  ({})",
            entry.action.as_str(),
            entry.description,
            time_ago(entry.timestamp, now)
        ));
    }

    let output = HistoryOutput {
        total: all.len(),
        entries,
    };
    ctx.emit("history", &output, &human)
}

pub fn run_history_clear(options: HistoryClearOptions) -> Result<()> {
    let mut ctx = BoardContext::open(&options.global)?;
    let removed = ctx.board.clear_history();

    let mut human = HumanOutput::new("History cleared");
    human.push_summary("Removed", removed.to_string());

    ctx.finish("history clear", &ClearedOutput { removed }, &human)
}

pub fn run_export(options: ExportOptions) -> Result<()> {
    let ctx = BoardContext::open(&options.global)?;
    let document = ctx.board.export_snapshot()?;
    let tasks = ctx.board.tasks().len();
    let history = ctx.board.history().len();

    let path = match options.output {
        Some(path) if path.as_os_str() == "-" => None,
        Some(path) => Some(path),
        None => Some(PathBuf::from(ctx.board.export_file_name())),
    };

    let Some(path) = path else {
        println!("{document}");
        return Ok(());
    };
    std::fs::write(&path, document)?;

    let mut human = HumanOutput::new(format!("Exported board to {}", path.display()));
    human.push_summary("Tasks", tasks.to_string());
    human.push_summary("History entries", history.to_string());
    human.push_next_step(format!("kanban import {}", path.display()));

    let output = ExportOutput {
        path,
        tasks,
        history,
    };
    ctx.emit("export", &output, &human)
}

pub fn run_import(options: ImportOptions) -> Result<()> {
    let raw = std::fs::read_to_string(&options.file)?;
    let mut ctx = BoardContext::open(&options.global)?;
    let state = ctx.board.import_snapshot(&raw)?;
    let tasks = state.tasks.len();
    let history = state.history.len();

    let mut human = HumanOutput::new(format!("Imported board from {}", options.file.display()));
    human.push_summary("Tasks", tasks.to_string());
    human.push_summary("History entries", history.to_string());

    let output = ImportOutput {
        file: options.file,
        tasks,
        history,
    };
    ctx.finish("import", &output, &human)
}

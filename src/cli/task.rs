//! kanban task command implementations.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{parse_due_date, parse_tags, Priority, Status, Task, TaskDraft};
use crate::output::{format_duration, HumanOutput};
use crate::timer::{self, Session};

use super::context::{BoardContext, GlobalOptions};

pub struct AddOptions {
    pub content: String,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub tags: Option<String>,
    pub global: GlobalOptions,
}

pub struct EditOptions {
    pub id: String,
    pub content: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub tags: Option<String>,
    pub global: GlobalOptions,
}

pub struct RmOptions {
    pub id: String,
    pub global: GlobalOptions,
}

pub struct ClearOptions {
    pub yes: bool,
    pub global: GlobalOptions,
}

pub struct ListOptions {
    pub status: Option<String>,
    pub global: GlobalOptions,
}

pub struct ShowOptions {
    pub id: String,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct TaskOutput<'a> {
    task: &'a Task,
}

#[derive(Serialize)]
struct ClearOutput {
    removed: usize,
}

#[derive(Serialize)]
struct ColumnOutput<'a> {
    status: Status,
    label: &'static str,
    tasks: Vec<&'a Task>,
}

#[derive(Serialize)]
struct ListOutput<'a> {
    total: usize,
    columns: Vec<ColumnOutput<'a>>,
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    task: &'a Task,
    effective_total_ms: u64,
    sessions: Vec<Session>,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut ctx = BoardContext::open(&options.global)?;

    let mut draft = ctx.board.draft(options.content);
    if let Some(priority) = options.priority.as_deref() {
        draft.priority = Priority::parse(priority)?;
    }
    if let Some(due) = options.due.as_deref() {
        draft.due_date = parse_due_date(due)?;
    }
    if let Some(tags) = options.tags.as_deref() {
        draft.tags = parse_tags(tags);
    }

    let task = ctx.board.create_task(draft)?;

    let mut human = HumanOutput::new(format!("Task created: {}", task.content));
    push_task_summary(&mut human, &task);
    human.push_next_step(format!("kanban move {} progress", task.id));

    ctx.finish("add", &TaskOutput { task: &task }, &human)
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    if options.content.is_none()
        && options.priority.is_none()
        && options.due.is_none()
        && options.tags.is_none()
    {
        return Err(Error::InvalidArgument(
            "nothing to edit: pass --content, --priority, --due or --tags".to_string(),
        ));
    }

    let mut ctx = BoardContext::open(&options.global)?;
    let id = ctx.resolve(&options.id)?;

    let mut draft = TaskDraft::from(ctx.board.task(&id)?);
    if let Some(content) = options.content {
        draft.content = content;
    }
    if let Some(priority) = options.priority.as_deref() {
        draft.priority = Priority::parse(priority)?;
    }
    if let Some(due) = options.due.as_deref() {
        draft.due_date = parse_due_date(due)?;
    }
    if let Some(tags) = options.tags.as_deref() {
        draft.tags = parse_tags(tags);
    }

    let task = ctx.board.edit_task(&id, draft)?;

    let mut human = HumanOutput::new(format!("Task updated: {}", task.content));
    push_task_summary(&mut human, &task);

    ctx.finish("edit", &TaskOutput { task: &task }, &human)
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let mut ctx = BoardContext::open(&options.global)?;
    let id = ctx.resolve(&options.id)?;
    let task = ctx.board.delete_task(&id)?;

    let mut human = HumanOutput::new(format!("Task deleted: {}", task.content));
    human.push_summary("ID", task.id.clone());

    ctx.finish("rm", &TaskOutput { task: &task }, &human)
}

pub fn run_clear(options: ClearOptions) -> Result<()> {
    if !options.yes {
        return Err(Error::InvalidArgument(
            "refusing to delete all tasks without --yes".to_string(),
        ));
    }

    let mut ctx = BoardContext::open(&options.global)?;
    let removed = ctx.board.clear_all_tasks();

    let mut human = HumanOutput::new("Cleared all tasks");
    human.push_summary("Removed", removed.to_string());

    ctx.finish("clear", &ClearOutput { removed }, &human)
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let filter = options.status.as_deref().map(Status::parse).transpose()?;
    let ctx = BoardContext::open(&options.global)?;
    let now = ctx.board.now().timestamp_millis();

    let columns: Vec<ColumnOutput<'_>> = Status::ALL
        .into_iter()
        .filter(|status| filter.map_or(true, |wanted| wanted == *status))
        .map(|status| ColumnOutput {
            status,
            label: status.label(),
            tasks: ctx.board.state().tasks.column(status).collect(),
        })
        .collect();
    let total: usize = columns.iter().map(|column| column.tasks.len()).sum();

    let mut human = HumanOutput::new("Board");
    human.push_summary("Total", total.to_string());
    for column in &columns {
        human.push_detail(format!("{} ({})", column.label, column.tasks.len()));
        for task in &column.tasks {
            human.push_detail(format!("  {}", task_line(task, now)));
        }
    }

    let output = ListOutput { total, columns };
    ctx.emit("list", &output, &human)
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = BoardContext::open(&options.global)?;
    let id = ctx.resolve(&options.id)?;
    let task = ctx.board.task(&id)?;
    let now = ctx.board.now().timestamp_millis();
    let effective_total_ms = timer::effective_total(task, now);
    let sessions = timer::sessions(task);

    let mut human = HumanOutput::new(task.content.clone());
    push_task_summary(&mut human, task);
    human.push_summary("Tracked", format_duration(effective_total_ms));
    for session in &sessions {
        let line = match session.duration_ms {
            Some(duration) => format!(
                "{} for {}",
                format_epoch_millis(session.start),
                format_duration(duration)
            ),
            None => format!("{} (running)", format_epoch_millis(session.start)),
        };
        human.push_detail(line);
    }

    let output = ShowOutput {
        task,
        effective_total_ms,
        sessions,
    };
    ctx.emit("show", &output, &human)
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("ID", task.id.clone());
    human.push_summary("Status", task.status.label());
    human.push_summary("Priority", task.priority.as_str());
    if let Some(due) = task.due_date {
        human.push_summary("Due", due.to_string());
    }
    if !task.tags.is_empty() {
        human.push_summary("Tags", task.tags.join(", "));
    }
}

fn task_line(task: &Task, now: i64) -> String {
    let mut line = format!("{}  {}", task.id, task.content);
    if task.priority != Priority::Medium {
        line.push_str(&format!(" [{}]", task.priority));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {due}"));
    }
    for tag in &task.tags {
        line.push_str(&format!(" #{tag}"));
    }
    let total = timer::effective_total(task, now);
    if total > 0 || task.is_tracking {
        line.push_str(&format!(" {}", format_duration(total)));
        if task.is_tracking {
            line.push_str(" (running)");
        }
    }
    line
}

fn format_epoch_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

//! kanban timer commands.

use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::output::{format_duration, HumanOutput};
use crate::timer::TimerOutcome;

use super::context::{BoardContext, GlobalOptions};

pub struct TimerOptions {
    pub id: String,
    pub global: GlobalOptions,
}

pub struct TimersOptions {
    pub watch: bool,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct TimerOutput {
    id: String,
    content: String,
    #[serde(flatten)]
    outcome: TimerOutcome,
    total_ms: u64,
}

#[derive(Serialize)]
struct RunningTimer {
    id: String,
    content: String,
    elapsed_ms: u64,
}

#[derive(Serialize)]
struct TimersOutput {
    running: Vec<RunningTimer>,
}

pub fn run_start(options: TimerOptions) -> Result<()> {
    let mut ctx = BoardContext::open(&options.global)?;
    let id = ctx.resolve(&options.id)?;
    let outcome = ctx.board.start_timer(&id)?;

    let header = match outcome {
        TimerOutcome::AlreadyRunning => "Timer already running",
        _ => "Timer started",
    };
    let output = timer_output(&ctx, &id, outcome)?;
    let mut human = HumanOutput::new(format!("{header}: {}", output.content));
    human.push_summary("Tracked", format_duration(output.total_ms));
    human.push_next_step(format!("kanban pause {id}"));

    ctx.finish("start", &output, &human)
}

pub fn run_pause(options: TimerOptions) -> Result<()> {
    let mut ctx = BoardContext::open(&options.global)?;
    let id = ctx.resolve(&options.id)?;
    let outcome = ctx.board.pause_timer(&id)?;

    let output = timer_output(&ctx, &id, outcome)?;
    let mut human = match outcome {
        TimerOutcome::Paused {
            elapsed_ms,
            closed_log,
        } => {
            let mut human = HumanOutput::new(format!("Timer paused: {}", output.content));
            human.push_summary("Session", format_duration(elapsed_ms));
            if !closed_log {
                human.push_warning("no open time log entry was found to close");
            }
            human
        }
        _ => HumanOutput::new(format!("Timer not running: {}", output.content)),
    };
    human.push_summary("Tracked", format_duration(output.total_ms));

    ctx.finish("pause", &output, &human)
}

/// Print running timers; with `--watch`, repeat every `timer.tick_ms`.
/// Each tick reloads the snapshot so starts and pauses made by other
/// processes show up. The loop never writes the snapshot.
pub fn run_timers(options: TimersOptions) -> Result<()> {
    let mut ctx = BoardContext::open(&options.global)?;
    let tick = Duration::from_millis(ctx.board.config().timer.tick_ms);

    loop {
        let running: Vec<RunningTimer> = ctx
            .board
            .tracking_totals()
            .into_iter()
            .filter_map(|(id, elapsed_ms)| {
                let content = ctx.board.task(&id).ok()?.content.clone();
                Some(RunningTimer {
                    id,
                    content,
                    elapsed_ms,
                })
            })
            .collect();

        let mut human = HumanOutput::new("Running timers");
        human.push_summary("Running", running.len().to_string());
        for timer in &running {
            human.push_detail(format!(
                "{}  {}  {}",
                format_duration(timer.elapsed_ms),
                timer.id,
                timer.content
            ));
        }
        ctx.emit("timers", &TimersOutput { running }, &human)?;

        if !options.watch {
            return Ok(());
        }
        std::thread::sleep(tick);
        ctx.reload();
    }
}

fn timer_output(ctx: &BoardContext, id: &str, outcome: TimerOutcome) -> Result<TimerOutput> {
    Ok(TimerOutput {
        id: id.to_string(),
        content: ctx.board.task(id)?.content.clone(),
        outcome,
        total_ms: ctx.board.effective_total(id)?,
    })
}

//! Command-line interface for kanban
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod board;
mod context;
mod task;
mod timer;

pub use context::GlobalOptions;

/// kanban - local task board with time tracking
///
/// Tasks move through todo, progress, on-hold and done. Each task carries a
/// start/pause timer; moving a task to done stops its timer.
#[derive(Parser, Debug)]
#[command(name = "kanban")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the board snapshots (defaults to the platform data dir)
    #[arg(long, global = true, env = "KANBAN_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Configuration file (defaults to kanban.toml in the data dir)
    #[arg(long, global = true, env = "KANBAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write board change events as JSON lines to a file, or `-` for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a task in the todo column
    Add {
        /// Task text
        content: String,

        /// Priority: low, medium, high
        #[arg(short, long)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,
    },

    /// Edit a task's text, priority, due date or tags
    Edit {
        /// Task id or unique prefix
        id: String,

        /// New task text
        #[arg(short, long)]
        content: Option<String>,

        /// Priority: low, medium, high
        #[arg(short, long)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD); empty string clears it
        #[arg(long)]
        due: Option<String>,

        /// Comma-separated tags; replaces existing tags
        #[arg(short, long)]
        tags: Option<String>,
    },

    /// Delete a task
    Rm {
        /// Task id or unique prefix
        id: String,
    },

    /// Delete every task
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// List tasks by column
    List {
        /// Only show one column
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show a task with its time log
    Show {
        /// Task id or unique prefix
        id: String,
    },

    /// Start a task's timer
    Start {
        /// Task id or unique prefix
        id: String,
    },

    /// Pause a task's timer
    Pause {
        /// Task id or unique prefix
        id: String,
    },

    /// Move a task to a column, optionally at a position within it
    Move {
        /// Task id or unique prefix
        id: String,

        /// Target column: todo, progress, on-hold, done
        status: String,

        /// Zero-based position in the target column (default: end)
        #[arg(long)]
        position: Option<usize>,
    },

    /// Show or clear the activity history
    History {
        #[command(subcommand)]
        command: Option<HistoryCommands>,

        /// Show at most this many entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Write a backup of the whole board
    Export {
        /// Output file (default: <prefix>-YYYY-MM-DD.json in the current dir); `-` for stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the board with a backup
    Import {
        /// Backup file written by `kanban export`
        file: PathBuf,
    },

    /// Show live elapsed time for running timers
    Timers {
        /// Keep refreshing every timer.tick_ms
        #[arg(short, long)]
        watch: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// Remove every history entry
    Clear,
}

impl Cli {
    fn global(&self) -> GlobalOptions {
        GlobalOptions {
            data_dir: self.data_dir.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = self.global();
        match self.command {
            Commands::Add {
                content,
                priority,
                due,
                tags,
            } => task::run_add(task::AddOptions {
                content,
                priority,
                due,
                tags,
                global,
            }),
            Commands::Edit {
                id,
                content,
                priority,
                due,
                tags,
            } => task::run_edit(task::EditOptions {
                id,
                content,
                priority,
                due,
                tags,
                global,
            }),
            Commands::Rm { id } => task::run_rm(task::RmOptions { id, global }),
            Commands::Clear { yes } => task::run_clear(task::ClearOptions { yes, global }),
            Commands::List { status } => task::run_list(task::ListOptions { status, global }),
            Commands::Show { id } => task::run_show(task::ShowOptions { id, global }),
            Commands::Start { id } => timer::run_start(timer::TimerOptions { id, global }),
            Commands::Pause { id } => timer::run_pause(timer::TimerOptions { id, global }),
            Commands::Timers { watch } => timer::run_timers(timer::TimersOptions { watch, global }),
            Commands::Move {
                id,
                status,
                position,
            } => board::run_move(board::MoveOptions {
                id,
                status,
                position,
                global,
            }),
            Commands::History { command, limit } => match command {
                Some(HistoryCommands::Clear) => {
                    board::run_history_clear(board::HistoryClearOptions { global })
                }
                None => board::run_history(board::HistoryOptions { limit, global }),
            },
            Commands::Export { output } => {
                board::run_export(board::ExportOptions { output, global })
            }
            Commands::Import { file } => board::run_import(board::ImportOptions { file, global }),
        }
    }
}

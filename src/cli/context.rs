//! Shared setup for board commands: data dir, config, event sink.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::board::Board;
use crate::clock::SystemClock;
use crate::config::BoardConfig;
use crate::error::{Error, Result};
use crate::events::EventDestination;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::FileStore;

/// Flags shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub events: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    fn events_to_stdout(&self) -> bool {
        matches!(
            EventDestination::parse(self.events.as_deref()),
            Some(EventDestination::Stdout)
        )
    }

    /// Event lines on stdout take precedence over the command's own output.
    pub fn output(&self) -> OutputOptions {
        let events_to_stdout = self.events_to_stdout();
        OutputOptions {
            json: self.json && !events_to_stdout,
            quiet: self.quiet || events_to_stdout,
        }
    }
}

pub type FileBoard = Board<FileStore, SystemClock>;

pub struct BoardContext {
    pub board: FileBoard,
    pub data_dir: PathBuf,
    options: OutputOptions,
}

impl BoardContext {
    pub fn open(global: &GlobalOptions) -> Result<Self> {
        let data_dir = resolve_data_dir(global.data_dir.as_deref())?;
        let config = match global.config.as_deref() {
            Some(path) => BoardConfig::load(path)?,
            None => BoardConfig::load_from_dir(&data_dir),
        };
        let store = FileStore::new(&data_dir).with_lock_timeout(config.storage.lock_timeout_ms);
        let mut board = Board::open(store, SystemClock, config);

        if let Some(destination) = EventDestination::parse(global.events.as_deref()) {
            board.subscribe(destination.open()?);
        }

        tracing::debug!(data_dir = %data_dir.display(), "board opened");
        Ok(Self {
            board,
            data_dir,
            options: global.output(),
        })
    }

    pub fn reload(&mut self) {
        self.board.reload();
    }

    pub fn resolve(&self, input: &str) -> Result<String> {
        self.board.resolve_task_id(input)
    }

    /// Emit the result of a read-only command.
    pub fn emit<T: serde::Serialize>(&self, command: &str, data: &T, human: &HumanOutput) -> Result<()> {
        emit_success(self.options, command, data, Some(human))
    }

    /// Emit the result of a mutating command. A parked persistence failure
    /// turns the command into an error.
    pub fn finish<T: serde::Serialize>(
        &mut self,
        command: &str,
        data: &T,
        human: &HumanOutput,
    ) -> Result<()> {
        if let Some(err) = self.board.take_persist_error() {
            return Err(err);
        }
        self.emit(command, data, human)
    }
}

/// `--data-dir` / `KANBAN_DIR`, else the platform data directory.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    ProjectDirs::from("", "", "kanban")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidArgument(
                "cannot determine a data directory; pass --data-dir or set KANBAN_DIR".to_string(),
            )
        })
}

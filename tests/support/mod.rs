#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub fn kanban_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("kanban"));
    cmd.env_remove("KANBAN_DIR")
        .env_remove("KANBAN_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

/// Scratch data directory for one test.
pub struct TestBoard {
    dir: TempDir,
}

impl TestBoard {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("board")
    }

    /// Command with `--data-dir` set and the working directory at the tempdir root.
    pub fn cmd(&self) -> Command {
        let mut cmd = kanban_cmd();
        cmd.current_dir(self.path())
            .arg("--data-dir")
            .arg(self.data_dir());
        cmd
    }

    pub fn write_data_file(&self, name: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.data_dir().join(name);
        fs::create_dir_all(self.data_dir())?;
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn read_snapshot(&self, key: &str) -> Value {
        let raw = fs::read_to_string(self.data_dir().join(format!("{key}.json")))
            .expect("read snapshot");
        serde_json::from_str(&raw).expect("snapshot json")
    }

    /// Run a command with `--json` and return the parsed envelope.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }

    pub fn add_task(&self, content: &str) -> String {
        let value = self.json(&["add", content]);
        value["data"]["task"]["id"]
            .as_str()
            .expect("task id")
            .to_string()
    }
}

//! Error types for kanban
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (unknown task, bad input, malformed import)
//! - 3: Blocked by policy (backward move to todo, inconsistent layout)
//! - 4: Operation failed (I/O, serialization, lock contention)

use std::path::PathBuf;
use thiserror::Error;

use crate::model::Status;

/// Exit codes for the kanban CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const POLICY_BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for board operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Ambiguous task id '{input}': {matches}")]
    AmbiguousId { input: String, matches: String },

    #[error("Invalid task: {0}")]
    Validation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid import document: {0}")]
    ImportFormat(String),

    // Policy blocks (exit code 3)
    #[error("Task '{task}' cannot move from {from} back to {to}")]
    PolicyViolation { task: String, from: Status, to: Status },

    #[error("Board layout does not match the task store: {0}")]
    LayoutMismatch(String),

    // Operation failures (exit code 4)
    #[error("Corrupt snapshot '{key}': {message}")]
    Deserialization { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::NotFound(_)
            | Error::AmbiguousId { .. }
            | Error::Validation(_)
            | Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::ImportFormat(_) => exit_codes::USER_ERROR,

            // Policy blocks
            Error::PolicyViolation { .. } | Error::LayoutMismatch(_) => {
                exit_codes::POLICY_BLOCKED
            }

            // Operation failures
            Error::Deserialization { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output, when the variant carries any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::PolicyViolation { task, from, to } => Some(serde_json::json!({
                "task": task,
                "from": from,
                "to": to,
            })),
            Error::AmbiguousId { input, matches } => Some(serde_json::json!({
                "input": input,
                "matches": matches.split(", ").collect::<Vec<_>>(),
            })),
            _ => None,
        }
    }
}

/// Result type alias for board operations
pub type Result<T> = std::result::Result<T, Error>;

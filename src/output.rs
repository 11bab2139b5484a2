//! Shared output formatting for kanban CLI commands.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "kanban.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let warnings = human.map(|h| h.warnings.clone()).unwrap_or_default();
        let next_steps = human.map(|h| h.next_steps.clone()).unwrap_or_default();

        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            data: &'a T,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            warnings: Vec<String>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
            warnings,
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    if let Some(human) = human {
        println!("{}", format_human(human));
    }

    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    let hint = next_steps.first().map(|step| step.as_str());
    if json {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            message: &'a str,
            code: i32,
            kind: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<serde_json::Value>,
        }

        #[derive(Serialize)]
        struct Envelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: ErrorBody<'a>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: ErrorBody {
                message: &err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            },
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = Vec::new();
    lines.push(output.header.clone());

    push_summary(&mut lines, &output.summary);
    push_section(&mut lines, "Details", &output.details);
    push_section(&mut lines, "Warnings", &output.warnings);
    push_section(&mut lines, "Next steps", &output.next_steps);

    lines.join("\n")
}

pub fn infer_command_name_from_args() -> String {
    infer_command_name(std::env::args().skip(1))
}

/// Command name for error envelopes, e.g. `move` or `history clear`.
/// Values of global flags that take an argument are skipped.
pub fn infer_command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    let mut command = None;

    while let Some(arg) = args.next() {
        if matches!(arg.as_str(), "--data-dir" | "--config" | "--events") {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        command = Some(arg);
        break;
    }

    let command = match command {
        Some(cmd) => cmd,
        None => return "kanban".to_string(),
    };

    if command == "history" {
        if let Some(sub) = args.find(|arg| !arg.starts_with('-')) {
            if sub == "clear" {
                return format!("{command} {sub}");
            }
        }
    }

    command
}

/// `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Relative age such as `3 mins ago`. Future timestamps read as `0 seconds ago`.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);

    const UNITS: [(i64, &str); 5] = [
        (31_536_000, "years"),
        (2_592_000, "months"),
        (86_400, "days"),
        (3_600, "hours"),
        (60, "mins"),
    ];
    for (size, unit) in UNITS {
        if seconds > size {
            return format!("{} {unit} ago", seconds / size);
        }
    }
    format!("{seconds} seconds ago")
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        2 => "user_error",
        3 => "policy_blocked",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::NotFound(_) => vec!["kanban list".to_string()],
        Error::AmbiguousId { .. } => vec!["use a longer id prefix (see kanban list)".to_string()],
        Error::PolicyViolation { .. } => {
            vec!["tasks that left todo can move to progress, on-hold or done".to_string()]
        }
        Error::ImportFormat(_) => {
            vec!["import expects a file written by kanban export".to_string()]
        }
        Error::InvalidConfig(_) => vec!["fix kanban.toml then retry".to_string()],
        Error::LockFailed(_) => vec!["another kanban process holds the board; retry".to_string()],
        _ => Vec::new(),
    }
}

fn push_summary(lines: &mut Vec<String>, summary: &[(String, String)]) {
    if summary.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    for (key, value) in summary {
        if value.is_empty() {
            lines.push(format!("- {key}"));
        } else {
            lines.push(format!("- {key}: {value}"));
        }
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("{title}:"));
    for item in items {
        lines.push(format!("- {item}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn command_name_skips_global_flag_values() {
        assert_eq!(infer_command_name(args(&[])), "kanban");
        assert_eq!(
            infer_command_name(args(&["--data-dir", "/tmp/x", "--json", "move", "abc", "done"])),
            "move"
        );
        assert_eq!(infer_command_name(args(&["history", "clear"])), "history clear");
        assert_eq!(infer_command_name(args(&["history", "--limit", "5"])), "history");
    }

    #[test]
    fn durations_render_as_clock_time() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(5000), "00:00:05");
        assert_eq!(format_duration(3_723_999), "01:02:03");
        assert_eq!(format_duration(100 * 3_600_000), "100:00:00");
    }

    #[test]
    fn relative_times_pick_the_largest_unit() {
        let now = Utc::now();
        assert_eq!(time_ago(now, now), "0 seconds ago");
        assert_eq!(time_ago(now - Duration::seconds(45), now), "45 seconds ago");
        assert_eq!(time_ago(now - Duration::seconds(60), now), "60 seconds ago");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "5 mins ago");
        assert_eq!(time_ago(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(time_ago(now - Duration::days(2), now), "2 days ago");
        assert_eq!(time_ago(now - Duration::days(400), now), "1 years ago");
        assert_eq!(time_ago(now + Duration::seconds(30), now), "0 seconds ago");
    }

    #[test]
    fn human_output_sections() {
        let mut human = HumanOutput::new("kanban list");
        human.push_summary("tasks", "2");
        human.push_warning("snapshot repaired");
        let text = format_human(&human);
        assert!(text.starts_with("kanban list"));
        assert!(text.contains("- tasks: 2"));
        assert!(text.contains("Warnings:\n- snapshot repaired"));
    }
}

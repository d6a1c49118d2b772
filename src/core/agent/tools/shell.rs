//! Shell execution for the `bash` tool.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::ToolError;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const MIN_TIMEOUT_MS: i64 = 1_000;
const MAX_TIMEOUT_MS: i64 = 120_000;

/// Returned in place of output when the command overruns its timeout.
pub const TIMEOUT_TEXT: &str = "(timeout)";
const NO_OUTPUT_TEXT: &str = "(no output)";

/// Turn the requested timeout into a bounded duration.
pub fn timeout_from(timeout_ms: Option<i64>) -> Duration {
    timeout_ms.map_or(Duration::from_millis(DEFAULT_TIMEOUT_MS), |ms| {
        Duration::from_millis(ms.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS).unsigned_abs())
    })
}

/// Run `command` with `bash -lc` inside `work_dir`.
///
/// A nonzero exit is not an error: the exit status is appended to the output
/// so the model can see it. Overrunning `timeout` kills the process and yields
/// [`TIMEOUT_TEXT`].
pub async fn run(work_dir: &Path, command: &str, timeout: Duration) -> Result<String, ToolError> {
    tracing::info!(command = %command, timeout_ms = timeout.as_millis(), "executing shell command");

    let child = Command::new("bash")
        .arg("-lc")
        .arg(command)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(ToolError::Spawn)?;

    // Dropping the wait future on timeout kills the child.
    let Ok(output) = tokio::time::timeout(timeout, child.wait_with_output()).await else {
        tracing::warn!(command = %command, "shell command timed out");
        return Ok(TIMEOUT_TEXT.to_string());
    };
    let output = output.map_err(ToolError::Spawn)?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut text = format!("{stdout}\n{stderr}").trim().to_string();
    if text.is_empty() {
        text = NO_OUTPUT_TEXT.to_string();
    }

    if !output.status.success() {
        let status = output
            .status
            .code()
            .map_or_else(|| output.status.to_string(), |code| format!("exit status {code}"));
        text.push_str(&format!("\n(exit error: {status})"));
    }

    Ok(text)
}

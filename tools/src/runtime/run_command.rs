//! run_command: real subprocess execution with a hard timeout.
//!
//! `kill_on_drop(true)` ensures a timed-out child is reaped rather than
//! orphaned; the timeout itself comes from `tokio::time::timeout` wrapping
//! the spawn-and-wait, not from any cooperative check inside the child.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

#[derive(Debug, Error)]
pub enum RunCommandError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn { command: String, #[source] source: std::io::Error },
    #[error("command '{command}' timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },
    #[error("failed waiting on '{command}': {source}")]
    Wait { command: String, #[source] source: std::io::Error },
}

pub async fn run_command(
    command: &str,
    args: &[String],
    working_dir: &Path,
    timeout: Duration,
) -> Result<CommandOutput, RunCommandError> {
    let start = Instant::now();
    debug!(command, ?args, "executing command");

    let mut cmd = Command::new(command);
    cmd.args(args)
        .current_dir(working_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| RunCommandError::Spawn { command: command.to_string(), source })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| RunCommandError::Timeout { command: command.to_string(), timeout_secs: timeout.as_secs() })?
        .map_err(|source| RunCommandError::Wait { command: command.to_string(), source })?;

    let duration_ms = start.elapsed().as_millis() as u64;
    let success = output.status.success();
    if !success {
        warn!(command, exit_code = ?output.status.code(), duration_ms, "command failed");
    }

    Ok(CommandOutput {
        success,
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn successful_command_reports_exit_zero() {
        let dir = tempdir().unwrap();
        let output = run_command("true", &[], dir.path(), Duration::from_secs(5)).await.unwrap();
        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
    }

    #[tokio::test]
    async fn failing_command_is_reported_without_erroring() {
        let dir = tempdir().unwrap();
        let output = run_command("false", &[], dir.path(), Duration::from_secs(5)).await.unwrap();
        assert!(!output.success);
    }

    #[tokio::test]
    async fn long_running_command_times_out() {
        let dir = tempdir().unwrap();
        let result = run_command(
            "sleep",
            &["5".to_string()],
            dir.path(),
            Duration::from_millis(50),
        )
        .await;
        assert!(matches!(result, Err(RunCommandError::Timeout { .. })));
    }
}

//! External test command execution

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

/// Captured result of one command run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    /// None when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the operator supplied test command
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> SyncResult<CommandOutcome>;
}

/// Runs commands through `sh -c` and surfaces their output in the log
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner;

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &str) -> SyncResult<CommandOutcome> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SyncError::local_io(format!("failed to spawn `{}`", command), e))?;

        let outcome = CommandOutcome {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !outcome.stdout.is_empty() {
            info!(command = %command, "{}", outcome.stdout.trim_end());
        }
        if !outcome.success {
            warn!(
                command = %command,
                exit_code = ?outcome.exit_code,
                stderr = %outcome.stderr.trim_end(),
                "Test command failed"
            );
        } else if !outcome.stderr.is_empty() {
            warn!(command = %command, "{}", outcome.stderr.trim_end());
        }

        Ok(outcome)
    }
}

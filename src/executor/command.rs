//! Shell command executor
//!
//! Interprets the rendered task as a shell command, streams stdout lines as
//! progress events, and returns the full output. Timeouts are owned by the
//! step runner, not by this executor.

use crate::core::ExecutionContext;
use crate::executor::{Executor, ExecutorError, ProgressSender};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Executor that runs its task through `sh -c`
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    shell: String,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for CommandExecutor {
    async fn execute(
        &self,
        task: &str,
        _context: &ExecutionContext,
        progress: ProgressSender,
    ) -> Result<String, ExecutorError> {
        debug!("spawning '{} -c' with command length {}", self.shell, task.len());

        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(task)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutorError::Failed(format!("failed to spawn {}: {}", self.shell, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecutorError::Failed("child stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecutorError::Failed("child stderr not captured".to_string()))?;

        // Drain stderr concurrently so a chatty command cannot deadlock on a
        // full pipe while stdout is still streaming
        let stderr_reader = tokio::spawn(async move {
            let mut buffered = String::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                buffered.push_str(&line);
                buffered.push('\n');
            }
            buffered
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut output = String::new();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ExecutorError::Failed(format!("failed to read stdout: {}", e)))?
        {
            progress.progress(line.clone()).await;
            output.push_str(&line);
            output.push('\n');
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ExecutorError::Failed(format!("failed to wait for child: {}", e)))?;
        let stderr = stderr_reader.await.unwrap_or_default();

        if !status.success() {
            let exit_code = status.code().unwrap_or(-1);
            warn!("command exited with code {}: {}", exit_code, stderr.trim());
            return Err(ExecutorError::Failed(format!(
                "command exited with code {}: {}",
                exit_code,
                stderr.trim()
            )));
        }

        debug!("command produced {} bytes of output", output.len());
        Ok(output)
    }
}

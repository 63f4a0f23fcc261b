//! Executor interface - the external collaborators that perform step work

pub mod command;
pub mod registry;
pub mod tools;

use crate::core::ExecutionContext;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

pub use command::CommandExecutor;
pub use registry::ExecutorRegistry;
pub use tools::{Tool, ToolExecutor, ToolInvoker, ToolOutcome, ToolRegistry};

/// Error types for executor operations
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    #[error("executor failed: {0}")]
    Failed(String),
}

/// Mid-execution events an executor may report while working on a task.
///
/// The terminal `complete`/`error` outcomes are the `Result` of
/// [`Executor::execute`]; everything in between travels on this channel.
#[derive(Debug, Clone)]
pub enum ExecutorEvent {
    /// Free-form progress output
    Progress { content: String },

    /// A tool invocation started
    ToolStarted { tool: String, params: Value },

    /// A tool invocation finished
    ToolEnded {
        tool: String,
        result: Value,
        is_error: bool,
    },
}

/// Sending half of the bounded executor-event channel.
///
/// The channel is bounded, so a slow consumer applies backpressure to the
/// executor instead of letting events pile up.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<ExecutorEvent>,
}

impl ProgressSender {
    /// Create a bounded event channel for one step invocation
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ExecutorEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Report free-form progress. A detached receiver ends delivery silently
    /// so an abandoned invocation can still run to completion.
    pub async fn progress(&self, content: impl Into<String>) {
        let _ = self
            .tx
            .send(ExecutorEvent::Progress {
                content: content.into(),
            })
            .await;
    }

    pub async fn tool_started(&self, tool: impl Into<String>, params: Value) {
        let _ = self
            .tx
            .send(ExecutorEvent::ToolStarted {
                tool: tool.into(),
                params,
            })
            .await;
    }

    pub async fn tool_ended(&self, tool: impl Into<String>, result: Value, is_error: bool) {
        let _ = self
            .tx
            .send(ExecutorEvent::ToolEnded {
                tool: tool.into(),
                result,
                is_error,
            })
            .await;
    }
}

/// Trait for step executors - allows for different implementations
#[async_trait]
pub trait Executor: Send + Sync {
    /// Perform a task, reporting progress through `progress` and returning
    /// the terminal output.
    async fn execute(
        &self,
        task: &str,
        context: &ExecutionContext,
        progress: ProgressSender,
    ) -> Result<String, ExecutorError>;
}

/// Trivial executor that echoes its rendered task back as the output.
///
/// Backs the fallback plan and keeps tests independent of any subprocess.
#[derive(Debug, Clone, Default)]
pub struct EchoExecutor;

#[async_trait]
impl Executor for EchoExecutor {
    async fn execute(
        &self,
        task: &str,
        _context: &ExecutionContext,
        progress: ProgressSender,
    ) -> Result<String, ExecutorError> {
        progress.progress(format!("echoing {} bytes", task.len())).await;
        Ok(task.to_string())
    }
}

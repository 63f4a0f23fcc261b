//! Tool invocation layer
//!
//! Executors reach external capabilities through the [`ToolInvoker`]
//! contract; the engine itself never calls a tool. [`ToolRegistry`] is the
//! default implementation, a name -> tool table with duration accounting.

use crate::core::ExecutionContext;
use crate::executor::{Executor, ExecutorError, ProgressSender};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Result of one tool invocation
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub success: bool,
    pub result: Value,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ToolOutcome {
    pub fn ok(result: Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            result,
            error: None,
            duration_ms,
        }
    }

    pub fn err(message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(message.into()),
            duration_ms,
        }
    }
}

/// A single tool implementation
#[async_trait]
pub trait Tool: Send + Sync {
    async fn run(&self, params: Value) -> Result<Value, String>;
}

/// The invocation contract consumed by executors
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke a tool by name. Unknown names and tool failures are reported
    /// through the outcome, never by panicking.
    async fn invoke(&self, name: &str, params: Value) -> ToolOutcome;
}

/// Name -> tool table implementing [`ToolInvoker`]
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in tools
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("echo", Arc::new(EchoTool));
        registry.register("clock", Arc::new(ClockTool));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, tool: Arc<dyn Tool>) {
        self.tools.insert(name.into(), tool);
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl ToolInvoker for ToolRegistry {
    async fn invoke(&self, name: &str, params: Value) -> ToolOutcome {
        let start = Instant::now();

        let Some(tool) = self.tools.get(name) else {
            return ToolOutcome::err(
                format!("unknown tool '{}'", name),
                start.elapsed().as_millis() as u64,
            );
        };

        debug!("invoking tool '{}'", name);
        match tool.run(params).await {
            Ok(result) => ToolOutcome::ok(result, start.elapsed().as_millis() as u64),
            Err(message) => ToolOutcome::err(message, start.elapsed().as_millis() as u64),
        }
    }
}

/// Built-in tool that returns its params untouched
struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    async fn run(&self, params: Value) -> Result<Value, String> {
        Ok(params)
    }
}

/// Built-in tool that reports the current UTC timestamp
struct ClockTool;

#[async_trait]
impl Tool for ClockTool {
    async fn run(&self, _params: Value) -> Result<Value, String> {
        Ok(json!({ "now": chrono::Utc::now().to_rfc3339() }))
    }
}

/// Executor that interprets its task as a tool invocation.
///
/// Task syntax: `<tool-name> [json-params]`, e.g. `clock` or
/// `echo {"message": "hi"}`. Emits tool lifecycle events around the call.
pub struct ToolExecutor {
    invoker: Arc<dyn ToolInvoker>,
}

impl ToolExecutor {
    pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
        Self { invoker }
    }

    fn parse_task(task: &str) -> Result<(&str, Value), ExecutorError> {
        let task = task.trim();
        if task.is_empty() {
            return Err(ExecutorError::Failed("empty tool task".to_string()));
        }

        let (name, rest) = match task.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (task, ""),
        };

        let params = if rest.is_empty() {
            json!({})
        } else {
            serde_json::from_str(rest)
                .map_err(|e| ExecutorError::Failed(format!("invalid tool params: {}", e)))?
        };

        Ok((name, params))
    }
}

#[async_trait]
impl Executor for ToolExecutor {
    async fn execute(
        &self,
        task: &str,
        _context: &ExecutionContext,
        progress: ProgressSender,
    ) -> Result<String, ExecutorError> {
        let (name, params) = Self::parse_task(task)?;

        progress.tool_started(name, params.clone()).await;
        let outcome = self.invoker.invoke(name, params).await;
        progress
            .tool_ended(name, outcome.result.clone(), !outcome.success)
            .await;

        if outcome.success {
            Ok(outcome.result.to_string())
        } else {
            Err(ExecutorError::Tool {
                tool: name.to_string(),
                message: outcome
                    .error
                    .unwrap_or_else(|| "tool reported failure".to_string()),
            })
        }
    }
}

//! Executor registry - resolves executor names to implementations
//!
//! The registry is an explicit value injected into the engine at
//! construction; there is no module-level registration.

use crate::executor::tools::{ToolExecutor, ToolRegistry};
use crate::executor::{CommandExecutor, EchoExecutor, Executor};
use std::collections::HashMap;
use std::sync::Arc;

/// Name -> executor lookup table
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in executors
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("echo", Arc::new(EchoExecutor));
        registry.register("command", Arc::new(CommandExecutor::new()));
        registry.register(
            "tool",
            Arc::new(ToolExecutor::new(Arc::new(ToolRegistry::with_builtins()))),
        );
        registry
    }

    /// Register an executor under a name; a later registration under the
    /// same name replaces the earlier one.
    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn Executor>) {
        self.executors.insert(name.into(), executor);
    }

    /// Resolve a name. A miss is surfaced to the caller as a step-level
    /// `ExecutorNotFound` failure, never a default.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Executor>> {
        self.executors.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

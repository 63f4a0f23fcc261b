//! Step domain model

use crate::core::state::StepStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// A single step in a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique step identifier
    pub id: String,

    /// Human-readable label (no behavioral role)
    pub description: String,

    /// Instruction template handed to the executor; may reference
    /// `{{ variable }}` placeholders resolved from the execution context
    pub task: String,

    /// Name of the executor that performs this step, resolved through the
    /// registry at run time
    pub executor: String,

    /// Step IDs that must complete before this step may start
    pub depends_on: Vec<String>,

    /// Maximum number of retries after the initial attempt
    pub max_retries: usize,

    /// Timeout per invocation, in seconds
    pub timeout_secs: u64,

    /// Current lifecycle status
    pub status: StepStatus,

    /// Retries consumed so far
    pub retry_count: usize,

    /// When the first attempt started (set once)
    pub started_at: Option<DateTime<Utc>>,

    /// When the step reached a terminal status (set once)
    pub completed_at: Option<DateTime<Utc>>,

    /// Opaque result payload on success
    pub output: Option<String>,

    /// Structured error on failure
    pub error: Option<StepError>,
}

/// Error recorded on a failed step
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct StepError {
    pub kind: StepErrorKind,
    pub message: String,
}

/// Classification of step failures, driving the retry decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    /// The executor name resolved to nothing — fatal for the step, no retry
    ExecutorNotFound,
    /// The invocation exceeded its timeout — retryable
    Timeout,
    /// A tool invoked by the executor failed — retryable
    Tool,
    /// The executor itself reported a failure — retryable
    Executor,
    /// The execution was cancelled — not retried
    Cancelled,
}

impl StepErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StepErrorKind::Timeout | StepErrorKind::Tool | StepErrorKind::Executor
        )
    }
}

impl StepError {
    pub fn new(kind: StepErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn executor_not_found(name: &str) -> Self {
        Self::new(
            StepErrorKind::ExecutorNotFound,
            format!("no executor registered under '{}'", name),
        )
    }

    pub fn timeout(secs: u64) -> Self {
        Self::new(
            StepErrorKind::Timeout,
            format!("timed out after {} seconds", secs),
        )
    }

    pub fn cancelled() -> Self {
        Self::new(StepErrorKind::Cancelled, "execution cancelled")
    }
}

/// Per-plan defaults applied to steps that do not override them
#[derive(Debug, Clone)]
pub struct StepDefaults {
    pub max_retries: usize,
    pub timeout_secs: u64,
}

impl Default for StepDefaults {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout_secs: 300, // 5 minutes
        }
    }
}

impl Step {
    /// Create a pending step
    pub fn new(id: impl Into<String>, task: impl Into<String>, executor: impl Into<String>) -> Self {
        let id = id.into();
        Step {
            description: id.clone(),
            id,
            task: task.into(),
            executor: executor.into(),
            depends_on: Vec::new(),
            max_retries: StepDefaults::default().max_retries,
            timeout_secs: StepDefaults::default().timeout_secs,
            status: StepStatus::Pending,
            retry_count: 0,
            started_at: None,
            completed_at: None,
            output: None,
            error: None,
        }
    }

    /// Builder-style dependency list
    pub fn with_depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Check whether all dependencies are in the given completed set
    pub fn dependencies_met(&self, completed: &HashSet<String>) -> bool {
        self.depends_on.iter().all(|dep| completed.contains(dep))
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition into the running phase. `started_at` is set on the first
    /// call only; retries re-enter without touching it.
    pub(crate) fn mark_running(&mut self) {
        self.status = StepStatus::Running;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
    }

    pub(crate) fn mark_completed(&mut self, output: String) {
        self.status = StepStatus::Completed;
        self.output = Some(output);
        self.completed_at = Some(Utc::now());
    }

    pub(crate) fn mark_failed(&mut self, error: StepError) {
        self.status = StepStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
    }

    pub(crate) fn mark_skipped(&mut self) {
        self.status = StepStatus::Skipped;
        self.completed_at = Some(Utc::now());
    }
}

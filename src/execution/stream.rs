//! Streaming events - the ordered progress feed consumed by observers
//!
//! Events flow through a bounded mpsc channel. Events from one step are
//! strictly ordered; events from concurrently running steps may interleave.
//! A full channel suspends the emitting runner rather than dropping events.

use crate::core::step::{Step, StepError};
use crate::core::Plan;
use crate::executor::ExecutorEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// What a streaming event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PlanStarted,
    StepStarted,
    StepProgress,
    ToolStarted,
    ToolEnded,
    StepRetrying,
    StepCompleted,
    StepFailed,
    StepSkipped,
    PlanCompleted,
}

/// One immutable progress fact emitted during execution
#[derive(Debug, Clone, Serialize)]
pub struct StreamingEvent {
    pub kind: EventKind,
    pub step_id: Option<String>,
    pub executor: Option<String>,
    pub content: String,
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
}

impl StreamingEvent {
    fn new(kind: EventKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            step_id: None,
            executor: None,
            content: content.into(),
            metadata: Value::Null,
            timestamp: Utc::now(),
        }
    }

    fn for_step(kind: EventKind, step: &Step, content: impl Into<String>) -> Self {
        let mut event = Self::new(kind, content);
        event.step_id = Some(step.id.clone());
        event.executor = Some(step.executor.clone());
        event
    }

    pub fn plan_started(plan: &Plan) -> Self {
        let mut event = Self::new(EventKind::PlanStarted, plan.query.clone());
        event.metadata = json!({
            "mode": plan.mode,
            "total_steps": plan.steps.len(),
        });
        event
    }

    pub fn step_started(step: &Step) -> Self {
        let mut event = Self::for_step(EventKind::StepStarted, step, step.description.clone());
        event.metadata = json!({ "attempt": step.retry_count + 1 });
        event
    }

    pub fn step_retrying(step: &Step) -> Self {
        let mut event = Self::for_step(
            EventKind::StepRetrying,
            step,
            format!("retry {}/{}", step.retry_count, step.max_retries),
        );
        event.metadata = json!({
            "retry_count": step.retry_count,
            "max_retries": step.max_retries,
        });
        event
    }

    pub fn step_completed(step: &Step) -> Self {
        Self::for_step(
            EventKind::StepCompleted,
            step,
            step.output.clone().unwrap_or_default(),
        )
    }

    pub fn step_failed(step: &Step, error: &StepError) -> Self {
        let mut event = Self::for_step(EventKind::StepFailed, step, error.message.clone());
        event.metadata = json!({ "kind": error.kind });
        event
    }

    pub fn step_skipped(step: &Step, reason: impl Into<String>) -> Self {
        Self::for_step(EventKind::StepSkipped, step, reason)
    }

    pub fn plan_completed(plan: &Plan) -> Self {
        let completed = plan.completed_steps();
        let total = plan.steps.len();
        let mut event = Self::new(
            EventKind::PlanCompleted,
            format!("{}/{} steps succeeded", completed, total),
        );
        event.metadata = json!({
            "status": plan.state.status,
            "completed": completed,
            "failed": plan.failed_steps(),
            "skipped": plan.skipped_steps(),
        });
        event
    }

    /// Wrap an executor-reported event, tagging it with the owning step
    pub fn from_executor(step: &Step, event: &ExecutorEvent) -> Self {
        match event {
            ExecutorEvent::Progress { content } => {
                Self::for_step(EventKind::StepProgress, step, content.clone())
            }
            ExecutorEvent::ToolStarted { tool, params } => {
                let mut ev = Self::for_step(EventKind::ToolStarted, step, tool.clone());
                ev.metadata = json!({ "params": params });
                ev
            }
            ExecutorEvent::ToolEnded {
                tool,
                result,
                is_error,
            } => {
                let mut ev = Self::for_step(EventKind::ToolEnded, step, tool.clone());
                ev.metadata = json!({ "result": result, "is_error": is_error });
                ev
            }
        }
    }
}

/// Receiving half of the event stream
pub type EventReceiver = mpsc::Receiver<StreamingEvent>;

/// Factory for the bounded event channel
pub struct EventStream;

impl EventStream {
    /// Create a bounded stream. `capacity` is the backpressure limit: a full
    /// stream suspends emitters until the reader catches up.
    pub fn bounded(capacity: usize) -> (EventSink, EventReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (EventSink { tx }, rx)
    }
}

/// Sending half of the event stream, cloned into every runner
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<StreamingEvent>,
}

impl EventSink {
    /// Emit an event, waiting if the stream is full. Emission to a detached
    /// receiver is a no-op so execution can finish without an observer.
    pub async fn emit(&self, event: StreamingEvent) {
        let _ = self.tx.send(event).await;
    }
}

//! Step runner - executes exactly one step
//!
//! The runner owns its step for the duration of the run (it receives the
//! step by value and returns it terminal), so no other task ever writes to
//! the same step. Executor events are forwarded onto the shared sink as they
//! arrive; only the terminal output is retained.

use crate::core::step::{Step, StepError, StepErrorKind};
use crate::core::ExecutionContext;
use crate::executor::{Executor, ExecutorError, ProgressSender};
use crate::execution::cancel::CancelToken;
use crate::execution::stream::{EventSink, StreamingEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Executes a single step against its resolved executor
pub struct StepRunner {
    events: EventSink,
    progress_capacity: usize,
}

impl StepRunner {
    pub fn new(events: EventSink, progress_capacity: usize) -> Self {
        Self {
            events,
            progress_capacity,
        }
    }

    /// Drive the step to a terminal status, applying the retry policy.
    ///
    /// Each invocation is bounded by the step's timeout; a timeout consumes a
    /// retry like any other retryable failure. Cancellation is terminal and
    /// never retried.
    pub async fn run(
        &self,
        mut step: Step,
        executor: Arc<dyn Executor>,
        context: ExecutionContext,
        cancel: CancelToken,
    ) -> Step {
        info!("executing step '{}' via '{}'", step.id, step.executor);
        step.mark_running();
        self.events.emit(StreamingEvent::step_started(&step)).await;

        loop {
            match self.attempt(&step, &executor, &context, &cancel).await {
                Ok(output) => {
                    info!("step '{}' completed", step.id);
                    step.mark_completed(output);
                    self.events
                        .emit(StreamingEvent::step_completed(&step))
                        .await;
                    break;
                }
                Err(error) if error.kind.is_retryable() && step.retry_count < step.max_retries => {
                    step.retry_count += 1;
                    warn!(
                        "step '{}' failed ({}), retry {}/{}",
                        step.id, error.message, step.retry_count, step.max_retries
                    );
                    self.events.emit(StreamingEvent::step_retrying(&step)).await;
                }
                Err(error) => {
                    warn!("step '{}' failed: {}", step.id, error.message);
                    self.events
                        .emit(StreamingEvent::step_failed(&step, &error))
                        .await;
                    step.mark_failed(error);
                    break;
                }
            }
        }

        step
    }

    /// One invocation: drive the executor future while draining its event
    /// channel, bounded by the step timeout and the cancel token.
    async fn attempt(
        &self,
        step: &Step,
        executor: &Arc<dyn Executor>,
        context: &ExecutionContext,
        cancel: &CancelToken,
    ) -> Result<String, StepError> {
        if cancel.is_cancelled() {
            return Err(StepError::cancelled());
        }

        let task = context.render(&step.task);
        debug!("rendered task for step '{}': {}", step.id, task);

        let (progress, mut rx) = ProgressSender::channel(self.progress_capacity);
        let fut = executor.execute(&task, context, progress);
        tokio::pin!(fut);

        let deadline = tokio::time::sleep(Duration::from_secs(step.timeout_secs));
        tokio::pin!(deadline);

        let mut result = None;
        let mut channel_open = true;
        while result.is_none() {
            tokio::select! {
                res = &mut fut => result = Some(res),
                event = rx.recv(), if channel_open => match event {
                    Some(event) => self.forward(step, &event).await,
                    None => channel_open = false,
                },
                () = &mut deadline => {
                    return Err(StepError::timeout(step.timeout_secs));
                }
                () = cancel.cancelled() => {
                    return Err(StepError::cancelled());
                }
            }
        }

        // The executor finished; drain events it emitted on the way out
        while let Some(event) = rx.recv().await {
            self.forward(step, &event).await;
        }

        match result.unwrap_or_else(|| unreachable!("loop exits only with a result")) {
            Ok(output) => Ok(output),
            Err(ExecutorError::Tool { tool, message }) => Err(StepError::new(
                StepErrorKind::Tool,
                format!("tool '{}' failed: {}", tool, message),
            )),
            Err(ExecutorError::Failed(message)) => {
                Err(StepError::new(StepErrorKind::Executor, message))
            }
        }
    }

    async fn forward(&self, step: &Step, event: &crate::executor::ExecutorEvent) {
        self.events
            .emit(StreamingEvent::from_executor(step, event))
            .await;
    }
}

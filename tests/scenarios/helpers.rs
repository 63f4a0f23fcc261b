//! Test utilities: a scripted mock executor and run/assert helpers

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stepflow::core::config::EngineConfig;
use stepflow::core::{ExecutionContext, ExecutionMode, Plan, PlanStatus, Step, StepStatus};
use stepflow::execution::EngineError;
use stepflow::{
    CancelToken, EventStream, ExecutionEngine, Executor, ExecutorError, ExecutorRegistry,
    ProgressSender, StreamingEvent,
};

/// What the mock executor does for one invocation
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Emit one progress event, then succeed with this output
    Succeed(String),
    /// Fail with this message
    Fail(String),
    /// Never finish (for timeout and cancellation tests)
    Hang,
}

pub fn ok(output: &str) -> MockResponse {
    MockResponse::Succeed(output.to_string())
}

pub fn fail(message: &str) -> MockResponse {
    MockResponse::Fail(message.to_string())
}

/// Mock executor that plays back a script of responses
///
/// Responses are consumed across all steps in invocation order, so a script
/// can cover a whole plan run including retries. Running past the end of the
/// script fails the invocation.
pub struct MockExecutor {
    script: Arc<Vec<MockResponse>>,
    index: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl MockExecutor {
    pub fn new(script: Vec<MockResponse>) -> Self {
        Self {
            script: Arc::new(script),
            index: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    /// Add artificial latency to every invocation
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many invocations have happened so far
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(
        &self,
        task: &str,
        _context: &ExecutionContext,
        progress: ProgressSender,
    ) -> Result<String, ExecutorError> {
        let idx = self.index.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let Some(response) = self.script.get(idx) else {
            return Err(ExecutorError::Failed(format!(
                "no scripted response for invocation {} (task: {})",
                idx + 1,
                task
            )));
        };

        match response {
            MockResponse::Succeed(output) => {
                progress.progress(format!("working on: {}", task)).await;
                Ok(output.clone())
            }
            MockResponse::Fail(message) => Err(ExecutorError::Failed(message.clone())),
            MockResponse::Hang => {
                std::future::pending::<()>().await;
                Ok(String::new())
            }
        }
    }
}

/// Shorthand step builder: executor "agent", short timeout for fast tests
pub fn step(id: &str, deps: &[&str]) -> Step {
    Step::new(id, format!("do {}", id), "agent")
        .with_depends_on(deps.iter().copied())
        .with_timeout_secs(30)
        .with_max_retries(0)
}

pub fn plan_of(mode: ExecutionMode, steps: Vec<Step>) -> Plan {
    Plan::new("test query", mode, steps).expect("test plan must be valid")
}

/// Run a plan against a single mock executor registered as "agent",
/// collecting every streamed event.
pub async fn run_with_mock(
    plan: &mut Plan,
    mock: Arc<MockExecutor>,
) -> (Result<(), EngineError>, Vec<StreamingEvent>) {
    let mut registry = ExecutorRegistry::new();
    registry.register("agent", mock);
    run_with_registry(plan, registry, EngineConfig::default(), CancelToken::new()).await
}

/// Run a plan with full control over registry, config and cancel token
pub async fn run_with_registry(
    plan: &mut Plan,
    registry: ExecutorRegistry,
    config: EngineConfig,
    cancel: CancelToken,
) -> (Result<(), EngineError>, Vec<StreamingEvent>) {
    let engine = ExecutionEngine::new(Arc::new(registry), config);
    run_with_engine(plan, &engine, cancel).await
}

pub async fn run_with_engine(
    plan: &mut Plan,
    engine: &ExecutionEngine,
    cancel: CancelToken,
) -> (Result<(), EngineError>, Vec<StreamingEvent>) {
    let (sink, mut rx) = EventStream::bounded(1024);
    let collector = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    });

    let result = engine.execute(plan, &sink, &cancel).await;
    drop(sink);
    let events = collector.await.expect("event collector must not panic");

    (result, events)
}

pub fn assert_plan_status(plan: &Plan, status: PlanStatus) {
    assert_eq!(
        plan.state.status, status,
        "plan should be {:?}, but was {:?} ({} completed / {} failed / {} skipped)",
        status,
        plan.state.status,
        plan.completed_steps(),
        plan.failed_steps(),
        plan.skipped_steps()
    );
}

pub fn assert_step_status(plan: &Plan, step_id: &str, status: StepStatus) {
    let step = plan
        .step(step_id)
        .unwrap_or_else(|| panic!("step '{}' not found", step_id));
    assert_eq!(
        step.status, status,
        "step '{}' should be {:?}, but was {:?} (error: {:?})",
        step_id, status, step.status, step.error
    );
}

/// Positions of the terminal event of each named step in the stream
pub fn event_position(
    events: &[StreamingEvent],
    step_id: &str,
    kind: stepflow::EventKind,
) -> Option<usize> {
    events
        .iter()
        .position(|e| e.kind == kind && e.step_id.as_deref() == Some(step_id))
}

//! Main execution engine - orchestrates an entire plan run
//!
//! The engine runs on one coordinating task. Sequential and conditional
//! traversals execute steps inline; parallel traversal dispatches whole
//! resolver levels onto a bounded worker pool and barrier-waits for each
//! level before starting the next.

use crate::core::config::EngineConfig;
use crate::core::plan::{ExecutionMode, Plan, PlanError};
use crate::core::resolver;
use crate::core::state::PlanStatus;
use crate::core::step::{Step, StepError};
use crate::core::ExecutionContext;
use crate::executor::{Executor, ExecutorRegistry};
use crate::execution::cancel::CancelToken;
use crate::execution::metrics::{ExecutionStats, StatsSnapshot};
use crate::execution::runner::StepRunner;
use crate::execution::stream::{EventSink, StreamingEvent};
use crate::persistence::{self, PersistenceSink};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Hard failures of a whole `execute` call. Step-level failures never
/// surface here; they are recorded on the plan.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("worker task failed: {0}")]
    Worker(String),
}

/// Predicate hook evaluated per step in conditional mode
pub type StepPredicate = dyn Fn(&Step, &Plan) -> bool + Send + Sync;

/// Runtime-only state owned by the engine for one plan execution.
/// Dropped when the plan settles.
struct ExecutionSession {
    events: EventSink,
    cancel: CancelToken,
    workers: Arc<Semaphore>,
    progress_capacity: usize,
}

impl ExecutionSession {
    fn runner(&self) -> StepRunner {
        StepRunner::new(self.events.clone(), self.progress_capacity)
    }
}

/// Orchestrates plan execution over an injected executor registry
pub struct ExecutionEngine {
    registry: Arc<ExecutorRegistry>,
    config: EngineConfig,
    stats: Arc<ExecutionStats>,
    persistence: Option<Arc<dyn PersistenceSink>>,
    predicate: Option<Arc<StepPredicate>>,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<ExecutorRegistry>, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            stats: Arc::new(ExecutionStats::new()),
            persistence: None,
            predicate: None,
        }
    }

    /// Attach a fire-and-forget persistence sink
    pub fn with_persistence(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.persistence = Some(sink);
        self
    }

    /// Install the predicate hook used by conditional mode
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Step, &Plan) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Execute the plan to a terminal status.
    ///
    /// Returns `Err` only for graph-validation failures (the plan never
    /// starts) and engine-internal faults; inspect `plan.failed_steps()` for
    /// step-level outcomes.
    pub async fn execute(
        &self,
        plan: &mut Plan,
        events: &EventSink,
        cancel: &CancelToken,
    ) -> Result<(), EngineError> {
        // Hard precondition: the dependency graph must be valid before any
        // step runs
        let levels = match resolver::resolve(&plan.steps) {
            Ok(levels) => levels,
            Err(e) => {
                error!("plan {} rejected: {}", plan.id, e);
                plan.state.finish(PlanStatus::Failed);
                return Err(e.into());
            }
        };

        info!(
            "starting plan {} ({:?}, {} steps, {} levels)",
            plan.id,
            plan.mode,
            plan.steps.len(),
            levels.len()
        );

        plan.state.start();
        events.emit(StreamingEvent::plan_started(plan)).await;
        self.save_plan(plan);

        let session = ExecutionSession {
            events: events.clone(),
            cancel: cancel.clone(),
            workers: Arc::new(Semaphore::new(self.config.max_parallel)),
            progress_capacity: self.config.progress_capacity,
        };

        let start = Instant::now();
        let run = match plan.mode {
            ExecutionMode::Sequential => self.run_ordered(plan, &session, None).await,
            ExecutionMode::Conditional => {
                self.run_ordered(plan, &session, self.predicate.clone())
                    .await
            }
            ExecutionMode::Parallel => self.run_levels(plan, &levels, &session).await,
        };

        if let Err(e) = run {
            plan.state.finish(PlanStatus::Failed);
            events.emit(StreamingEvent::plan_completed(plan)).await;
            self.finish(plan, start);
            return Err(e);
        }

        if cancel.is_cancelled() {
            self.fail_remaining(plan, &session).await;
            plan.state.finish(PlanStatus::Cancelled);
        } else {
            plan.state.finish(PlanStatus::Completed);
        }

        info!(
            "plan {} finished: {:?}, {}/{} steps succeeded",
            plan.id,
            plan.state.status,
            plan.completed_steps(),
            plan.steps.len()
        );
        events.emit(StreamingEvent::plan_completed(plan)).await;
        self.finish(plan, start);

        Ok(())
    }

    /// Sequential and conditional traversal: declared order, one in flight
    async fn run_ordered(
        &self,
        plan: &mut Plan,
        session: &ExecutionSession,
        predicate: Option<Arc<StepPredicate>>,
    ) -> Result<(), EngineError> {
        for i in 0..plan.steps.len() {
            if session.cancel.is_cancelled() {
                break;
            }

            let completed = plan.completed_ids();

            // A missing or failed dependency never blocks the plan; the
            // dependent step is skipped and traversal continues
            if !plan.steps[i].dependencies_met(&completed) {
                self.skip(&mut plan.steps[i], "unmet dependency", session)
                    .await;
                continue;
            }

            if let Some(predicate) = &predicate {
                if !predicate(&plan.steps[i], plan) {
                    self.skip(&mut plan.steps[i], "predicate declined", session)
                        .await;
                    continue;
                }
            }

            match self.prepare(&plan.steps[i]) {
                Ok(executor) => {
                    let context = ExecutionContext::for_step(plan, &plan.steps[i].id);
                    let done = session
                        .runner()
                        .run(
                            plan.steps[i].clone(),
                            executor,
                            context,
                            session.cancel.clone(),
                        )
                        .await;
                    plan.steps[i] = done;
                }
                Err(error) => {
                    self.fail_without_running(&mut plan.steps[i], error, session)
                        .await;
                }
            }
        }

        Ok(())
    }

    /// Parallel traversal: one resolver level at a time, barrier between
    /// levels, worker pool bounding concurrency within a level
    async fn run_levels(
        &self,
        plan: &mut Plan,
        levels: &[Vec<String>],
        session: &ExecutionSession,
    ) -> Result<(), EngineError> {
        for level in levels {
            if session.cancel.is_cancelled() {
                break;
            }

            let completed = plan.completed_ids();
            let mut join = JoinSet::new();

            for id in level {
                let Some(step) = plan.step(id) else { continue };

                if !step.dependencies_met(&completed) {
                    if let Some(step) = plan.step_mut(id) {
                        self.skip(step, "unmet dependency", session).await;
                    }
                    continue;
                }

                match self.prepare(step) {
                    Ok(executor) => {
                        let context = ExecutionContext::for_step(plan, id);
                        let runner = session.runner();
                        let cancel = session.cancel.clone();
                        let workers = session.workers.clone();
                        let step = step.clone();
                        join.spawn(async move {
                            // Pool slot first; a level wider than the pool
                            // queues here
                            let _permit = workers.acquire_owned().await;
                            runner.run(step, executor, context, cancel).await
                        });
                    }
                    Err(error) => {
                        if let Some(step) = plan.step_mut(id) {
                            self.fail_without_running(step, error, session).await;
                        }
                    }
                }
            }

            // Barrier: the whole level settles before the next one starts.
            // A sibling failure does not cancel the rest of the level.
            while let Some(joined) = join.join_next().await {
                match joined {
                    Ok(done) => {
                        if let Some(step) = plan.step_mut(&done.id) {
                            *step = done;
                        }
                    }
                    Err(e) => {
                        error!("step worker panicked: {}", e);
                        join.abort_all();
                        return Err(EngineError::Worker(e.to_string()));
                    }
                }
            }
        }

        Ok(())
    }

    /// Resolve the step's executor, or produce the non-retryable lookup error
    fn prepare(&self, step: &Step) -> Result<Arc<dyn Executor>, StepError> {
        self.registry
            .lookup(&step.executor)
            .ok_or_else(|| StepError::executor_not_found(&step.executor))
    }

    async fn skip(&self, step: &mut Step, reason: &str, session: &ExecutionSession) {
        info!("skipping step '{}': {}", step.id, reason);
        step.mark_skipped();
        session
            .events
            .emit(StreamingEvent::step_skipped(step, reason))
            .await;
    }

    async fn fail_without_running(
        &self,
        step: &mut Step,
        error: StepError,
        session: &ExecutionSession,
    ) {
        error!("step '{}' cannot run: {}", step.id, error);
        session
            .events
            .emit(StreamingEvent::step_failed(step, &error))
            .await;
        step.mark_failed(error);
    }

    /// Cancellation: settle every non-terminal step as failed-cancelled;
    /// already-terminal steps keep their recorded outcome
    async fn fail_remaining(&self, plan: &mut Plan, session: &ExecutionSession) {
        for i in 0..plan.steps.len() {
            if !plan.steps[i].is_terminal() {
                self.fail_without_running(&mut plan.steps[i], StepError::cancelled(), session)
                    .await;
            }
        }
    }

    fn save_plan(&self, plan: &Plan) {
        if let Some(sink) = &self.persistence {
            let sink = sink.clone();
            let record = persistence::PlanRecord::from_plan(plan);
            tokio::spawn(async move {
                sink.on_plan_saved(record).await;
            });
        }
    }

    /// Record stats and fire the execution summary. Persistence is
    /// fire-and-forget: failures are the sink's problem, never the plan's.
    fn finish(&self, plan: &Plan, start: Instant) {
        self.stats.record(plan.failed_steps() == 0, start.elapsed());

        if let Some(sink) = &self.persistence {
            let sink = sink.clone();
            let summary = persistence::create_summary(plan);
            tokio::spawn(async move {
                sink.on_execution_saved(summary).await;
            });
        }
    }
}

/// Convenience check used by CLI exit codes and callers that only need a
/// success flag
pub fn plan_succeeded(plan: &Plan) -> bool {
    plan.state.status == PlanStatus::Completed && plan.failed_steps() == 0
}

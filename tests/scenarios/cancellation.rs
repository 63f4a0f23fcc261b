//! Cancellation: in-flight steps abandon their executor call, remaining
//! steps settle as failed-cancelled, terminal steps keep their outcome

use crate::helpers::*;
use std::sync::Arc;
use std::time::Duration;
use stepflow::core::{ExecutionMode, PlanStatus, StepErrorKind, StepStatus};
use stepflow::CancelToken;

#[tokio::test]
async fn test_cancel_mid_plan() {
    let steps = vec![
        step("done-before", &[]),
        step("in-flight", &["done-before"]),
        step("never-started", &["in-flight"]),
    ];
    let mut plan = plan_of(ExecutionMode::Sequential, steps);

    let mock = Arc::new(MockExecutor::new(vec![ok("first"), MockResponse::Hang]));

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let mut registry = stepflow::ExecutorRegistry::new();
    registry.register("agent", mock);
    let (result, _events) = run_with_registry(
        &mut plan,
        registry,
        stepflow::core::config::EngineConfig::default(),
        cancel,
    )
    .await;
    result.unwrap();

    assert_plan_status(&plan, PlanStatus::Cancelled);

    // The already-finished step keeps its recorded outcome
    assert_step_status(&plan, "done-before", StepStatus::Completed);
    assert_eq!(
        plan.step("done-before").unwrap().output.as_deref(),
        Some("first")
    );

    // The in-flight and never-started steps fail with a cancelled error
    for id in ["in-flight", "never-started"] {
        assert_step_status(&plan, id, StepStatus::Failed);
        assert_eq!(
            plan.step(id).unwrap().error.as_ref().unwrap().kind,
            StepErrorKind::Cancelled
        );
    }

    // Cancellation is never retried
    assert_eq!(plan.step("in-flight").unwrap().retry_count, 0);
}

#[tokio::test]
async fn test_cancel_before_start_fails_every_step() {
    let steps = vec![step("a", &[]), step("b", &[])];
    let mut plan = plan_of(ExecutionMode::Parallel, steps);

    let cancel = CancelToken::new();
    cancel.cancel();

    let mock = Arc::new(MockExecutor::new(vec![ok("x"), ok("y")]));
    let mut registry = stepflow::ExecutorRegistry::new();
    registry.register("agent", mock.clone());
    let (result, _events) = run_with_registry(
        &mut plan,
        registry,
        stepflow::core::config::EngineConfig::default(),
        cancel,
    )
    .await;
    result.unwrap();

    assert_plan_status(&plan, PlanStatus::Cancelled);
    assert_eq!(plan.failed_steps(), 2);
    assert_eq!(mock.calls(), 0);
}

/// Cancelling during a parallel level abandons every in-flight runner at its
/// next check point.
#[tokio::test]
async fn test_cancel_during_parallel_level() {
    let steps = vec![step("a", &[]), step("b", &[])];
    let mut plan = plan_of(ExecutionMode::Parallel, steps);

    let mock = Arc::new(MockExecutor::new(vec![
        MockResponse::Hang,
        MockResponse::Hang,
    ]));

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let start = std::time::Instant::now();
    let mut registry = stepflow::ExecutorRegistry::new();
    registry.register("agent", mock);
    let (result, _events) = run_with_registry(
        &mut plan,
        registry,
        stepflow::core::config::EngineConfig::default(),
        cancel,
    )
    .await;
    result.unwrap();

    // Both steps hung, so only cancellation can have ended the run; the
    // 30-second step timeout never fired
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_plan_status(&plan, PlanStatus::Cancelled);
    for id in ["a", "b"] {
        assert_eq!(
            plan.step(id).unwrap().error.as_ref().unwrap().kind,
            StepErrorKind::Cancelled
        );
    }
}

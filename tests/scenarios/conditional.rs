//! Conditional mode: sequential traversal plus the predicate hook

use crate::helpers::*;
use std::sync::Arc;
use stepflow::core::config::EngineConfig;
use stepflow::core::{ExecutionMode, PlanStatus, StepStatus};
use stepflow::{CancelToken, ExecutionEngine, ExecutorRegistry};

fn engine_with(mock: Arc<MockExecutor>) -> ExecutionEngine {
    let mut registry = ExecutorRegistry::new();
    registry.register("agent", mock);
    ExecutionEngine::new(Arc::new(registry), EngineConfig::default())
}

/// The predicate is consulted per step; a false result skips the step.
#[tokio::test]
async fn test_predicate_skips_declined_steps() {
    let steps = vec![
        step("keep", &[]),
        step("drop", &[]),
        step("also-keep", &[]),
    ];
    let mut plan = plan_of(ExecutionMode::Conditional, steps);

    let mock = Arc::new(MockExecutor::new(vec![ok("one"), ok("two")]));
    let engine = engine_with(mock.clone()).with_predicate(|step, _plan| step.id != "drop");

    let (result, _events) = run_with_engine(&mut plan, &engine, CancelToken::new()).await;
    result.unwrap();

    assert_plan_status(&plan, PlanStatus::Completed);
    assert_step_status(&plan, "keep", StepStatus::Completed);
    assert_step_status(&plan, "drop", StepStatus::Skipped);
    assert_step_status(&plan, "also-keep", StepStatus::Completed);
    assert_eq!(mock.calls(), 2);
}

/// The predicate can inspect prior outcomes through the plan.
#[tokio::test]
async fn test_predicate_reads_prior_step_outcomes() {
    let steps = vec![
        step("probe", &[]),
        step("expensive", &[]),
    ];
    let mut plan = plan_of(ExecutionMode::Conditional, steps);

    let mock = Arc::new(MockExecutor::new(vec![ok("signal: abort")]));
    // Skip any later step once some completed step reported "abort"
    let engine = engine_with(mock).with_predicate(|_step, plan| {
        !plan.steps.iter().any(|s| {
            s.output
                .as_deref()
                .is_some_and(|output| output.contains("abort"))
        })
    });

    let (result, _events) = run_with_engine(&mut plan, &engine, CancelToken::new()).await;
    result.unwrap();

    assert_step_status(&plan, "probe", StepStatus::Completed);
    assert_step_status(&plan, "expensive", StepStatus::Skipped);
}

/// Without a predicate, conditional mode is indistinguishable from
/// sequential: dependency gating is the only skip rule.
#[tokio::test]
async fn test_conditional_without_predicate_matches_sequential() {
    let steps = vec![step("x", &[]), step("y", &["x"])];
    let mut plan = plan_of(ExecutionMode::Conditional, steps);

    let mock = Arc::new(MockExecutor::new(vec![fail("boom")]));
    let (result, _events) = run_with_mock(&mut plan, mock).await;
    result.unwrap();

    assert_step_status(&plan, "x", StepStatus::Failed);
    assert_step_status(&plan, "y", StepStatus::Skipped);
    assert_plan_status(&plan, PlanStatus::Completed);
}

/// Dependency gating still applies before the predicate runs.
#[tokio::test]
async fn test_predicate_never_sees_gated_steps() {
    let steps = vec![step("x", &[]), step("y", &["x"])];
    let mut plan = plan_of(ExecutionMode::Conditional, steps);

    let mock = Arc::new(MockExecutor::new(vec![fail("boom")]));
    // A predicate that would happily run everything
    let engine = engine_with(mock).with_predicate(|_, _| true);

    let (result, _events) = run_with_engine(&mut plan, &engine, CancelToken::new()).await;
    result.unwrap();

    // y is skipped by the dependency rule even though the predicate said yes
    assert_step_status(&plan, "y", StepStatus::Skipped);
}

//! Failure and skip policy: a failed dependency skips its dependents but
//! never blocks the plan

use crate::helpers::*;
use std::sync::Arc;
use stepflow::core::{ExecutionMode, Plan, PlanError, PlanStatus, Step, StepStatus};
use stepflow::EventKind;

/// X fails with no retries, Y depends on X: X failed, Y skipped, plan
/// completed with one failed step.
#[tokio::test]
async fn test_failed_dependency_skips_dependent() {
    let steps = vec![step("x", &[]), step("y", &["x"])];
    let mut plan = plan_of(ExecutionMode::Sequential, steps);

    let mock = Arc::new(MockExecutor::new(vec![fail("boom")]));
    let (result, events) = run_with_mock(&mut plan, mock.clone()).await;

    result.unwrap();
    assert_plan_status(&plan, PlanStatus::Completed);
    assert_step_status(&plan, "x", StepStatus::Failed);
    assert_step_status(&plan, "y", StepStatus::Skipped);
    assert_eq!(plan.failed_steps(), 1);
    assert_eq!(mock.calls(), 1);

    // The skipped step never started
    assert!(event_position(&events, "y", EventKind::StepStarted).is_none());
    assert!(event_position(&events, "y", EventKind::StepSkipped).is_some());
    assert!(plan.step("y").unwrap().started_at.is_none());
}

/// Same skip policy in parallel mode: dependents in later levels are skipped
/// at dispatch time, siblings are unaffected.
#[tokio::test]
async fn test_parallel_sibling_failure_does_not_cancel_level() {
    let steps = vec![
        step("good", &[]),
        step("bad", &[]),
        step("after-bad", &["bad"]),
        step("after-good", &["good"]),
    ];
    let mut plan = plan_of(ExecutionMode::Parallel, steps);

    // Script entries are consumed in invocation order, which is not fixed
    // within a level; whichever sibling draws the failure, the aggregate
    // outcome is the same: its dependent is skipped, the other chain runs
    let mock = Arc::new(MockExecutor::new(vec![
        ok("level 0 first"),
        fail("level 0 second"),
        ok("level 1"),
    ]));
    let (result, _events) = run_with_mock(&mut plan, mock).await;
    result.unwrap();

    assert_plan_status(&plan, PlanStatus::Completed);
    assert_eq!(plan.failed_steps(), 1);
    assert_eq!(plan.skipped_steps(), 1);
    assert_eq!(plan.completed_steps(), 2);
}

/// Skipped steps cascade: a dependent of a skipped step is itself skipped.
#[tokio::test]
async fn test_skip_cascades_down_the_chain() {
    let steps = vec![step("x", &[]), step("y", &["x"]), step("z", &["y"])];
    let mut plan = plan_of(ExecutionMode::Sequential, steps);

    let mock = Arc::new(MockExecutor::new(vec![fail("boom")]));
    let (result, _events) = run_with_mock(&mut plan, mock).await;
    result.unwrap();

    assert_step_status(&plan, "x", StepStatus::Failed);
    assert_step_status(&plan, "y", StepStatus::Skipped);
    assert_step_status(&plan, "z", StepStatus::Skipped);
    assert_plan_status(&plan, PlanStatus::Completed);
}

/// A dangling dependency is rejected at construction; the plan never runs.
#[tokio::test]
async fn test_dangling_dependency_never_runs() {
    let steps = vec![step("p", &[]), step("q", &["r"])];

    match Plan::new("q", ExecutionMode::Sequential, steps) {
        Err(PlanError::DanglingDependency { step, missing }) => {
            assert_eq!(step, "q");
            assert_eq!(missing, "r");
        }
        other => panic!("expected DanglingDependency, got {:?}", other),
    }
}

/// An unknown executor name fails that step only, with no retries.
#[tokio::test]
async fn test_unknown_executor_fails_fast() {
    let steps = vec![
        step("known", &[]),
        Step::new("unknown", "t", "ghost").with_max_retries(3),
        step("dependent", &["unknown"]),
    ];
    let mut plan = plan_of(ExecutionMode::Sequential, steps);

    let mock = Arc::new(MockExecutor::new(vec![ok("fine")]));
    let (result, events) = run_with_mock(&mut plan, mock).await;
    result.unwrap();

    assert_step_status(&plan, "known", StepStatus::Completed);
    assert_step_status(&plan, "unknown", StepStatus::Failed);
    assert_step_status(&plan, "dependent", StepStatus::Skipped);

    let unknown = plan.step("unknown").unwrap();
    assert_eq!(unknown.retry_count, 0);
    assert_eq!(
        unknown.error.as_ref().unwrap().kind,
        stepflow::core::StepErrorKind::ExecutorNotFound
    );
    // Lookup failure produces no retry events
    assert!(event_position(&events, "unknown", EventKind::StepRetrying).is_none());
}

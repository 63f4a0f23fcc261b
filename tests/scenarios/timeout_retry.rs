//! Timeouts consume a retry slot like any other transient failure

use crate::helpers::*;
use std::sync::Arc;
use stepflow::core::{ExecutionMode, PlanStatus, StepErrorKind, StepStatus};

/// Three sequential steps; the second hangs once, times out, then succeeds
/// on its retry. Everything ends completed and only the retry counter shows
/// the hiccup.
#[tokio::test]
async fn test_timeout_once_then_succeed() {
    let steps = vec![
        step("one", &[]).with_timeout_secs(5),
        step("two", &["one"]).with_timeout_secs(1).with_max_retries(1),
        step("three", &["two"]).with_timeout_secs(5),
    ];
    let mut plan = plan_of(ExecutionMode::Sequential, steps);

    let mock = Arc::new(MockExecutor::new(vec![
        ok("one done"),
        MockResponse::Hang,
        ok("two done"),
        ok("three done"),
    ]));
    let (result, _events) = run_with_mock(&mut plan, mock.clone()).await;

    result.unwrap();
    assert_plan_status(&plan, PlanStatus::Completed);
    for id in ["one", "two", "three"] {
        assert_step_status(&plan, id, StepStatus::Completed);
    }

    assert_eq!(plan.step("one").unwrap().retry_count, 0);
    assert_eq!(plan.step("two").unwrap().retry_count, 1);
    assert_eq!(plan.step("three").unwrap().retry_count, 0);
    assert_eq!(mock.calls(), 4);
    assert_eq!(plan.failed_steps(), 0);
}

/// A step that always hangs exhausts its budget through timeouts and fails
/// with a timeout error.
#[tokio::test]
async fn test_timeouts_exhaust_retry_budget() {
    let steps = vec![step("stuck", &[])
        .with_timeout_secs(1)
        .with_max_retries(1)];
    let mut plan = plan_of(ExecutionMode::Sequential, steps);

    let mock = Arc::new(MockExecutor::new(vec![
        MockResponse::Hang,
        MockResponse::Hang,
    ]));
    let (result, _events) = run_with_mock(&mut plan, mock.clone()).await;

    result.unwrap();
    assert_step_status(&plan, "stuck", StepStatus::Failed);
    assert_eq!(mock.calls(), 2);

    let error = plan.step("stuck").unwrap().error.clone().unwrap();
    assert_eq!(error.kind, StepErrorKind::Timeout);
    assert!(error.message.contains("1 seconds"));
}

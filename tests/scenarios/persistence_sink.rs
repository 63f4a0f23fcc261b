//! The engine's fire-and-forget persistence calls

use crate::helpers::*;
use std::sync::Arc;
use std::time::Duration;
use stepflow::core::config::EngineConfig;
use stepflow::core::{ExecutionMode, PlanStatus};
use stepflow::persistence::InMemoryHistory;
use stepflow::{CancelToken, ExecutionEngine, ExecutorRegistry};

/// Wait for the spawned sink tasks to land, bounded so a broken sink fails
/// the test instead of hanging it.
async fn wait_for_records(history: &InMemoryHistory) {
    for _ in 0..100 {
        if !history.executions().await.is_empty() && !history.plans().await.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("persistence sink was never called");
}

#[tokio::test]
async fn test_engine_fires_plan_and_execution_records() {
    let steps = vec![step("only", &[])];
    let mut plan = plan_of(ExecutionMode::Sequential, steps);
    let plan_id = plan.id;

    let history = Arc::new(InMemoryHistory::new());
    let mock = Arc::new(MockExecutor::new(vec![ok("done")]));
    let mut registry = ExecutorRegistry::new();
    registry.register("agent", mock);

    let engine = ExecutionEngine::new(Arc::new(registry), EngineConfig::default())
        .with_persistence(history.clone());

    let (result, _events) = run_with_engine(&mut plan, &engine, CancelToken::new()).await;
    result.unwrap();

    wait_for_records(&history).await;

    let plans = history.plans().await;
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].plan_id, plan_id);
    assert_eq!(plans[0].total_steps, 1);

    let executions = history.executions().await;
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, PlanStatus::Completed);
    assert_eq!(executions[0].completed_steps, 1);
    assert_eq!(executions[0].failed_steps, 0);
}

/// Step failures are visible in the summary but do not affect delivery.
#[tokio::test]
async fn test_summary_carries_failure_counts() {
    let steps = vec![step("bad", &[]), step("child", &["bad"])];
    let mut plan = plan_of(ExecutionMode::Sequential, steps);

    let history = Arc::new(InMemoryHistory::new());
    let mock = Arc::new(MockExecutor::new(vec![fail("nope")]));
    let mut registry = ExecutorRegistry::new();
    registry.register("agent", mock);

    let engine = ExecutionEngine::new(Arc::new(registry), EngineConfig::default())
        .with_persistence(history.clone());

    let (result, _events) = run_with_engine(&mut plan, &engine, CancelToken::new()).await;
    result.unwrap();

    wait_for_records(&history).await;

    let executions = history.executions().await;
    assert_eq!(executions[0].failed_steps, 1);
    assert_eq!(executions[0].skipped_steps, 1);
    assert_eq!(executions[0].completed_steps, 0);
    // The plan itself still completed; persistence reflects that
    assert_eq!(executions[0].status, PlanStatus::Completed);
}

//! Persistence layer for plan and execution history
//!
//! The engine talks to persistence through the fire-and-forget
//! [`PersistenceSink`]: it never awaits success and a failing backend can
//! never change a plan's status. Query methods for the CLI live on the
//! concrete stores.

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteHistoryStore;

use crate::core::plan::{ExecutionMode, Plan};
use crate::core::state::PlanStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot taken when a plan is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRecord {
    pub plan_id: Uuid,
    pub query: String,
    pub mode: ExecutionMode,
    pub total_steps: usize,
    pub created_at: DateTime<Utc>,
}

impl PlanRecord {
    pub fn from_plan(plan: &Plan) -> Self {
        Self {
            plan_id: plan.id,
            query: plan.query.clone(),
            mode: plan.mode,
            total_steps: plan.steps.len(),
            created_at: Utc::now(),
        }
    }
}

/// Summary of one finished plan execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// The plan that was executed
    pub plan_id: Uuid,

    /// The originating request
    pub query: String,

    /// Final status
    pub status: PlanStatus,

    /// When execution started
    pub started_at: DateTime<Utc>,

    /// When execution reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,

    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
}

impl ExecutionSummary {
    /// Fraction of steps that reached a terminal state (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        (self.completed_steps + self.failed_steps + self.skipped_steps) as f64
            / self.total_steps as f64
    }
}

/// Create a summary from a plan's current state
pub fn create_summary(plan: &Plan) -> ExecutionSummary {
    ExecutionSummary {
        execution_id: plan.state.execution_id,
        plan_id: plan.id,
        query: plan.query.clone(),
        status: plan.state.status,
        started_at: plan.state.started_at.unwrap_or_else(Utc::now),
        completed_at: plan.state.completed_at,
        total_steps: plan.steps.len(),
        completed_steps: plan.completed_steps(),
        failed_steps: plan.failed_steps(),
        skipped_steps: plan.skipped_steps(),
    }
}

/// Fire-and-forget sink called by the engine at plan creation and
/// termination. Implementations log their own failures.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn on_plan_saved(&self, plan: PlanRecord);

    async fn on_execution_saved(&self, summary: ExecutionSummary);
}

/// In-memory history (for `--no-history` runs and tests)
#[derive(Default)]
pub struct InMemoryHistory {
    plans: tokio::sync::RwLock<Vec<PlanRecord>>,
    executions: tokio::sync::RwLock<Vec<ExecutionSummary>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn plans(&self) -> Vec<PlanRecord> {
        self.plans.read().await.clone()
    }

    pub async fn executions(&self) -> Vec<ExecutionSummary> {
        self.executions.read().await.clone()
    }

    pub async fn load_execution(&self, execution_id: Uuid) -> Option<ExecutionSummary> {
        self.executions
            .read()
            .await
            .iter()
            .find(|e| e.execution_id == execution_id)
            .cloned()
    }
}

#[async_trait]
impl PersistenceSink for InMemoryHistory {
    async fn on_plan_saved(&self, plan: PlanRecord) {
        self.plans.write().await.push(plan);
    }

    async fn on_execution_saved(&self, summary: ExecutionSummary) {
        self.executions.write().await.push(summary);
    }
}

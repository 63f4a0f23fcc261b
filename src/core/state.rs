//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall plan execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    /// Plan has been built but not started
    Created,
    /// Plan is currently executing
    Running,
    /// Every step reached a terminal state
    Completed,
    /// Execution could not start or an engine-internal fault occurred
    Failed,
    /// Execution was cancelled mid-flight
    Cancelled,
}

impl PlanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlanStatus::Completed | PlanStatus::Failed | PlanStatus::Cancelled
        )
    }
}

/// Status of a single step
///
/// Moves forward only: `Pending → Running → {Completed, Failed, Skipped}`.
/// Retries re-enter the running phase inside the runner without the public
/// status ever regressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped
        )
    }
}

/// Runtime state of a plan execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanState {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Current execution status
    pub status: PlanStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
}

impl PlanState {
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            status: PlanStatus::Created,
            started_at: None,
            completed_at: None,
        }
    }

    /// Mark the plan as started
    pub fn start(&mut self) {
        self.status = PlanStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Settle into a terminal status
    pub fn finish(&mut self, status: PlanStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }
}

impl Default for PlanState {
    fn default() -> Self {
        Self::new()
    }
}

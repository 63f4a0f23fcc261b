//! Plan domain model

use crate::core::config::PlanConfig;
use crate::core::resolver;
use crate::core::state::{PlanState, StepStatus};
use crate::core::step::Step;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

/// How the engine traverses the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Declared order, one step at a time
    #[default]
    Sequential,
    /// Level-by-level with a barrier between levels
    Parallel,
    /// Declared order with a per-step predicate hook
    Conditional,
}

/// Errors raised while constructing or validating a plan.
///
/// All of these are fatal: a plan that fails validation never starts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("circular dependency: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    #[error("step '{step}' depends on unknown step '{missing}'")]
    DanglingDependency { step: String, missing: String },

    #[error("duplicate step id '{id}'")]
    DuplicateStepId { id: String },
}

/// A workflow plan: ordered steps plus execution metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique plan ID
    pub id: Uuid,

    /// The originating request, opaque to the engine
    pub query: String,

    /// Traversal mode, fixed for the plan's lifetime
    pub mode: ExecutionMode,

    /// Global variables available for task rendering
    pub variables: HashMap<String, String>,

    /// Ordered step list; IDs are unique by construction
    pub steps: Vec<Step>,

    /// Runtime execution state
    pub state: PlanState,
}

impl Plan {
    /// Build a plan, enforcing ID uniqueness and an acyclic dependency graph.
    pub fn new(
        query: impl Into<String>,
        mode: ExecutionMode,
        steps: Vec<Step>,
    ) -> Result<Self, PlanError> {
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.id.clone()) {
                return Err(PlanError::DuplicateStepId {
                    id: step.id.clone(),
                });
            }
        }

        // Graph validation is a hard precondition, not a per-step check
        resolver::resolve(&steps)?;

        Ok(Plan {
            id: Uuid::new_v4(),
            query: query.into(),
            mode,
            variables: HashMap::new(),
            steps,
            state: PlanState::new(),
        })
    }

    /// The documented default plan: a single step that hands the query to the
    /// echo executor. Used whenever planner output cannot be decoded.
    pub fn fallback(query: &str) -> Self {
        let step = Step::new("respond", query, "echo");
        Plan::new(query, ExecutionMode::Sequential, vec![step])
            .unwrap_or_else(|e| unreachable!("fallback plan is statically valid: {}", e))
    }

    /// Decode planner output into a plan.
    ///
    /// The JSON must decode fully against the plan schema (unknown fields
    /// rejected) and pass graph validation; anything less falls back to
    /// [`Plan::fallback`]. There is no partial decoding.
    pub fn decode_or_fallback(query: &str, json: &str) -> Self {
        match PlanConfig::from_json(json).and_then(|config| {
            config
                .to_plan()
                .map_err(|e| anyhow::anyhow!("invalid plan: {}", e))
        }) {
            Ok(mut plan) => {
                plan.query = query.to_string();
                plan
            }
            Err(e) => {
                tracing::warn!("planner output rejected ({}), using fallback plan", e);
                Plan::fallback(query)
            }
        }
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// IDs of steps that have completed, the set dependency gating runs on
    pub fn completed_ids(&self) -> HashSet<String> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .map(|s| s.id.clone())
            .collect()
    }

    // Derived counters, recomputed from the steps on every read

    pub fn completed_steps(&self) -> usize {
        self.count(StepStatus::Completed)
    }

    pub fn failed_steps(&self) -> usize {
        self.count(StepStatus::Failed)
    }

    pub fn skipped_steps(&self) -> usize {
        self.count(StepStatus::Skipped)
    }

    fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    /// True once every step reached a terminal status
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.is_terminal())
    }
}

//! Engine and plan configuration from YAML/JSON

use crate::core::plan::{ExecutionMode, Plan, PlanError};
use crate::core::step::{Step, StepDefaults};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Engine-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker pool size for parallel mode
    pub max_parallel: usize,

    /// Default per-step timeout (seconds)
    pub default_timeout_secs: u64,

    /// Default retry budget per step
    pub default_max_retries: usize,

    /// Capacity of the streaming-event channel
    pub event_capacity: usize,

    /// Capacity of the per-step executor progress channel
    pub progress_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel: 4,
            default_timeout_secs: 300,
            default_max_retries: 3,
            event_capacity: 256,
            progress_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Load engine configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn step_defaults(&self) -> StepDefaults {
        StepDefaults {
            max_retries: self.default_max_retries,
            timeout_secs: self.default_timeout_secs,
        }
    }
}

/// Top-level plan definition as loaded from YAML or planner JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanConfig {
    /// The originating request this plan answers
    pub query: String,

    /// Traversal mode
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Global variables available to all steps
    #[serde(default)]
    pub variables: HashMap<String, String>,

    /// Step definitions
    pub steps: Vec<StepConfig>,

    /// Retry budget applied to steps that do not override it
    #[serde(default)]
    pub max_retries: Option<usize>,

    /// Timeout applied to steps that do not override it (seconds)
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
}

/// Step definition as it appears in a plan file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    /// Unique step identifier
    pub id: String,

    /// Human-readable label; defaults to the id
    #[serde(default)]
    pub description: Option<String>,

    /// Instruction template handed to the executor
    pub task: String,

    /// Name of the executor to run this step
    pub executor: String,

    /// Step IDs this step depends on
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Retry budget override
    #[serde(default)]
    pub max_retries: Option<usize>,

    /// Timeout override (seconds)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl PlanConfig {
    /// Load a plan definition from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        Self::from_yaml(&content)
    }

    /// Parse a plan definition from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PlanConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Parse a plan definition from JSON. Unknown fields are rejected so a
    /// planner cannot smuggle in half-understood structures.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PlanConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Convert into the runtime plan, validating IDs and the graph
    pub fn to_plan(&self) -> Result<Plan, PlanError> {
        self.to_plan_with(&StepDefaults::default())
    }

    /// Convert into the runtime plan with engine-level step defaults.
    /// Precedence: step override > plan default > engine default.
    pub fn to_plan_with(&self, engine_defaults: &StepDefaults) -> Result<Plan, PlanError> {
        let defaults = StepDefaults {
            max_retries: self.max_retries.unwrap_or(engine_defaults.max_retries),
            timeout_secs: self
                .default_timeout_secs
                .unwrap_or(engine_defaults.timeout_secs),
        };

        let steps = self
            .steps
            .iter()
            .map(|config| Self::build_step(config, &defaults))
            .collect();

        let mut plan = Plan::new(self.query.clone(), self.mode, steps)?;
        plan.variables = self.variables.clone();
        Ok(plan)
    }

    fn build_step(config: &StepConfig, defaults: &StepDefaults) -> Step {
        let mut step = Step::new(
            config.id.as_str(),
            config.task.as_str(),
            config.executor.as_str(),
        )
        .with_depends_on(config.depends_on.iter().cloned())
        .with_max_retries(config.max_retries.unwrap_or(defaults.max_retries))
        .with_timeout_secs(config.timeout_secs.unwrap_or(defaults.timeout_secs));

        if let Some(description) = &config.description {
            step.description = description.clone();
        }

        step
    }
}

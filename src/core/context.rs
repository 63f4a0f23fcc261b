//! Execution context - variables and step outputs shared with executors

use crate::core::plan::Plan;
use crate::core::state::StepStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Context handed to an executor for one step invocation
///
/// Carries the plan's global variables, the outputs of completed steps, and
/// the id of the step being executed. Executors treat it as a read-only map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Global and user-defined variables
    pub variables: HashMap<String, String>,

    /// Outputs from completed steps (step id -> output)
    pub step_outputs: HashMap<String, String>,

    /// The step currently being executed
    pub current_step_id: Option<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the context for one step from the plan's current state
    pub fn for_step(plan: &Plan, step_id: &str) -> Self {
        let mut context = ExecutionContext::new();
        context.variables.extend(plan.variables.clone());

        for step in &plan.steps {
            if step.status == StepStatus::Completed {
                if let Some(output) = &step.output {
                    context
                        .step_outputs
                        .insert(step.id.clone(), output.clone());
                }
            }
        }

        context.current_step_id = Some(step_id.to_string());
        context
    }

    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn get_variable(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }

    /// All bindings available for task rendering: variables plus
    /// `steps.<id>.output` entries for completed steps.
    pub fn rendering_variables(&self) -> HashMap<String, String> {
        let mut vars = self.variables.clone();

        for (step_id, output) in &self.step_outputs {
            vars.insert(format!("steps.{}.output", step_id), output.clone());
        }

        if let Some(current) = &self.current_step_id {
            vars.insert("current_step".to_string(), current.clone());
        }

        vars
    }

    /// Substitute `{{ name }}` placeholders in a task template
    pub fn render(&self, template: &str) -> String {
        let mut rendered = template.to_string();
        for (key, value) in self.rendering_variables() {
            let placeholder = format!("{{{{ {} }}}}", key);
            rendered = rendered.replace(&placeholder, &value);
        }
        rendered
    }
}

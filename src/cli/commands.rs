//! CLI command definitions

use crate::core::plan::ExecutionMode;
use clap::Args;

/// Run a plan
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// The query to execute; without --plan/--plan-json this runs the
    /// single-step fallback plan
    pub query: Option<String>,

    /// Path to a plan definition YAML file
    #[arg(short, long)]
    pub plan: Option<String>,

    /// Planner output as a JSON string; falls back to the default plan if it
    /// does not decode cleanly
    #[arg(long)]
    pub plan_json: Option<String>,

    /// Override the plan's execution mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Override the worker pool size for parallel mode
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Don't save this execution to history
    #[arg(long)]
    pub no_history: bool,
}

/// Validate a plan definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to a plan definition YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output the parsed definition as JSON
    #[arg(long)]
    pub json: bool,
}

/// Show execution history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Number of recent executions to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show a specific execution ID
    #[arg(long)]
    pub execution_id: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Execution mode argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    Sequential,
    Parallel,
    Conditional,
}

impl From<ModeArg> for ExecutionMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Sequential => ExecutionMode::Sequential,
            ModeArg::Parallel => ExecutionMode::Parallel,
            ModeArg::Conditional => ExecutionMode::Conditional,
        }
    }
}

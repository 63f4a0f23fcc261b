//! stepflow - a plan execution engine for multi-agent workflows

pub mod cli;
pub mod core;
pub mod executor;
pub mod execution;
pub mod persistence;

// Re-export commonly used types
pub use core::{ExecutionContext, ExecutionMode, Plan, PlanError, PlanStatus, Step, StepStatus};
pub use executor::{Executor, ExecutorError, ExecutorEvent, ExecutorRegistry, ProgressSender};
pub use execution::{
    plan_succeeded, CancelToken, EngineError, EventKind, EventSink, EventStream, ExecutionEngine,
    StreamingEvent,
};

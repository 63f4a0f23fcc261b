//! Plan execution engine

pub mod cancel;
pub mod engine;
pub mod metrics;
pub mod runner;
pub mod stream;

pub use cancel::CancelToken;
pub use engine::{plan_succeeded, EngineError, ExecutionEngine};
pub use metrics::{ExecutionStats, StatsSnapshot};
pub use runner::StepRunner;
pub use stream::{EventKind, EventReceiver, EventSink, EventStream, StreamingEvent};

//! Execution statistics
//!
//! Counters updated by the engine, read-only to observers. Shared across
//! tasks, so everything is atomic.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters for plan executions
#[derive(Debug, Default)]
pub struct ExecutionStats {
    total: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    total_duration_ms: AtomicU64,
}

/// Point-in-time read of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub average_duration_ms: u64,
}

impl ExecutionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished plan execution. "Succeeded" means no step failed.
    pub fn record(&self, succeeded: bool, duration: Duration) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if succeeded {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let total_duration_ms = self.total_duration_ms.load(Ordering::Relaxed);
        StatsSnapshot {
            total,
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            average_duration_ms: if total == 0 { 0 } else { total_duration_ms / total },
        }
    }
}

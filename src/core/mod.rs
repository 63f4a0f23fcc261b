//! Core domain models for stepflow
//!
//! This module defines the fundamental data structures that represent
//! plans, steps, and their configuration, plus the pure dependency resolver.

pub mod config;
pub mod context;
pub mod plan;
pub mod resolver;
pub mod state;
pub mod step;

pub use context::*;
pub use plan::*;
pub use state::*;
pub use step::*;

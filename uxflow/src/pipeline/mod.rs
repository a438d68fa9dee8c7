//! Pipeline execution.
//!
//! This module provides:
//! - [`Orchestrator`]: shared, immutable entry point
//! - [`PipelineRun`]: one prepared run with its own progress and cancellation

mod orchestrator;

#[cfg(test)]
mod integration_tests;

pub use orchestrator::{Orchestrator, PipelineRun};

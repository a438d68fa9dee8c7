//! Testing utilities for uxflow pipelines.
//!
//! This module provides a scripted [`crate::api::ComputeApi`] so stage
//! drivers and whole runs can be exercised without a network.

mod mocks;

pub use mocks::{Method, RecordedCall, Reply, ScriptedComputeApi};

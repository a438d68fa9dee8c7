//! Core domain model types for uxflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Job status, resource kind and pipeline stage enums
//! - The source artifact handed to the pipeline
//! - Build and task records
//! - Values produced by each stage

mod artifact;
mod job;
mod output;
mod status;

pub use artifact::{DataSource, DataSourceType, Language, SourceArtifact, TraceVariable};
pub use job::{Build, BuildId, Task, TaskId};
pub use output::{BuildResult, PlotResult, RawOutput, TaskOutput, UncertainValueToken};
pub use status::{JobStatus, PipelineStage, ResourceKind, RunPhase};

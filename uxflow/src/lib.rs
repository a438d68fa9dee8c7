//! # Uxflow
//!
//! Runs a program on a remote uncertainty-tracking compute service and turns
//! its uncertain output into a plot.
//!
//! A run moves through four stages:
//!
//! - **Build**: submit source code and poll the compilation job
//! - **Task**: execute the completed build and poll the execution job
//! - **Extract**: pull the `Ux`-prefixed uncertain value out of stdout
//! - **Plot**: exchange that value for a presigned plot URL
//!
//! Each run owns its context (run id, progress channel, cancellation token),
//! so one [`pipeline::Orchestrator`] can drive many runs concurrently.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use uxflow::prelude::*;
//!
//! let orchestrator = Orchestrator::from_config(PipelineConfig::from_env()?)?;
//! let artifact = SourceArtifact::new(code, Language::C).with_arguments("100 0.9 1.1");
//!
//! let run = orchestrator.prepare();
//! let mut progress = run.subscribe();
//! let plot = run.execute(&artifact).await?;
//! println!("{}", plot.presigned_url);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod api;
pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod extract;
pub mod observability;
pub mod pipeline;
pub mod poll;
pub mod progress;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::api::{ApiResponse, ComputeApi, ComputeClient, Endpoints};
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{ApiKey, PipelineConfig};
    pub use crate::context::RunContext;
    pub use crate::core::{
        Build, BuildId, DataSource, DataSourceType, JobStatus, Language, PipelineStage,
        PlotResult, RawOutput, ResourceKind, RunPhase, SourceArtifact, Task, TaskId,
        TraceVariable, UncertainValueToken,
    };
    pub use crate::errors::{ApiError, FailureReport, StageFailure, UxflowError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::extract::extract;
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::pipeline::{Orchestrator, PipelineRun};
    pub use crate::poll::{PollConfig, Poller};
    pub use crate::progress::{ProgressReporter, RunProgress};
    pub use crate::stages::{fetch_task_stdout, request_plot, run_build, run_task, StageDriver};
}

//! Event sink system for observability.
//!
//! The orchestrator reports every stage transition, job status change and
//! diagnostic fault to an [`EventSink`]. The default sink mirrors events to
//! `tracing`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A run started.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// A run produced a plot URL.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// A run stopped on a stage failure, cancellation or timeout.
pub const PIPELINE_FAILED: &str = "pipeline.failed";
/// A stage started.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage finished successfully.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// A stage failed.
pub const STAGE_FAILED: &str = "stage.failed";
/// A polled job reported a status.
pub const JOB_STATUS: &str = "job.status";
/// A diagnostic fetch failed without failing the run.
pub const DIAGNOSTIC: &str = "diagnostic";

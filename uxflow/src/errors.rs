//! Error types for the uxflow pipeline.
//!
//! Errors are split in three layers:
//!
//! - [`ApiError`]: a single remote call failed at the transport level.
//! - [`UxflowError`]: a stage could not produce its result.
//! - [`StageFailure`]: what the orchestrator hands back, naming the stage.
//!
//! Diagnostic fetches (build logs, stderr) never produce any of these; they
//! are reported through [`crate::progress::RunProgress::diagnostics`].

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::core::{JobStatus, PipelineStage, ResourceKind};

/// A failure of a single HTTP exchange with the remote service.
///
/// Every variant is a transient I/O fault: the caller decides whether to
/// retry (the poller does) or abort the stage (everyone else does).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the JSON shape we expected.
    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode {
        /// The endpoint that returned the body.
        endpoint: String,
        /// Decoder message.
        message: String,
    },

    /// The endpoint could not be turned into a URL.
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    /// The remote answered with a non-success status code.
    #[error("Unexpected HTTP status {status} from {endpoint}")]
    Status {
        /// The endpoint that was called.
        endpoint: String,
        /// The HTTP status code.
        status: u16,
        /// The raw body, kept for diagnostics.
        body: String,
    },
}

impl ApiError {
    /// Creates a decode error.
    #[must_use]
    pub fn decode(endpoint: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Creates a status error.
    #[must_use]
    pub fn status(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        }
    }
}

/// The main error type for pipeline stages.
#[derive(Debug, Error)]
pub enum UxflowError {
    /// The remote accepted the call but returned no job identifier.
    #[error("{kind} submission rejected: {reason}")]
    SubmissionRejected {
        /// Which job was being created.
        kind: ResourceKind,
        /// Why the submission is considered rejected.
        reason: String,
    },

    /// The build reached a terminal status other than `Completed`.
    #[error("Build did not complete, terminal status: {0}")]
    BuildNotCompleted(JobStatus),

    /// The task reached a terminal status other than `Completed`.
    #[error("Task did not complete, terminal status: {0}")]
    TaskNotCompleted(JobStatus),

    /// The task completed but no stdout reference was returned.
    #[error("Task completed without a stdout reference")]
    NoStdout,

    /// The task output was empty.
    #[error("Cannot extract a payload from empty output")]
    EmptyOutput,

    /// The task output does not contain the uncertain-value marker.
    #[error("Uncertain-value marker '{marker}' not found in output")]
    MarkerNotFound {
        /// The marker that was searched for.
        marker: &'static str,
    },

    /// The plotting service did not return a presigned URL.
    #[error("Plot service error: {0}")]
    PlotServiceError(String),

    /// A single remote call failed.
    #[error("Transient I/O fault: {0}")]
    Transport(#[from] ApiError),

    /// The poller gave up before the job reached a terminal status.
    #[error("{kind} polling timed out after {iterations} queries (last status: {last_status})")]
    PollTimeout {
        /// The resource being polled.
        kind: ResourceKind,
        /// Number of status queries issued.
        iterations: usize,
        /// Status observed last.
        last_status: JobStatus,
    },

    /// The run was cancelled by the caller.
    #[error("Run cancelled: {0}")]
    Cancelled(String),

    /// The whole run exceeded its time budget.
    #[error("Run exceeded its timeout of {}s", .0.as_secs())]
    RunTimeout(Duration),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl UxflowError {
    /// Creates a submission rejected error.
    #[must_use]
    pub fn rejected(kind: ResourceKind, reason: impl Into<String>) -> Self {
        Self::SubmissionRejected {
            kind,
            reason: reason.into(),
        }
    }

    /// Returns true for per-call faults that a poller may absorb.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if the error represents caller-requested cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::SubmissionRejected { .. } => "SUBMISSION_REJECTED",
            Self::BuildNotCompleted(_) => "BUILD_NOT_COMPLETED",
            Self::TaskNotCompleted(_) => "TASK_NOT_COMPLETED",
            Self::NoStdout => "NO_STDOUT",
            Self::EmptyOutput => "EMPTY_OUTPUT",
            Self::MarkerNotFound { .. } => "MARKER_NOT_FOUND",
            Self::PlotServiceError(_) => "PLOT_SERVICE_ERROR",
            Self::Transport(_) => "TRANSIENT_IO_FAULT",
            Self::PollTimeout { .. } => "POLL_TIMEOUT",
            Self::Cancelled(_) => "CANCELLED",
            Self::RunTimeout(_) => "RUN_TIMEOUT",
            Self::Config(_) => "CONFIG",
        }
    }
}

/// A pipeline failure attributed to the stage that produced it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageFailure {
    /// The stage that was running.
    pub stage: PipelineStage,
    /// The underlying error.
    #[source]
    pub source: UxflowError,
}

impl StageFailure {
    /// Creates a new stage failure.
    #[must_use]
    pub fn new(stage: PipelineStage, source: UxflowError) -> Self {
        Self { stage, source }
    }

    /// Returns true if the run ended because the caller cancelled it.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.source.is_cancelled()
    }

    /// Converts to a serializable report.
    #[must_use]
    pub fn report(&self) -> FailureReport {
        FailureReport {
            stage: self.stage,
            code: self.source.code().to_string(),
            message: self.source.to_string(),
        }
    }
}

/// User-facing summary of a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    /// The failing stage.
    pub stage: PipelineStage,
    /// Stable error code.
    pub code: String,
    /// Human readable reason.
    pub message: String,
}

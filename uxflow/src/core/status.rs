//! Job status, resource kind and pipeline stage enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The status of a remote build or task, as reported by the compute service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// The job record exists but has not been queued yet.
    Initialising,
    /// The job was accepted and is queued.
    Accepted,
    /// The job is being compiled.
    Building,
    /// The job is executing.
    #[serde(rename = "In Progress")]
    InProgress,
    /// The job finished successfully.
    Completed,
    /// The job was cancelled remotely.
    Cancelled,
    /// The job was stopped remotely.
    Stopped,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Accepted
    }
}

impl JobStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Initialising,
        Self::Accepted,
        Self::Building,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::Stopped,
    ];

    /// Returns true if no further transition can occur.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Stopped)
    }

    /// Returns true if the job finished successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// The wire representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialising => "Initialising",
            Self::Accepted => "Accepted",
            Self::Building => "Building",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown job status '{s}'"))
    }
}

/// The kind of remote resource being created or polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A compilation job.
    Build,
    /// An execution job.
    Task,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Task => write!(f, "task"),
        }
    }
}

/// The stages of one orchestration run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Submitting and waiting for the build.
    Build,
    /// Submitting and waiting for the task, then reading its stdout.
    Task,
    /// Isolating the uncertain-value token from stdout.
    Extract,
    /// Requesting the plot.
    Plot,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Task => write!(f, "task"),
            Self::Extract => write!(f, "extract"),
            Self::Plot => write!(f, "plot"),
        }
    }
}

/// Coarse lifecycle of a run, for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// The run was prepared but not started.
    #[default]
    Pending,
    /// A stage is executing.
    Running,
    /// A plot URL was obtained.
    Completed,
    /// A stage failed.
    Failed,
    /// The caller cancelled the run.
    Cancelled,
}

impl RunPhase {
    /// Returns true once the run has finished, whatever the outcome.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

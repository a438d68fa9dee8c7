//! Wire types exchanged with the compute and plotting services.

use serde::{Deserialize, Serialize};

use crate::core::{DataSource, JobStatus, Language, SourceArtifact, TraceVariable};

/// Body of a build creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BuildRequest {
    /// Program text.
    pub code: String,
    /// Source language.
    pub language: Language,
    /// Default task arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    /// Compute core.
    #[serde(rename = "CoreID", skip_serializing_if = "Option::is_none")]
    pub core_id: Option<String>,
    /// Traced variables.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace_variables: Vec<TraceVariable>,
    /// Default data sources.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_sources: Vec<DataSource>,
}

impl BuildRequest {
    /// Builds the request body for an artifact.
    ///
    /// The artifact's core selector wins over `default_core_id`.
    #[must_use]
    pub fn from_artifact(artifact: &SourceArtifact, default_core_id: Option<&str>) -> Self {
        Self {
            code: artifact.code.clone(),
            language: artifact.language,
            arguments: artifact.arguments.clone(),
            core_id: artifact
                .core_id
                .clone()
                .or_else(|| default_core_id.map(str::to_string)),
            trace_variables: artifact.trace_variables.clone(),
            data_sources: artifact.data_sources.clone(),
        }
    }
}

/// Response to a build creation request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildCreated {
    /// Assigned build id.
    #[serde(rename = "BuildID", default)]
    pub build_id: Option<String>,
    /// Initial status, kept as text so an unknown value does not hide the id.
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

/// Response to a task creation request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskCreated {
    /// Assigned task id.
    #[serde(rename = "TaskID", default)]
    pub task_id: Option<String>,
    /// Initial status.
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

/// Response to a status query.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    /// Current job status.
    #[serde(rename = "Status")]
    pub status: JobStatus,
}

/// Output references of a build.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildOutputs {
    /// Build log URL.
    #[serde(rename = "Build", default)]
    pub build: Option<String>,
}

/// Output references of a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskOutputs {
    /// Stdout URL.
    #[serde(rename = "Stdout", default)]
    pub stdout: Option<String>,
    /// Stderr URL.
    #[serde(rename = "Stderr", default)]
    pub stderr: Option<String>,
}

/// Body of a plot request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlotRequest {
    /// The uncertain-value token.
    pub payload: String,
}

/// Response of the plotting service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlotResponse {
    /// Presigned URL of the rendered plot.
    #[serde(rename = "presignedURL", default)]
    pub presigned_url: Option<String>,
}

/// Returns the value if it is present and not blank.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parses an initial status, falling back to `Accepted`.
pub(crate) fn initial_status(value: Option<&str>) -> JobStatus {
    value
        .and_then(|s| s.parse().ok())
        .unwrap_or(JobStatus::Accepted)
}

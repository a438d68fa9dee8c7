//! Values produced along the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::job::{Build, Task};

/// Text read from a task's stdout reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawOutput(String);

impl RawOutput {
    /// Wraps decoded stdout text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Returns the text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if there is no output.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The marker-prefixed uncertain value embedded in program output.
///
/// Only [`crate::extract::extract`] constructs tokens, so a token always
/// starts with the marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UncertainValueToken(String);

impl UncertainValueToken {
    pub(crate) fn new(token: String) -> Self {
        Self(token)
    }

    /// Returns the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UncertainValueToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of a rendered plot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotResult {
    /// Time-limited, authorization-free URL of the plot image.
    pub presigned_url: String,
}

/// Result of the build stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// The completed build.
    pub build: Build,
    /// Build log text, when it could be retrieved.
    pub log: Option<String>,
}

/// Result of the task stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    /// The completed task.
    pub task: Task,
    /// Program stdout.
    pub stdout: RawOutput,
    /// Program stderr, when it could be retrieved.
    pub stderr: Option<String>,
}

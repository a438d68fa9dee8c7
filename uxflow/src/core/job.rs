//! Remote build and task records.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::status::JobStatus;
use crate::errors::UxflowError;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a remote identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_type!(
    /// Identifier assigned by the compute service to a build.
    BuildId
);
id_type!(
    /// Identifier assigned by the compute service to a task.
    TaskId
);

/// A compilation job.
///
/// Created without an identifier; the identifier and the initial status
/// arrive with the submission response. Once terminal the record no longer
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    /// Remote identifier, absent before acceptance.
    pub id: Option<BuildId>,
    /// Last known status.
    pub status: JobStatus,
    /// Build log URL, if the service reported one.
    pub log_url: Option<String>,
}

impl Default for Build {
    fn default() -> Self {
        Self::new()
    }
}

impl Build {
    /// Creates an unsubmitted build.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: None,
            status: JobStatus::Initialising,
            log_url: None,
        }
    }

    /// Records the submission response.
    pub fn accept(&mut self, id: BuildId, status: JobStatus) {
        self.id = Some(id);
        self.status = status;
    }

    /// Records a polled status. Ignored once the build is terminal.
    pub fn observe(&mut self, status: JobStatus) {
        if !self.status.is_terminal() {
            self.status = status;
        }
    }

    /// Returns true if the build completed successfully.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.is_success()
    }
}

/// An execution job bound to exactly one completed build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Parent build.
    pub build_id: BuildId,
    /// Remote identifier, absent before acceptance.
    pub id: Option<TaskId>,
    /// Last known status.
    pub status: JobStatus,
    /// Stdout URL, populated after the task is terminal.
    pub stdout_url: Option<String>,
    /// Stderr URL, populated after the task is terminal.
    pub stderr_url: Option<String>,
}

impl Task {
    /// Creates a task for a build.
    ///
    /// Fails unless the build has been accepted and is `Completed`.
    pub fn for_build(build: &Build) -> Result<Self, UxflowError> {
        match (&build.id, build.is_completed()) {
            (Some(build_id), true) => Ok(Self {
                build_id: build_id.clone(),
                id: None,
                status: JobStatus::Initialising,
                stdout_url: None,
                stderr_url: None,
            }),
            _ => Err(UxflowError::BuildNotCompleted(build.status)),
        }
    }

    /// Records the submission response.
    pub fn accept(&mut self, id: TaskId, status: JobStatus) {
        self.id = Some(id);
        self.status = status;
    }

    /// Records a polled status. Ignored once the task is terminal.
    pub fn observe(&mut self, status: JobStatus) {
        if !self.status.is_terminal() {
            self.status = status;
        }
    }
}

//! Endpoint paths of the compute and plotting services.

use serde::{Deserialize, Serialize};

use crate::core::{BuildId, TaskId};

/// Paths used by the pipeline, relative to the compute service base URL.
///
/// Any entry may instead be an absolute URL, which is how a plotting service
/// hosted elsewhere is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Build creation path.
    #[serde(default = "default_create_build")]
    pub create_build: String,
    /// Collection path for builds.
    #[serde(default = "default_builds")]
    pub builds: String,
    /// Collection path for tasks.
    #[serde(default = "default_tasks")]
    pub tasks: String,
    /// Plot path.
    #[serde(default = "default_plot")]
    pub plot: String,
}

fn default_create_build() -> String {
    "/sourcecode/builds".to_string()
}

fn default_builds() -> String {
    "/builds".to_string()
}

fn default_tasks() -> String {
    "/tasks".to_string()
}

fn default_plot() -> String {
    "/plot".to_string()
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            create_build: default_create_build(),
            builds: default_builds(),
            tasks: default_tasks(),
            plot: default_plot(),
        }
    }
}

impl Endpoints {
    /// `GET` path for a build's status.
    #[must_use]
    pub fn build_status(&self, id: &BuildId) -> String {
        format!("{}/{id}", self.builds)
    }

    /// `GET` path for a build's output references.
    #[must_use]
    pub fn build_outputs(&self, id: &BuildId) -> String {
        format!("{}/{id}/outputs", self.builds)
    }

    /// `POST` path creating a task from a build.
    #[must_use]
    pub fn create_task(&self, id: &BuildId) -> String {
        format!("{}/{id}/tasks", self.builds)
    }

    /// `GET` path for a task's status.
    #[must_use]
    pub fn task_status(&self, id: &TaskId) -> String {
        format!("{}/{id}", self.tasks)
    }

    /// `GET` path for a task's unsanitized output references.
    #[must_use]
    pub fn task_outputs(&self, id: &TaskId) -> String {
        format!("{}/{id}/outputs?sanitized=false", self.tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let endpoints = Endpoints::default();
        let build = BuildId::new("bld_1");
        let task = TaskId::new("tsk_1");

        assert_eq!(endpoints.create_build, "/sourcecode/builds");
        assert_eq!(endpoints.build_status(&build), "/builds/bld_1");
        assert_eq!(endpoints.build_outputs(&build), "/builds/bld_1/outputs");
        assert_eq!(endpoints.create_task(&build), "/builds/bld_1/tasks");
        assert_eq!(endpoints.task_status(&task), "/tasks/tsk_1");
        assert_eq!(endpoints.task_outputs(&task), "/tasks/tsk_1/outputs?sanitized=false");
        assert_eq!(endpoints.plot, "/plot");
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let endpoints: Endpoints =
            serde_json::from_str(r#"{"plot": "https://plots.example.com/plot"}"#).unwrap();
        assert_eq!(endpoints.plot, "https://plots.example.com/plot");
        assert_eq!(endpoints.builds, "/builds");
    }
}

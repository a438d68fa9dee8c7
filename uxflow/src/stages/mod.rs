//! Stage drivers and their trait.
//!
//! Each driver turns the output of the previous stage into the input of the
//! next one:
//!
//! - [`BuildStage`]: source artifact to completed build
//! - [`TaskStage`]: completed build to raw stdout
//! - [`TaskOutputStage`]: known task id to raw stdout, for replotting
//! - [`ExtractStage`]: raw stdout to uncertain-value token
//! - [`PlotStage`]: token to presigned plot URL
//!
//! The free functions ([`run_build`], [`run_task`], [`fetch_task_stdout`],
//! [`request_plot`]) are the drivers' bodies and can be called directly with
//! a [`RunContext`].

mod build;
mod extract;
mod plot;
mod task;

pub use build::{run_build, BuildStage};
pub use extract::ExtractStage;
pub use plot::{request_plot, PlotStage};
pub use task::{fetch_task_stdout, run_task, TaskOutputStage, TaskStage};

use async_trait::async_trait;
use std::fmt::Debug;

use crate::api::models::StatusResponse;
use crate::api::ComputeApi;
use crate::context::RunContext;
use crate::core::{JobStatus, PipelineStage};
use crate::errors::UxflowError;

/// A single step of the pipeline.
#[async_trait]
pub trait StageDriver: Send + Sync + Debug {
    /// What the stage consumes.
    type Input: Send + Sync;
    /// What the stage produces.
    type Output: Send;

    /// The stage this driver implements.
    fn stage(&self) -> PipelineStage;

    /// Runs the stage.
    async fn run(&self, ctx: &RunContext, input: &Self::Input) -> Result<Self::Output, UxflowError>;
}

/// One status query against a build or task status endpoint.
pub(crate) async fn query_status(api: &dyn ComputeApi, endpoint: &str) -> Result<JobStatus, UxflowError> {
    let response = api.fetch(endpoint).await?;
    let body: StatusResponse = response.success_json(endpoint)?;
    Ok(body.status)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::PipelineConfig;
    use crate::context::RunContext;
    use crate::events::CollectingEventSink;
    use crate::poll::PollConfig;
    use crate::testing::ScriptedComputeApi;

    pub(crate) fn fast_config() -> PipelineConfig {
        PipelineConfig::new("test-key").with_poll(
            PollConfig::new()
                .with_interval(Duration::from_millis(1))
                .with_max_iterations(Some(20)),
        )
    }

    pub(crate) fn context(api: ScriptedComputeApi) -> (Arc<ScriptedComputeApi>, Arc<CollectingEventSink>, RunContext) {
        let api = Arc::new(api);
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = RunContext::new(api.clone(), &fast_config(), sink.clone());
        (api, sink, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiError;
    use crate::testing::{Reply, ScriptedComputeApi};

    #[tokio::test]
    async fn test_query_status_decodes_wire_value() {
        let api = ScriptedComputeApi::new().on_status_sequence("/tasks/t1", &["In Progress"]);
        let status = query_status(&api, "/tasks/t1").await.unwrap();
        assert_eq!(status, JobStatus::InProgress);
    }

    #[tokio::test]
    async fn test_query_status_faults_are_transient() {
        let api = ScriptedComputeApi::new()
            .on_fetch("/tasks/t1", Reply::status(502, "bad gateway"))
            .on_fetch("/tasks/t2", Reply::json(serde_json::json!({"Status": "Queued"})));

        let bad_status = query_status(&api, "/tasks/t1").await.unwrap_err();
        assert!(matches!(
            bad_status,
            UxflowError::Transport(ApiError::Status { status: 502, .. })
        ));

        let unknown = query_status(&api, "/tasks/t2").await.unwrap_err();
        assert!(unknown.is_transient());
    }
}

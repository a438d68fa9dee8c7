//! Build stage: submit source, wait for compilation.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{query_status, StageDriver};
use crate::api::models::{initial_status, non_empty, BuildCreated, BuildOutputs, BuildRequest};
use crate::context::RunContext;
use crate::core::{Build, BuildId, BuildResult, PipelineStage, ResourceKind, SourceArtifact};
use crate::errors::{ApiError, UxflowError};

/// Drives a source artifact to a completed build.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildStage;

#[async_trait]
impl StageDriver for BuildStage {
    type Input = SourceArtifact;
    type Output = BuildResult;

    fn stage(&self) -> PipelineStage {
        PipelineStage::Build
    }

    async fn run(&self, ctx: &RunContext, input: &SourceArtifact) -> Result<BuildResult, UxflowError> {
        run_build(ctx, input).await
    }
}

/// Submits a build and polls it to a terminal status.
///
/// Fails with `SubmissionRejected` when the service does not hand back a
/// build id, and with `BuildNotCompleted` when the build ends in any terminal
/// status other than `Completed`. The build log is fetched on a best-effort
/// basis once the build is terminal.
pub async fn run_build(ctx: &RunContext, artifact: &SourceArtifact) -> Result<BuildResult, UxflowError> {
    let endpoint = ctx.endpoints().create_build.as_str();
    let request = BuildRequest::from_artifact(artifact, ctx.default_core_id());
    let body = serde_json::to_value(&request).map_err(|e| ApiError::decode(endpoint, e))?;

    info!(
        run_id = %ctx.run_id(),
        language = %request.language,
        core_id = request.core_id.as_deref().unwrap_or("default"),
        "Submitting build"
    );
    let response = ctx.api().submit(endpoint, &body).await?;
    if !response.is_success() {
        return Err(UxflowError::rejected(
            ResourceKind::Build,
            format!("HTTP {}: {}", response.status, response.body),
        ));
    }
    let created: BuildCreated = response
        .json(endpoint)
        .map_err(|e| UxflowError::rejected(ResourceKind::Build, e.to_string()))?;
    let Some(raw_id) = non_empty(created.build_id) else {
        return Err(UxflowError::rejected(ResourceKind::Build, "response carried no BuildID"));
    };

    let id = BuildId::new(raw_id);
    let mut build = Build::new();
    build.accept(id.clone(), initial_status(created.status.as_deref()));
    info!(run_id = %ctx.run_id(), build_id = %id, status = %build.status, "Build accepted");

    ctx.progress().update(|p| p.build_id = Some(id.to_string()));
    ctx.report_status(ResourceKind::Build, id.as_str(), build.status, 0);

    let status_endpoint = ctx.endpoints().build_status(&id);
    let outcome = ctx
        .poller()
        .run(
            ResourceKind::Build,
            id.as_str(),
            build.status,
            || query_status(ctx.api(), &status_endpoint),
            |status, iterations| ctx.report_status(ResourceKind::Build, id.as_str(), status, iterations),
        )
        .await?;
    build.observe(outcome.status);
    info!(
        run_id = %ctx.run_id(),
        build_id = %id,
        status = %build.status,
        polls = outcome.iterations,
        "Build in terminal state"
    );

    let log = fetch_build_log(ctx, &mut build, &id).await;

    if !build.is_completed() {
        return Err(UxflowError::BuildNotCompleted(build.status));
    }
    Ok(BuildResult { build, log })
}

/// Retrieves the build log. Every failure is a diagnostic.
async fn fetch_build_log(ctx: &RunContext, build: &mut Build, id: &BuildId) -> Option<String> {
    let endpoint = ctx.endpoints().build_outputs(id);
    let outputs = match ctx.api().fetch(&endpoint).await {
        Ok(response) => response.success_json::<BuildOutputs>(&endpoint),
        Err(e) => Err(e),
    };
    let outputs = match outputs {
        Ok(outputs) => outputs,
        Err(e) => {
            ctx.diagnostic(PipelineStage::Build, format!("build outputs unavailable: {e}"));
            return None;
        }
    };

    let Some(url) = non_empty(outputs.build) else {
        debug!(run_id = %ctx.run_id(), build_id = %id, "No build log reference");
        return None;
    };
    build.log_url = Some(url.clone());

    match ctx.api().fetch_raw(&url).await {
        Ok(text) => {
            debug!(run_id = %ctx.run_id(), build_id = %id, bytes = text.len(), "Fetched build log");
            Some(text)
        }
        Err(e) => {
            ctx.diagnostic(PipelineStage::Build, format!("build log unavailable: {e}"));
            None
        }
    }
}

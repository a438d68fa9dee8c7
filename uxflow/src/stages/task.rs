//! Task stage: execute a completed build and read its stdout.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{query_status, StageDriver};
use crate::api::models::{initial_status, non_empty, TaskCreated, TaskOutputs};
use crate::context::RunContext;
use crate::core::{Build, PipelineStage, RawOutput, ResourceKind, Task, TaskId, TaskOutput};
use crate::errors::UxflowError;

/// Drives a completed build to the stdout of one task.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStage;

#[async_trait]
impl StageDriver for TaskStage {
    type Input = Build;
    type Output = TaskOutput;

    fn stage(&self) -> PipelineStage {
        PipelineStage::Task
    }

    async fn run(&self, ctx: &RunContext, input: &Build) -> Result<TaskOutput, UxflowError> {
        run_task(ctx, input).await
    }
}

/// Creates a task from a completed build, polls it and fetches its stdout.
///
/// Nothing is sent for a build that is not `Completed`.
pub async fn run_task(ctx: &RunContext, build: &Build) -> Result<TaskOutput, UxflowError> {
    let mut task = Task::for_build(build)?;
    let endpoint = ctx.endpoints().create_task(&task.build_id);

    info!(run_id = %ctx.run_id(), build_id = %task.build_id, "Submitting task");
    let response = ctx.api().submit(&endpoint, &serde_json::json!({})).await?;
    if !response.is_success() {
        return Err(UxflowError::rejected(
            ResourceKind::Task,
            format!("HTTP {}: {}", response.status, response.body),
        ));
    }
    let created: TaskCreated = response
        .json(&endpoint)
        .map_err(|e| UxflowError::rejected(ResourceKind::Task, e.to_string()))?;
    let Some(raw_id) = non_empty(created.task_id) else {
        return Err(UxflowError::rejected(ResourceKind::Task, "response carried no TaskID"));
    };

    let id = TaskId::new(raw_id);
    task.accept(id.clone(), initial_status(created.status.as_deref()));
    info!(run_id = %ctx.run_id(), task_id = %id, status = %task.status, "Task accepted");

    ctx.progress().update(|p| p.task_id = Some(id.to_string()));
    ctx.report_status(ResourceKind::Task, id.as_str(), task.status, 0);

    let status_endpoint = ctx.endpoints().task_status(&id);
    let outcome = ctx
        .poller()
        .run(
            ResourceKind::Task,
            id.as_str(),
            task.status,
            || query_status(ctx.api(), &status_endpoint),
            |status, iterations| ctx.report_status(ResourceKind::Task, id.as_str(), status, iterations),
        )
        .await?;
    task.observe(outcome.status);
    info!(
        run_id = %ctx.run_id(),
        task_id = %id,
        status = %task.status,
        polls = outcome.iterations,
        "Task in terminal state"
    );

    if !task.status.is_success() {
        return Err(UxflowError::TaskNotCompleted(task.status));
    }

    let (stdout_url, stderr_url) = output_urls(ctx, &id).await?;
    task.stdout_url = stdout_url;
    task.stderr_url = stderr_url;

    let stdout = read_stdout(ctx, &id, task.stdout_url.as_deref()).await?;
    let stderr = fetch_stderr(ctx, task.stderr_url.as_deref()).await;
    Ok(TaskOutput { task, stdout, stderr })
}

/// Reads the stdout of a task that already ran.
///
/// Nothing is submitted or polled, so a task left behind by a timed out or
/// cancelled run can still be plotted.
pub async fn fetch_task_stdout(ctx: &RunContext, id: &TaskId) -> Result<RawOutput, UxflowError> {
    let (stdout_url, _) = output_urls(ctx, id).await?;
    read_stdout(ctx, id, stdout_url.as_deref()).await
}

/// Drives a known task id to its stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskOutputStage;

#[async_trait]
impl StageDriver for TaskOutputStage {
    type Input = TaskId;
    type Output = RawOutput;

    fn stage(&self) -> PipelineStage {
        PipelineStage::Task
    }

    async fn run(&self, ctx: &RunContext, input: &TaskId) -> Result<RawOutput, UxflowError> {
        fetch_task_stdout(ctx, input).await
    }
}

async fn output_urls(ctx: &RunContext, id: &TaskId) -> Result<(Option<String>, Option<String>), UxflowError> {
    let endpoint = ctx.endpoints().task_outputs(id);
    let outputs: TaskOutputs = ctx.api().fetch(&endpoint).await?.success_json(&endpoint)?;
    Ok((non_empty(outputs.stdout), non_empty(outputs.stderr)))
}

async fn read_stdout(ctx: &RunContext, id: &TaskId, url: Option<&str>) -> Result<RawOutput, UxflowError> {
    let Some(url) = url else {
        return Err(UxflowError::NoStdout);
    };
    let stdout = RawOutput::new(ctx.api().fetch_raw(url).await?);
    debug!(run_id = %ctx.run_id(), task_id = %id, bytes = stdout.as_str().len(), "Fetched stdout");
    Ok(stdout)
}

async fn fetch_stderr(ctx: &RunContext, url: Option<&str>) -> Option<String> {
    match ctx.api().fetch_raw(url?).await {
        Ok(text) => Some(text),
        Err(e) => {
            ctx.diagnostic(PipelineStage::Task, format!("stderr unavailable: {e}"));
            None
        }
    }
}

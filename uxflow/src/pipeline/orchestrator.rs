//! Sequencing of the four stages.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::api::{ComputeApi, ComputeClient};
use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::core::{PipelineStage, PlotResult, RunPhase, SourceArtifact, TaskId};
use crate::errors::{StageFailure, UxflowError};
use crate::events::{self, EventSink, LoggingEventSink};
use crate::observability::{run_payload, stage_payload, SpanTimer};
use crate::progress::RunProgress;
use crate::stages::{BuildStage, ExtractStage, PlotStage, StageDriver, TaskOutputStage, TaskStage};

/// Runs source artifacts through Build, Task, Extract and Plot.
///
/// An orchestrator holds no per-run state and can be shared across
/// concurrent runs behind an `Arc`.
#[derive(Clone)]
pub struct Orchestrator {
    api: Arc<dyn ComputeApi>,
    config: PipelineConfig,
    sink: Arc<dyn EventSink>,
}

impl Orchestrator {
    /// Creates an orchestrator over any [`ComputeApi`].
    #[must_use]
    pub fn new(api: Arc<dyn ComputeApi>, config: PipelineConfig) -> Self {
        Self {
            api,
            config,
            sink: Arc::new(LoggingEventSink::debug()),
        }
    }

    /// Creates an orchestrator talking HTTP to the configured service.
    pub fn from_config(config: PipelineConfig) -> Result<Self, UxflowError> {
        config.validate()?;
        let client = ComputeClient::from_config(&config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Creates a run with its own id, cancellation token and progress channel.
    #[must_use]
    pub fn prepare(&self) -> PipelineRun {
        PipelineRun {
            ctx: RunContext::new(Arc::clone(&self.api), &self.config, Arc::clone(&self.sink)),
            run_timeout: self.config.run_timeout(),
        }
    }

    /// Runs an artifact to a plot URL.
    pub async fn submit_and_run(&self, artifact: &SourceArtifact) -> Result<PlotResult, StageFailure> {
        self.prepare().execute(artifact).await
    }

    /// Plots the output of an existing task.
    pub async fn replot(&self, task_id: &TaskId) -> Result<PlotResult, StageFailure> {
        self.prepare().replot(task_id).await
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A single prepared run.
#[derive(Debug)]
pub struct PipelineRun {
    ctx: RunContext,
    run_timeout: Duration,
}

impl PipelineRun {
    /// Run identifier.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.ctx.run_id()
    }

    /// Token that cancels this run.
    #[must_use]
    pub fn cancel_token(&self) -> Arc<CancellationToken> {
        Arc::clone(self.ctx.cancel_token())
    }

    /// Receiver observing every progress update of this run.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RunProgress> {
        self.ctx.progress().subscribe()
    }

    /// Current progress.
    #[must_use]
    pub fn progress(&self) -> RunProgress {
        self.ctx.progress().snapshot()
    }

    /// Executes the run.
    ///
    /// The first failing stage ends the run. Cancellation and the run
    /// timeout are attributed to the stage that was executing.
    pub async fn execute(self, artifact: &SourceArtifact) -> Result<PlotResult, StageFailure> {
        let span = info_span!("pipeline_run", run_id = %self.ctx.run_id());
        async {
            info!(language = %artifact.language, "Pipeline started");
            self.drive(PipelineStage::Build, self.run_stages(artifact)).await
        }
        .instrument(span)
        .await
    }

    /// Plots the output of a task that already ran.
    ///
    /// Skips Build and task submission: the task's stdout is read, then
    /// Extract and Plot run as usual.
    pub async fn replot(self, task_id: &TaskId) -> Result<PlotResult, StageFailure> {
        let span = info_span!("pipeline_replot", run_id = %self.ctx.run_id(), %task_id);
        async {
            info!("Replot started");
            self.ctx.progress().update(|p| p.task_id = Some(task_id.to_string()));
            self.drive(PipelineStage::Task, self.replot_stages(task_id)).await
        }
        .instrument(span)
        .await
    }

    async fn drive<F>(&self, first: PipelineStage, stages: F) -> Result<PlotResult, StageFailure>
    where
        F: Future<Output = Result<PlotResult, StageFailure>>,
    {
        let ctx = &self.ctx;
        let timer = SpanTimer::start("pipeline");

        ctx.sink()
            .emit(events::PIPELINE_STARTED, Some(serde_json::json!({ "run_id": ctx.run_id() })))
            .await;

        let result = match tokio::time::timeout(self.run_timeout, stages).await {
            Ok(result) => result,
            Err(_) => {
                let stage = ctx.progress().snapshot().stage.unwrap_or(first);
                let err = UxflowError::RunTimeout(self.run_timeout);
                warn!(%stage, timeout_secs = self.run_timeout.as_secs(), "Run timed out");
                ctx.sink()
                    .emit(events::STAGE_FAILED, Some(stage_payload(ctx.run_id(), stage, None, Some(&err))))
                    .await;
                Err(StageFailure::new(stage, err))
            }
        };

        let duration_ms = timer.finish();
        match &result {
            Ok(plot) => {
                ctx.progress().finish(RunPhase::Completed);
                info!(url = %plot.presigned_url, duration_ms, "Pipeline completed");
                ctx.sink()
                    .emit(
                        events::PIPELINE_COMPLETED,
                        Some(run_payload(&ctx.progress().snapshot(), duration_ms, None)),
                    )
                    .await;
            }
            Err(failure) => {
                let phase = if failure.is_cancelled() {
                    RunPhase::Cancelled
                } else {
                    RunPhase::Failed
                };
                ctx.progress().finish(phase);
                error!(stage = %failure.stage, code = failure.source.code(), error = %failure.source, "Pipeline failed");
                ctx.sink()
                    .emit(
                        events::PIPELINE_FAILED,
                        Some(run_payload(&ctx.progress().snapshot(), duration_ms, Some(failure))),
                    )
                    .await;
            }
        }
        result
    }

    async fn run_stages(&self, artifact: &SourceArtifact) -> Result<PlotResult, StageFailure> {
        let build = self.run_stage(&BuildStage, artifact).await?;
        let output = self.run_stage(&TaskStage, &build.build).await?;
        let token = self.run_stage(&ExtractStage, &output.stdout).await?;
        self.run_stage(&PlotStage, &token).await
    }

    async fn replot_stages(&self, task_id: &TaskId) -> Result<PlotResult, StageFailure> {
        let stdout = self.run_stage(&TaskOutputStage, task_id).await?;
        let token = self.run_stage(&ExtractStage, &stdout).await?;
        self.run_stage(&PlotStage, &token).await
    }

    async fn run_stage<D: StageDriver>(&self, driver: &D, input: &D::Input) -> Result<D::Output, StageFailure> {
        let ctx = &self.ctx;
        let stage = driver.stage();
        let cancel = ctx.cancel_token();

        let result = if cancel.is_cancelled() {
            Err(UxflowError::Cancelled(cancel.reason().unwrap_or_default()))
        } else {
            ctx.progress().enter_stage(stage);
            ctx.sink()
                .emit(events::STAGE_STARTED, Some(stage_payload(ctx.run_id(), stage, None, None)))
                .await;
            info!(%stage, "Stage started");

            let timer = SpanTimer::start(stage.to_string());
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(UxflowError::Cancelled(cancel.reason().unwrap_or_default())),
                result = driver.run(ctx, input) => result,
            };
            let duration_ms = timer.finish();

            if result.is_ok() {
                info!(%stage, duration_ms, "Stage completed");
                ctx.sink()
                    .emit(
                        events::STAGE_COMPLETED,
                        Some(stage_payload(ctx.run_id(), stage, Some(duration_ms), None)),
                    )
                    .await;
            }
            result
        };

        result.map_err(|err| {
            warn!(%stage, code = err.code(), error = %err, "Stage failed");
            ctx.sink()
                .try_emit(events::STAGE_FAILED, Some(stage_payload(ctx.run_id(), stage, None, Some(&err))));
            StageFailure::new(stage, err)
        })
    }
}

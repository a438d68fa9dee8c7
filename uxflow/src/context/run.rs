//! The context object threaded through one run.

use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::api::{ComputeApi, Endpoints};
use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::core::{JobStatus, PipelineStage, ResourceKind};
use crate::events::{self, EventSink};
use crate::poll::{PollConfig, Poller};
use crate::progress::ProgressReporter;

/// Everything a stage driver needs for one run.
pub struct RunContext {
    run_id: Uuid,
    api: Arc<dyn ComputeApi>,
    endpoints: Endpoints,
    poll: PollConfig,
    default_core_id: Option<String>,
    cancel: Arc<CancellationToken>,
    progress: ProgressReporter,
    sink: Arc<dyn EventSink>,
}

impl RunContext {
    /// Creates a context with a fresh run id and cancellation token.
    #[must_use]
    pub fn new(api: Arc<dyn ComputeApi>, config: &PipelineConfig, sink: Arc<dyn EventSink>) -> Self {
        let run_id = Uuid::new_v4();
        Self {
            run_id,
            api,
            endpoints: config.endpoints.clone(),
            poll: config.poll.clone(),
            default_core_id: config.default_core_id.clone(),
            cancel: Arc::new(CancellationToken::new()),
            progress: ProgressReporter::new(run_id),
            sink,
        }
    }

    /// Run identifier.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The remote API.
    #[must_use]
    pub fn api(&self) -> &dyn ComputeApi {
        self.api.as_ref()
    }

    /// Endpoint paths.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Core used when the artifact does not pick one.
    #[must_use]
    pub fn default_core_id(&self) -> Option<&str> {
        self.default_core_id.as_deref()
    }

    /// Cancellation token of the run.
    #[must_use]
    pub fn cancel_token(&self) -> &Arc<CancellationToken> {
        &self.cancel
    }

    /// Progress reporter of the run.
    #[must_use]
    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Event sink of the run.
    #[must_use]
    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    /// A poller bound to this run's configuration and token.
    #[must_use]
    pub fn poller(&self) -> Poller<'_> {
        Poller::new(&self.poll, &self.cancel)
    }

    /// Publishes a polled job status.
    pub fn report_status(&self, kind: ResourceKind, id: &str, status: JobStatus, iterations: usize) {
        self.progress.record_status(status, iterations);
        self.sink.try_emit(
            events::JOB_STATUS,
            Some(serde_json::json!({
                "run_id": self.run_id,
                "kind": kind,
                "id": id,
                "status": status,
                "iteration": iterations,
            })),
        );
    }

    /// Records a fault in a diagnostic side fetch. Never fails the run.
    pub fn diagnostic(&self, stage: PipelineStage, message: impl Into<String>) {
        let message = message.into();
        warn!(run_id = %self.run_id, %stage, "{message}");
        self.sink.try_emit(
            events::DIAGNOSTIC,
            Some(serde_json::json!({
                "run_id": self.run_id,
                "stage": stage,
                "message": message,
            })),
        );
        self.progress.record_diagnostic(format!("{stage}: {message}"));
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("endpoints", &self.endpoints)
            .field("poll", &self.poll)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

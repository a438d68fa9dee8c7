//! Wide event payloads: one self-contained JSON object per lifecycle event.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::PipelineStage;
use crate::errors::{StageFailure, UxflowError};
use crate::progress::RunProgress;

/// Builds the payload of a `stage.*` event.
#[must_use]
pub fn stage_payload(
    run_id: Uuid,
    stage: PipelineStage,
    duration_ms: Option<f64>,
    error: Option<&UxflowError>,
) -> Value {
    let mut payload = json!({
        "run_id": run_id,
        "stage": stage,
    });

    if let Some(duration_ms) = duration_ms {
        payload["duration_ms"] = json!(duration_ms);
    }
    if let Some(err) = error {
        payload["code"] = json!(err.code());
        payload["error"] = json!(err.to_string());
    }
    payload
}

/// Builds the payload of a `pipeline.completed` or `pipeline.failed` event
/// from the final progress snapshot.
#[must_use]
pub fn run_payload(progress: &RunProgress, duration_ms: f64, failure: Option<&StageFailure>) -> Value {
    let mut payload = json!({
        "run_id": progress.run_id,
        "phase": progress.phase,
        "build_id": progress.build_id,
        "task_id": progress.task_id,
        "plot_url": progress.plot_url,
        "diagnostics": progress.diagnostics,
        "duration_ms": duration_ms,
    });

    if let Some(failure) = failure {
        payload["failure"] = json!(failure.report());
    }
    payload
}

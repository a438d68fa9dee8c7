//! Plot stage: render an uncertain value.

use async_trait::async_trait;
use tracing::info;

use super::StageDriver;
use crate::api::models::{non_empty, PlotRequest, PlotResponse};
use crate::context::RunContext;
use crate::core::{PipelineStage, PlotResult, UncertainValueToken};
use crate::errors::UxflowError;

/// Requests a plot for a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlotStage;

#[async_trait]
impl StageDriver for PlotStage {
    type Input = UncertainValueToken;
    type Output = PlotResult;

    fn stage(&self) -> PipelineStage {
        PipelineStage::Plot
    }

    async fn run(&self, ctx: &RunContext, input: &UncertainValueToken) -> Result<PlotResult, UxflowError> {
        request_plot(ctx, input).await
    }
}

/// Sends one plot request. The service answers synchronously, so there is
/// nothing to poll.
pub async fn request_plot(ctx: &RunContext, token: &UncertainValueToken) -> Result<PlotResult, UxflowError> {
    let endpoint = ctx.endpoints().plot.as_str();
    let request = PlotRequest {
        payload: token.as_str().to_string(),
    };
    let body = serde_json::to_value(&request).map_err(|e| UxflowError::PlotServiceError(e.to_string()))?;

    let response = ctx.api().submit(endpoint, &body).await?;
    if !response.is_success() {
        return Err(UxflowError::PlotServiceError(format!(
            "HTTP {}: {}",
            response.status, response.body
        )));
    }
    let plot: PlotResponse = response
        .json(endpoint)
        .map_err(|e| UxflowError::PlotServiceError(e.to_string()))?;
    let presigned_url = non_empty(plot.presigned_url)
        .ok_or_else(|| UxflowError::PlotServiceError("response carried no presignedURL".into()))?;

    info!(run_id = %ctx.run_id(), url = %presigned_url, "Plot ready");
    ctx.progress().update(|p| p.plot_url = Some(presigned_url.clone()));
    Ok(PlotResult { presigned_url })
}

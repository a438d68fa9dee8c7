//! Extract stage.

use async_trait::async_trait;

use super::StageDriver;
use crate::context::RunContext;
use crate::core::{PipelineStage, RawOutput, UncertainValueToken};
use crate::errors::UxflowError;
use crate::extract::extract;

/// Pulls the uncertain-value token out of task stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractStage;

#[async_trait]
impl StageDriver for ExtractStage {
    type Input = RawOutput;
    type Output = UncertainValueToken;

    fn stage(&self) -> PipelineStage {
        PipelineStage::Extract
    }

    async fn run(&self, ctx: &RunContext, input: &RawOutput) -> Result<UncertainValueToken, UxflowError> {
        let token = extract(Some(input.as_str()))?;
        tracing::debug!(run_id = %ctx.run_id(), token = %token, "Extracted uncertain value");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::context;
    use crate::testing::ScriptedComputeApi;

    #[tokio::test]
    async fn test_extracts_from_stdout() {
        let (_, _, ctx) = context(ScriptedComputeApi::new());
        let token = ExtractStage
            .run(&ctx, &RawOutput::new("Value: 1.2Ux3F00\n"))
            .await
            .unwrap();
        assert_eq!(token.as_str(), "Ux3F00\n");
    }

    #[tokio::test]
    async fn test_plain_number_has_no_marker() {
        let (_, _, ctx) = context(ScriptedComputeApi::new());
        let err = ExtractStage
            .run(&ctx, &RawOutput::new("113.000000\n"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MARKER_NOT_FOUND");
    }
}

use async_trait::async_trait;

use crate::error::AuthFailure;
use crate::pipeline::PipelineRequest;
use crate::stage::StageOptions;

/// Caller-supplied hook invoked when a stage classifies a request as failed.
///
/// The handler owns the user-visible response (status, body, redirect); the
/// invoking stage halts the pipeline afterward so later stages cannot
/// overwrite whatever the handler produced.
#[async_trait]
pub trait AuthErrorHandler: Send + Sync {
    async fn handle_auth_error(
        &self,
        request: PipelineRequest,
        failure: AuthFailure,
        options: &StageOptions,
    ) -> PipelineRequest;
}

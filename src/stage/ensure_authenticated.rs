// Authentication gate stage
use async_trait::async_trait;

use super::{Stage, StageOptions};
use crate::config::{fetch_error_handler, fetch_slot};
use crate::error::{AuthFailure, PipelineError};
use crate::handler::AuthErrorHandler;
use crate::pipeline::PipelineRequest;

/// Halts the pipeline when no token has been installed for the resolved
/// slot by the time this stage runs.
///
/// Placed after the verification stages, it turns "nobody authenticated" from
/// a silent pass-through into a handled failure.
pub struct EnsureAuthenticated {
    options: StageOptions,
}

impl EnsureAuthenticated {
    pub fn new() -> Self {
        Self::init(StageOptions::default())
    }
}

impl Default for EnsureAuthenticated {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for EnsureAuthenticated {
    fn init(options: StageOptions) -> Self {
        Self { options }
    }

    async fn process(&self, request: PipelineRequest) -> Result<PipelineRequest, PipelineError> {
        let slot = fetch_slot(&request, &self.options);
        if request.current_token(&slot).is_some() {
            return Ok(request);
        }

        tracing::warn!("no authenticated token for slot '{}'", slot);
        let handler = fetch_error_handler(&request)?;
        let request = handler
            .handle_auth_error(request, AuthFailure::Unauthenticated, &self.options)
            .await;
        Ok(request.halt())
    }
}

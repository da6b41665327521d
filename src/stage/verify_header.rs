// Bearer-token verification stage
use async_trait::async_trait;

use super::{Stage, StageOptions};
use crate::backend::TokenBackend;
use crate::config::{fetch_backend, fetch_error_handler, fetch_slot};
use crate::error::{AuthFailure, PipelineError};
use crate::handler::AuthErrorHandler;
use crate::pipeline::PipelineRequest;

const AUTHORIZATION_HEADER: &str = "authorization";
const BEARER_PREFIX: &str = "Bearer ";

/// Verifies a token presented in the `Authorization` header and installs it
/// under the resolved slot.
///
/// A missing header, a non-Bearer scheme, or an already-installed token all
/// pass the request through unchanged. A present-but-invalid token is
/// delegated to the error handler and halts the pipeline.
pub struct VerifyHeader {
    options: StageOptions,
}

impl VerifyHeader {
    pub fn new() -> Self {
        Self::init(StageOptions::default())
    }
}

impl Default for VerifyHeader {
    fn default() -> Self {
        Self::new()
    }
}

fn bearer_token(value: &str) -> Option<String> {
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[async_trait]
impl Stage for VerifyHeader {
    fn init(options: StageOptions) -> Self {
        Self { options }
    }

    async fn process(&self, request: PipelineRequest) -> Result<PipelineRequest, PipelineError> {
        let slot = fetch_slot(&request, &self.options);
        if request.current_token(&slot).is_some() {
            return Ok(request);
        }

        let token = match request.header(AUTHORIZATION_HEADER).and_then(bearer_token) {
            Some(token) => token,
            None => return Ok(request),
        };

        let backend = fetch_backend(&request)?;
        match backend.decode_and_verify(&token, None).await {
            Ok(claims) => {
                tracing::debug!("header token verified for slot '{}'", slot);
                Ok(request
                    .put_current_token(token, &slot)
                    .put_current_claims(claims, &slot))
            }
            Err(reason) => {
                tracing::warn!("header token rejected for slot '{}': {}", slot, reason);
                let handler = fetch_error_handler(&request)?;
                let request = handler
                    .handle_auth_error(request, AuthFailure::InvalidToken(reason), &self.options)
                    .await;
                Ok(request.halt())
            }
        }
    }
}

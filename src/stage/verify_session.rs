// Session-token verification stage
use async_trait::async_trait;
use serde_json::Value;

use super::{Stage, StageOptions};
use crate::backend::TokenBackend;
use crate::config::{fetch_backend, fetch_error_handler, fetch_slot};
use crate::error::{AuthFailure, PipelineError};
use crate::handler::AuthErrorHandler;
use crate::pipeline::PipelineRequest;

/// Verifies a token persisted in the session under the slot's derived key
/// and installs it for the slot.
///
/// Inactive sessions and empty session slots pass through unchanged. A
/// stale token is removed from the session before the error handler runs, so
/// the same dead credential is not retried on the next request.
pub struct VerifySession {
    options: StageOptions,
}

impl VerifySession {
    pub fn new() -> Self {
        Self::init(StageOptions::default())
    }
}

impl Default for VerifySession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for VerifySession {
    fn init(options: StageOptions) -> Self {
        Self { options }
    }

    async fn process(&self, request: PipelineRequest) -> Result<PipelineRequest, PipelineError> {
        let slot = fetch_slot(&request, &self.options);
        if request.current_token(&slot).is_some() {
            return Ok(request);
        }
        if !request.session_active() {
            return Ok(request);
        }

        let key = slot.token_key();
        let token = match request
            .session_value(&key)
            .and_then(Value::as_str)
            .map(str::to_string)
        {
            Some(token) => token,
            None => return Ok(request),
        };

        let backend = fetch_backend(&request)?;
        match backend.decode_and_verify(&token, None).await {
            Ok(claims) => {
                tracing::debug!("session token verified for slot '{}'", slot);
                Ok(request
                    .put_current_token(token, &slot)
                    .put_current_claims(claims, &slot))
            }
            Err(reason) => {
                tracing::warn!("session token rejected for slot '{}': {}", slot, reason);
                let handler = fetch_error_handler(&request)?;
                let request = request.remove_session(&key);
                let request = handler
                    .handle_auth_error(request, AuthFailure::InvalidToken(reason), &self.options)
                    .await;
                Ok(request.halt())
            }
        }
    }
}

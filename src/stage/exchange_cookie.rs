// Refresh-cookie to access-token upgrade stage
use async_trait::async_trait;
use serde_json::Value;

use super::{Stage, StageOptions};
use crate::backend::TokenBackend;
use crate::config::{fetch_backend, fetch_error_handler, fetch_slot};
use crate::error::{AuthFailure, PipelineError};
use crate::handler::AuthErrorHandler;
use crate::pipeline::{slot, Cookies, PipelineRequest, Slot};
use crate::token::{Claims, ExchangeOptions, TOKEN_TYPE_REFRESH};

/// Opportunistically upgrades a long-lived refresh-class token carried in a
/// cookie into a freshly minted token for the resolved slot.
///
/// The stage only acts when the cookies are already parsed, no token is
/// installed for the slot yet, and a cookie exists under the slot's derived
/// key. A missing cookie is a normal outcome: anonymous and
/// already-authenticated requests pass through untouched. An invalid cookie
/// is delegated to the configured error handler and the pipeline halts so
/// downstream stages cannot overwrite the handler's response.
///
/// On success the new token also lands in the session under the same derived
/// key, but only when a session is already active for the request. The
/// stage never initiates session creation, and it never writes cookies.
pub struct ExchangeCookie {
    options: StageOptions,
}

/// Terminal classification of one invocation. Every branch of the decision
/// procedure ends in exactly one of these.
enum Outcome {
    Unchanged,
    Installed {
        slot: Slot,
        token: String,
        claims: Claims,
        session_key: Option<String>,
    },
    Halted(AuthFailure),
}

impl ExchangeCookie {
    pub fn new() -> Self {
        Self::init(StageOptions::default())
    }

    async fn evaluate(&self, request: &PipelineRequest) -> Result<Outcome, PipelineError> {
        // Cookie parsing is an upstream responsibility; an unfetched set is
        // passed through, never parsed here.
        let cookies = match request.cookies() {
            Cookies::Unfetched => return Ok(Outcome::Unchanged),
            Cookies::Parsed(map) => map,
        };

        // Idempotent with upstream stages: an already-installed token wins
        // over a re-exchange.
        let slot = fetch_slot(request, &self.options);
        if request.current_token(&slot).is_some() {
            return Ok(Outcome::Unchanged);
        }

        let key = slot.token_key();
        let raw = match slot::find_token(cookies, &key) {
            Some(raw) => raw.to_string(),
            None => return Ok(Outcome::Unchanged),
        };

        // Both collaborators must resolve before the exchange is attempted;
        // a missing one is a miswired pipeline, not a bad request.
        let backend = fetch_backend(request)?;
        fetch_error_handler(request)?;

        let from = self
            .options
            .exchange_from
            .as_deref()
            .unwrap_or(TOKEN_TYPE_REFRESH);
        let to = self
            .options
            .exchange_to
            .clone()
            .unwrap_or_else(|| backend.default_token_type().to_string());
        let exchange_options = ExchangeOptions {
            ttl: self.options.ttl,
        };

        let session_was_active = request.session_active();

        match backend.exchange(&raw, from, &to, &exchange_options).await {
            Ok(exchanged) => Ok(Outcome::Installed {
                session_key: session_was_active.then_some(key),
                slot,
                token: exchanged.new_token,
                claims: exchanged.new_claims,
            }),
            Err(reason) => {
                tracing::warn!("cookie token exchange failed for slot '{}': {}", slot, reason);
                Ok(Outcome::Halted(AuthFailure::InvalidToken(reason)))
            }
        }
    }
}

impl Default for ExchangeCookie {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for ExchangeCookie {
    fn init(options: StageOptions) -> Self {
        Self { options }
    }

    async fn process(&self, request: PipelineRequest) -> Result<PipelineRequest, PipelineError> {
        match self.evaluate(&request).await? {
            Outcome::Unchanged => Ok(request),
            Outcome::Installed {
                slot,
                token,
                claims,
                session_key,
            } => {
                tracing::debug!("cookie exchange installed a new token for slot '{}'", slot);
                let mut request = request
                    .put_current_token(token.clone(), &slot)
                    .put_current_claims(claims, &slot);
                if let Some(key) = session_key {
                    request = request.put_session(key, Value::String(token));
                }
                Ok(request)
            }
            Outcome::Halted(failure) => {
                let handler = fetch_error_handler(&request)?;
                let request = handler
                    .handle_auth_error(request, failure, &self.options)
                    .await;
                Ok(request.halt())
            }
        }
    }
}

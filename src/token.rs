// Token-level types shared between backends and stages
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Decoded token claims. Stages treat these as opaque; backends decide what
/// goes inside.
pub type Claims = serde_json::Map<String, Value>;

/// Long-lived, low-privilege credential class.
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Short-lived credential class used for authorization checks.
pub const TOKEN_TYPE_ACCESS: &str = "access";

/// Successful result of trading one token class for another.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exchanged {
    pub old_token: String,
    pub old_claims: Claims,
    pub new_token: String,
    pub new_claims: Claims,
}

/// Pass-through knobs for a single exchange call.
///
/// `ttl` overrides the backend's configured lifetime for the minted token.
/// It is not a timeout on the call itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExchangeOptions {
    pub ttl: Option<Duration>,
}

/// Why a token failed verification or exchange.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("token expired")]
    Expired,

    #[error("token type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },

    #[error("invalid token: {0}")]
    Invalid(String),
}

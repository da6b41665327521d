pub mod jwt;

pub use jwt::JwtBackend;

use async_trait::async_trait;

use crate::token::{Claims, ExchangeError, ExchangeOptions, Exchanged};

/// The token implementation a pipeline is wired with.
///
/// Stages never touch key material or claim validation rules directly; they
/// hand raw token strings to the backend and react to the outcome. A backend
/// call may perform I/O of its own (e.g. a remote revocation check); from
/// the stage's perspective it is a single opaque operation.
#[async_trait]
pub trait TokenBackend: Send + Sync {
    /// Token type minted when a stage does not override `exchange_to`.
    fn default_token_type(&self) -> &str;

    /// Verify a raw token and return its decoded claims.
    ///
    /// When `expected_type` is given, the token's declared type must match.
    async fn decode_and_verify(
        &self,
        token: &str,
        expected_type: Option<&str>,
    ) -> Result<Claims, ExchangeError>;

    /// Trade a valid token of `from_type` for a newly issued token of
    /// `to_type` without re-authenticating the underlying principal.
    async fn exchange(
        &self,
        token: &str,
        from_type: &str,
        to_type: &str,
        options: &ExchangeOptions,
    ) -> Result<Exchanged, ExchangeError>;
}

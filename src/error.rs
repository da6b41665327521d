// Pipeline error types
use thiserror::Error;

use crate::token::ExchangeError;

/// Configuration-class failure. Raised when a stage needs a collaborator the
/// pipeline never installed; indicates a miswired pipeline, not a bad request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no token backend configured; install a PipelineConfig before running authentication stages")]
    MissingBackend,

    #[error("no auth error handler configured; install a PipelineConfig before running authentication stages")]
    MissingErrorHandler,
}

/// Per-request failure classification handed to the configured
/// [`AuthErrorHandler`](crate::handler::AuthErrorHandler).
///
/// The stage that produced it never renders a user-visible error itself; it
/// only classifies, delegates, and halts the pipeline afterward.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("invalid token: {0}")]
    InvalidToken(ExchangeError),

    #[error("unauthenticated")]
    Unauthenticated,
}

//! Pipeline-based authentication stages.
//!
//! `warden` models request authentication as an ordered pipeline of stages
//! sharing one mutable per-request context. Verification stages locate a
//! credential (header, cookie, or session), hand it to the configured token
//! backend, and install the result under a logical *slot*; the cookie stage
//! additionally upgrades long-lived refresh tokens into short-lived access
//! tokens on the fly. Failures are classified and delegated to a
//! caller-supplied error handler, after which the pipeline halts.
//!
//! ```rust,ignore
//! let config = PipelineConfig::new(Arc::new(backend), Arc::new(handler));
//! let pipeline = Pipeline::new(config)
//!     .stage(FetchCookies::new())
//!     .stage(VerifySession::new())
//!     .stage(ExchangeCookie::new())
//!     .stage(EnsureAuthenticated::new());
//! let request = pipeline.run(request).await?;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod handler;
pub mod pipeline;
pub mod stage;
pub mod token;

pub use backend::{JwtBackend, TokenBackend};
pub use config::PipelineConfig;
pub use error::{AuthFailure, PipelineError};
pub use handler::AuthErrorHandler;
pub use pipeline::{Cookies, PipelineRequest, Session, Slot};
pub use stage::{
    EnsureAuthenticated, ExchangeCookie, FetchCookies, Pipeline, Stage, StageOptions,
    VerifyHeader, VerifySession,
};
pub use token::{
    Claims, ExchangeError, ExchangeOptions, Exchanged, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH,
};

pub mod ensure_authenticated;
pub mod exchange_cookie;
pub mod fetch_cookies;
pub mod verify_header;
pub mod verify_session;

pub use ensure_authenticated::EnsureAuthenticated;
pub use exchange_cookie::ExchangeCookie;
pub use fetch_cookies::FetchCookies;
pub use verify_header::VerifyHeader;
pub use verify_session::VerifySession;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::{PipelineRequest, Slot};

/// Per-stage options, stored at construction and read on every invocation.
///
/// Unknown concerns simply stay `None`; a stage reads the fields it
/// understands and ignores the rest.
#[derive(Clone, Debug, Default)]
pub struct StageOptions {
    /// Slot override; falls back to the pipeline-configured slot.
    pub key: Option<Slot>,
    /// Token class expected on the way in; defaults to `refresh`.
    pub exchange_from: Option<String>,
    /// Token class minted on the way out; defaults to the backend's declared
    /// default type.
    pub exchange_to: Option<String>,
    /// Lifetime override passed through to the backend.
    pub ttl: Option<Duration>,
    /// Realm hint forwarded to the error handler for challenge rendering.
    pub realm: Option<String>,
}

impl StageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_key(mut self, slot: Slot) -> Self {
        self.key = Some(slot);
        self
    }

    #[must_use]
    pub fn with_exchange_from(mut self, token_type: impl Into<String>) -> Self {
        self.exchange_from = Some(token_type.into());
        self
    }

    #[must_use]
    pub fn with_exchange_to(mut self, token_type: impl Into<String>) -> Self {
        self.exchange_to = Some(token_type.into());
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }
}

/// One unit in an ordered sequence of request-processing steps.
///
/// `process` never fails for per-request reasons; those end in a valid,
/// possibly-halted request. The only `Err` is configuration-class: a
/// collaborator the pipeline never installed.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Build the stage from its options. Options are stored as given; no
    /// validation happens here.
    fn init(options: StageOptions) -> Self
    where
        Self: Sized;

    async fn process(&self, request: PipelineRequest) -> Result<PipelineRequest, PipelineError>;
}

/// Ordered stage runner.
///
/// Installs the [`PipelineConfig`] into the request, then runs stages in
/// order. Once a stage halts the request, the remaining stages are skipped
/// and the request is returned as-is.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config: Arc::new(config),
            stages: Vec::new(),
        }
    }

    #[must_use]
    pub fn stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineRequest, PipelineError> {
        let mut request = request.with_config(Arc::clone(&self.config));
        for stage in &self.stages {
            if request.halted() {
                tracing::debug!("pipeline halted; skipping remaining stages");
                break;
            }
            request = stage.process(request).await?;
        }
        Ok(request)
    }
}

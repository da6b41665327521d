use std::sync::Arc;

use crate::backend::TokenBackend;
use crate::error::PipelineError;
use crate::handler::AuthErrorHandler;
use crate::pipeline::{PipelineRequest, Slot};
use crate::stage::StageOptions;

/// Pipeline-wide wiring: which token backend performs exchanges, which
/// handler renders auth failures, and which slot stages operate on unless
/// told otherwise.
///
/// Built once when the pipeline is assembled and installed into every
/// request before the first stage runs; read-only from a stage's point of
/// view.
pub struct PipelineConfig {
    pub(crate) backend: Arc<dyn TokenBackend>,
    pub(crate) error_handler: Arc<dyn AuthErrorHandler>,
    pub(crate) slot: Slot,
}

impl PipelineConfig {
    pub fn new(backend: Arc<dyn TokenBackend>, error_handler: Arc<dyn AuthErrorHandler>) -> Self {
        Self {
            backend,
            error_handler,
            slot: Slot::Default,
        }
    }

    #[must_use]
    pub fn with_slot(mut self, slot: Slot) -> Self {
        self.slot = slot;
        self
    }
}

/// Resolve the token backend for this request.
///
/// A missing backend is a programmer error (the pipeline was assembled
/// without a [`PipelineConfig`]) and fails loudly rather than letting the
/// request pass through unauthenticated.
pub fn fetch_backend(request: &PipelineRequest) -> Result<Arc<dyn TokenBackend>, PipelineError> {
    request
        .config()
        .map(|config| Arc::clone(&config.backend))
        .ok_or(PipelineError::MissingBackend)
}

/// Resolve the auth error handler for this request. Fails loudly when
/// unresolved, same as [`fetch_backend`].
pub fn fetch_error_handler(
    request: &PipelineRequest,
) -> Result<Arc<dyn AuthErrorHandler>, PipelineError> {
    request
        .config()
        .map(|config| Arc::clone(&config.error_handler))
        .ok_or(PipelineError::MissingErrorHandler)
}

/// Resolve the slot a stage operates on: per-stage option override first,
/// then the configured pipeline slot, then `default`.
pub fn fetch_slot(request: &PipelineRequest, options: &StageOptions) -> Slot {
    options
        .key
        .clone()
        .or_else(|| request.config().map(|config| config.slot.clone()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_fails_loudly_without_config() {
        let request = PipelineRequest::new();
        assert_eq!(
            fetch_backend(&request).err(),
            Some(PipelineError::MissingBackend)
        );
        assert_eq!(
            fetch_error_handler(&request).err(),
            Some(PipelineError::MissingErrorHandler)
        );
    }

    #[test]
    fn fetch_slot_prefers_options_over_default() {
        let request = PipelineRequest::new();
        let options = StageOptions::new().with_key(Slot::named("admin"));

        assert_eq!(fetch_slot(&request, &options), Slot::named("admin"));
        assert_eq!(fetch_slot(&request, &StageOptions::new()), Slot::Default);
    }
}

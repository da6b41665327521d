use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use warden::{
    AuthErrorHandler, AuthFailure, JwtBackend, PipelineConfig, PipelineRequest, StageOptions,
    TokenBackend,
};

pub const TEST_SECRET: &str = "integration-test-secret-long-enough-for-hs256";

/// Error handler that records every invocation for later assertions.
#[derive(Default)]
pub struct RecordingHandler {
    pub calls: AtomicUsize,
    pub last_failure: Mutex<Option<AuthFailure>>,
}

#[async_trait]
impl AuthErrorHandler for RecordingHandler {
    async fn handle_auth_error(
        &self,
        request: PipelineRequest,
        failure: AuthFailure,
        _options: &StageOptions,
    ) -> PipelineRequest {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_failure.lock().unwrap() = Some(failure);
        request
    }
}

pub fn backend() -> Arc<JwtBackend> {
    Arc::new(JwtBackend::new(TEST_SECRET))
}

pub fn config(backend: &Arc<JwtBackend>, handler: &Arc<RecordingHandler>) -> PipelineConfig {
    PipelineConfig::new(
        Arc::clone(backend) as Arc<dyn TokenBackend>,
        Arc::clone(handler) as Arc<dyn AuthErrorHandler>,
    )
}

// Cookie-header parsing stage
use std::collections::HashMap;

use async_trait::async_trait;
use cookie::Cookie;

use super::{Stage, StageOptions};
use crate::error::PipelineError;
use crate::pipeline::{Cookies, PipelineRequest};

const COOKIE_HEADER: &str = "cookie";

/// Parses the request's `Cookie` header into the parsed cookie set.
///
/// Runs ahead of any stage that reads cookies; those stages treat an
/// unfetched set as "not my job" and pass through. A missing header still
/// yields a parsed (empty) set, so downstream stages see a fetched state
/// either way. Malformed pairs are skipped, not fatal.
pub struct FetchCookies;

impl FetchCookies {
    pub fn new() -> Self {
        Self::init(StageOptions::default())
    }
}

impl Default for FetchCookies {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for FetchCookies {
    fn init(_options: StageOptions) -> Self {
        Self
    }

    async fn process(&self, request: PipelineRequest) -> Result<PipelineRequest, PipelineError> {
        if let Cookies::Parsed(_) = request.cookies() {
            return Ok(request);
        }

        let mut parsed = HashMap::new();
        if let Some(header) = request.header(COOKIE_HEADER) {
            for item in Cookie::split_parse(header.to_string()) {
                match item {
                    Ok(cookie) => {
                        parsed.insert(cookie.name().to_string(), cookie.value().to_string());
                    }
                    Err(error) => {
                        tracing::debug!("skipping malformed cookie pair: {}", error);
                    }
                }
            }
        }

        Ok(request.with_cookies(parsed))
    }
}

pub mod slot;

pub use slot::Slot;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::config::PipelineConfig;
use crate::token::Claims;

/// The request's cookie set as seen by authentication stages.
///
/// `Unfetched` is a distinct sentinel, not an empty map: it means the cookie
/// header has not been parsed yet, and stages that read cookies must pass the
/// request through untouched rather than parse it themselves.
#[derive(Clone, Debug)]
pub enum Cookies {
    Unfetched,
    Parsed(HashMap<String, String>),
}

/// Session state attached to the request.
///
/// `Unconfigured` means no session mechanism exists for this request at all;
/// `Active` with an empty map means a session exists but holds nothing yet.
/// Stages only ever write into an `Active` session; none of them initiates
/// session creation.
#[derive(Clone, Debug)]
pub enum Session {
    Unconfigured,
    Active(HashMap<String, Value>),
}

/// Mutable per-request context shared by every stage in a pipeline.
///
/// Owned exclusively by one pipeline execution for the duration of one
/// request; nothing in it is shared across requests.
#[derive(Clone)]
pub struct PipelineRequest {
    cookies: Cookies,
    headers: HashMap<String, String>,
    session: Session,
    tokens: HashMap<Slot, String>,
    claims: HashMap<Slot, Claims>,
    config: Option<Arc<PipelineConfig>>,
    halted: bool,
}

impl PipelineRequest {
    pub fn new() -> Self {
        Self {
            cookies: Cookies::Unfetched,
            headers: HashMap::new(),
            session: Session::Unconfigured,
            tokens: HashMap::new(),
            claims: HashMap::new(),
            config: None,
            halted: false,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace the cookie set with an already-parsed map.
    #[must_use]
    pub fn with_cookies(mut self, cookies: HashMap<String, String>) -> Self {
        self.cookies = Cookies::Parsed(cookies);
        self
    }

    /// Activate an (empty) session for this request.
    #[must_use]
    pub fn with_session(mut self) -> Self {
        if let Session::Unconfigured = self.session {
            self.session = Session::Active(HashMap::new());
        }
        self
    }

    /// Activate the session and seed it with a value.
    #[must_use]
    pub fn with_session_value(self, key: impl Into<String>, value: Value) -> Self {
        self.with_session().put_session(key, value)
    }

    /// Install the pipeline-wide configuration stages resolve collaborators
    /// from. The pipeline runner does this before the first stage executes.
    #[must_use]
    pub fn with_config(mut self, config: Arc<PipelineConfig>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    /// Header lookup, tolerant of casing differences.
    pub fn header(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.headers.get(name) {
            return Some(value.as_str());
        }
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn current_token(&self, slot: &Slot) -> Option<&str> {
        self.tokens.get(slot).map(String::as_str)
    }

    pub fn current_claims(&self, slot: &Slot) -> Option<&Claims> {
        self.claims.get(slot)
    }

    #[must_use]
    pub fn put_current_token(mut self, token: impl Into<String>, slot: &Slot) -> Self {
        self.tokens.insert(slot.clone(), token.into());
        self
    }

    #[must_use]
    pub fn put_current_claims(mut self, claims: Claims, slot: &Slot) -> Self {
        self.claims.insert(slot.clone(), claims);
        self
    }

    /// True when a session mechanism is configured and initialized for this
    /// request, regardless of whether it holds any values yet.
    pub fn session_active(&self) -> bool {
        matches!(self.session, Session::Active(_))
    }

    /// Write into the response-bound session.
    ///
    /// Only an active session is written; without one the value is dropped
    /// with a warning, since no stage is allowed to initiate session creation.
    #[must_use]
    pub fn put_session(mut self, key: impl Into<String>, value: Value) -> Self {
        match &mut self.session {
            Session::Active(values) => {
                values.insert(key.into(), value);
            }
            Session::Unconfigured => {
                tracing::warn!("session write without an active session; value dropped");
            }
        }
        self
    }

    pub fn session_value(&self, key: &str) -> Option<&Value> {
        match &self.session {
            Session::Active(values) => values.get(key),
            Session::Unconfigured => None,
        }
    }

    #[must_use]
    pub fn remove_session(mut self, key: &str) -> Self {
        if let Session::Active(values) = &mut self.session {
            values.remove(key);
        }
        self
    }

    /// Signal that no further stage may run for this request.
    #[must_use]
    pub fn halt(mut self) -> Self {
        self.halted = true;
        self
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn config(&self) -> Option<&Arc<PipelineConfig>> {
        self.config.as_ref()
    }
}

impl Default for PipelineRequest {
    fn default() -> Self {
        Self::new()
    }
}

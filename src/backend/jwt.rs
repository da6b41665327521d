// HS256 JWT token backend
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{json, Value};
use uuid::Uuid;

use super::TokenBackend;
use crate::token::{
    Claims, ExchangeError, ExchangeOptions, Exchanged, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH,
};

/// Claims the backend owns outright; they are stamped fresh on every issued
/// token and never carried over from an exchanged one.
const RESERVED_CLAIMS: [&str; 4] = ["typ", "jti", "iat", "exp"];

/// JWT-based [`TokenBackend`] signing with a symmetric HS256 secret.
///
/// Tokens carry `sub`, `typ`, `jti`, `iat` and `exp` claims (plus `iss` when
/// an issuer is configured). The token class lives in the `typ` claim, so a
/// refresh token can never be replayed where an access token is expected.
pub struct JwtBackend {
    secret: String,
    issuer: Option<String>,
    default_token_type: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtBackend {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: None,
            default_token_type: TOKEN_TYPE_ACCESS.to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(30),
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn with_default_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.default_token_type = token_type.into();
        self
    }

    #[must_use]
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Issue a fresh token for `subject` with the given type.
    ///
    /// Returns the signed token alongside the claims it encodes.
    pub fn encode_and_sign(
        &self,
        subject: &str,
        token_type: &str,
        ttl: Option<Duration>,
    ) -> Result<(String, Claims), ExchangeError> {
        let mut claims = Claims::new();
        claims.insert("sub".to_string(), Value::String(subject.to_string()));
        if let Some(issuer) = &self.issuer {
            claims.insert("iss".to_string(), Value::String(issuer.clone()));
        }
        self.sign(claims, token_type, ttl)
    }

    fn sign(
        &self,
        mut claims: Claims,
        token_type: &str,
        ttl: Option<Duration>,
    ) -> Result<(String, Claims), ExchangeError> {
        let now = Utc::now();
        let lifetime = ttl.unwrap_or_else(|| self.ttl_for(token_type));

        claims.insert("typ".to_string(), Value::String(token_type.to_string()));
        claims.insert("jti".to_string(), Value::String(Uuid::new_v4().to_string()));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert("exp".to_string(), json!((now + lifetime).timestamp()));

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ExchangeError::Invalid(e.to_string()))?;

        Ok((token, claims))
    }

    fn ttl_for(&self, token_type: &str) -> Duration {
        if token_type == TOKEN_TYPE_REFRESH {
            self.refresh_ttl
        } else {
            self.access_ttl
        }
    }

    fn verify(&self, token: &str, expected_type: Option<&str>) -> Result<Claims, ExchangeError> {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ExchangeError::Expired,
            _ => ExchangeError::Invalid(e.to_string()),
        })?;

        let claims = data.claims;
        if let Some(expected) = expected_type {
            let found = claims.get("typ").and_then(Value::as_str).unwrap_or("");
            if found != expected {
                return Err(ExchangeError::TypeMismatch {
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }

        Ok(claims)
    }
}

#[async_trait]
impl TokenBackend for JwtBackend {
    fn default_token_type(&self) -> &str {
        &self.default_token_type
    }

    async fn decode_and_verify(
        &self,
        token: &str,
        expected_type: Option<&str>,
    ) -> Result<Claims, ExchangeError> {
        self.verify(token, expected_type)
    }

    async fn exchange(
        &self,
        token: &str,
        from_type: &str,
        to_type: &str,
        options: &ExchangeOptions,
    ) -> Result<Exchanged, ExchangeError> {
        let old_claims = self.verify(token, Some(from_type))?;

        let mut carried = old_claims.clone();
        for claim in RESERVED_CLAIMS {
            carried.remove(claim);
        }

        let (new_token, new_claims) = self.sign(carried, to_type, options.ttl)?;

        Ok(Exchanged {
            old_token: token.to_string(),
            old_claims,
            new_token,
            new_claims,
        })
    }
}

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};

use warden::{
    AuthFailure, EnsureAuthenticated, ExchangeCookie, ExchangeError, FetchCookies, JwtBackend,
    Pipeline, PipelineRequest, Slot, Stage, StageOptions, TokenBackend, VerifyHeader,
    VerifySession, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH,
};

use common::RecordingHandler;

fn exchange_pipeline(backend: &Arc<JwtBackend>, handler: &Arc<RecordingHandler>) -> Pipeline {
    Pipeline::new(common::config(backend, handler))
        .stage(FetchCookies::new())
        .stage(ExchangeCookie::new())
        .stage(EnsureAuthenticated::new())
}

#[tokio::test]
async fn refresh_cookie_is_upgraded_to_access_token() -> Result<()> {
    let backend = common::backend();
    let handler = Arc::new(RecordingHandler::default());
    let (refresh, _) = backend.encode_and_sign("user-1", TOKEN_TYPE_REFRESH, None)?;

    let request = PipelineRequest::new()
        .with_header("Cookie", format!("warden_default_token={refresh}"));
    let request = exchange_pipeline(&backend, &handler).run(request).await?;

    assert!(!request.halted());
    let claims = request.current_claims(&Slot::Default).expect("claims installed");
    assert_eq!(claims.get("typ").and_then(Value::as_str), Some(TOKEN_TYPE_ACCESS));
    assert_eq!(claims.get("sub").and_then(Value::as_str), Some("user-1"));

    // The freshly minted token itself verifies as an access token
    let installed = request.current_token(&Slot::Default).expect("token installed");
    backend
        .decode_and_verify(installed, Some(TOKEN_TYPE_ACCESS))
        .await?;
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn active_session_receives_the_new_token() -> Result<()> {
    let backend = common::backend();
    let handler = Arc::new(RecordingHandler::default());
    let (refresh, _) = backend.encode_and_sign("user-1", TOKEN_TYPE_REFRESH, None)?;

    let request = PipelineRequest::new()
        .with_header("Cookie", format!("warden_default_token={refresh}"))
        .with_session();
    let request = exchange_pipeline(&backend, &handler).run(request).await?;

    let installed = request.current_token(&Slot::Default).expect("token installed");
    assert_eq!(
        request.session_value("warden_default_token"),
        Some(&json!(installed))
    );
    Ok(())
}

#[tokio::test]
async fn expired_refresh_cookie_halts_the_pipeline() -> Result<()> {
    let backend = common::backend();
    let handler = Arc::new(RecordingHandler::default());
    let (stale, _) = backend.encode_and_sign(
        "user-1",
        TOKEN_TYPE_REFRESH,
        Some(chrono::Duration::seconds(-120)),
    )?;

    let request = PipelineRequest::new()
        .with_header("Cookie", format!("warden_default_token={stale}"));
    let request = exchange_pipeline(&backend, &handler).run(request).await?;

    assert!(request.halted());
    assert!(request.current_token(&Slot::Default).is_none());
    // ExchangeCookie delegated once; EnsureAuthenticated never ran
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    let failure = handler.last_failure.lock().unwrap().take().expect("failure recorded");
    assert!(matches!(
        failure,
        AuthFailure::InvalidToken(ExchangeError::Expired)
    ));
    Ok(())
}

#[tokio::test]
async fn anonymous_request_is_caught_by_the_gate() -> Result<()> {
    let backend = common::backend();
    let handler = Arc::new(RecordingHandler::default());

    let request = exchange_pipeline(&backend, &handler)
        .run(PipelineRequest::new())
        .await?;

    assert!(request.halted());
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    let failure = handler.last_failure.lock().unwrap().take().expect("failure recorded");
    assert!(matches!(failure, AuthFailure::Unauthenticated));
    Ok(())
}

#[tokio::test]
async fn bearer_header_authenticates_without_cookies() -> Result<()> {
    let backend = common::backend();
    let handler = Arc::new(RecordingHandler::default());
    let (access, _) = backend.encode_and_sign("user-2", TOKEN_TYPE_ACCESS, None)?;

    let pipeline = Pipeline::new(common::config(&backend, &handler))
        .stage(VerifyHeader::new())
        .stage(EnsureAuthenticated::new());
    let request = PipelineRequest::new().with_header("Authorization", format!("Bearer {access}"));
    let request = pipeline.run(request).await?;

    assert!(!request.halted());
    assert_eq!(request.current_token(&Slot::Default), Some(access.as_str()));
    Ok(())
}

#[tokio::test]
async fn session_token_authenticates_and_survives_reuse() -> Result<()> {
    let backend = common::backend();
    let handler = Arc::new(RecordingHandler::default());
    let (access, _) = backend.encode_and_sign("user-3", TOKEN_TYPE_ACCESS, None)?;

    let pipeline = Pipeline::new(common::config(&backend, &handler))
        .stage(VerifySession::new())
        .stage(EnsureAuthenticated::new());
    let request = PipelineRequest::new()
        .with_session_value("warden_default_token", json!(access));
    let request = pipeline.run(request).await?;

    assert!(!request.halted());
    assert_eq!(request.current_token(&Slot::Default), Some(access.as_str()));
    let claims = request.current_claims(&Slot::Default).expect("claims installed");
    assert_eq!(claims.get("sub").and_then(Value::as_str), Some("user-3"));
    Ok(())
}

#[tokio::test]
async fn stale_session_token_is_evicted_before_halting() -> Result<()> {
    let backend = common::backend();
    let handler = Arc::new(RecordingHandler::default());
    let (stale, _) = backend.encode_and_sign(
        "user-3",
        TOKEN_TYPE_ACCESS,
        Some(chrono::Duration::seconds(-120)),
    )?;

    let pipeline = Pipeline::new(common::config(&backend, &handler)).stage(VerifySession::new());
    let request = PipelineRequest::new()
        .with_session_value("warden_default_token", json!(stale));
    let request = pipeline.run(request).await?;

    assert!(request.halted());
    assert!(request.session_value("warden_default_token").is_none());
    Ok(())
}

#[tokio::test]
async fn verification_order_prefers_the_first_installed_token() -> Result<()> {
    let backend = common::backend();
    let handler = Arc::new(RecordingHandler::default());
    let (header_token, _) = backend.encode_and_sign("header-user", TOKEN_TYPE_ACCESS, None)?;
    let (refresh, _) = backend.encode_and_sign("cookie-user", TOKEN_TYPE_REFRESH, None)?;

    let pipeline = Pipeline::new(common::config(&backend, &handler))
        .stage(FetchCookies::new())
        .stage(VerifyHeader::new())
        .stage(ExchangeCookie::new());
    let request = PipelineRequest::new()
        .with_header("Authorization", format!("Bearer {header_token}"))
        .with_header("Cookie", format!("warden_default_token={refresh}"));
    let request = pipeline.run(request).await?;

    // The cookie stage must not overwrite what VerifyHeader installed
    let claims = request.current_claims(&Slot::Default).expect("claims installed");
    assert_eq!(claims.get("sub").and_then(Value::as_str), Some("header-user"));
    Ok(())
}

#[tokio::test]
async fn named_slots_hold_independent_logins() -> Result<()> {
    let backend = common::backend();
    let handler = Arc::new(RecordingHandler::default());
    let (user_refresh, _) = backend.encode_and_sign("user-1", TOKEN_TYPE_REFRESH, None)?;
    let (admin_refresh, _) = backend.encode_and_sign("admin-1", TOKEN_TYPE_REFRESH, None)?;

    let pipeline = Pipeline::new(common::config(&backend, &handler))
        .stage(FetchCookies::new())
        .stage(ExchangeCookie::new())
        .stage(ExchangeCookie::init(
            StageOptions::new().with_key(Slot::named("admin")),
        ));
    let request = PipelineRequest::new().with_header(
        "Cookie",
        format!("warden_default_token={user_refresh}; warden_admin_token={admin_refresh}"),
    );
    let request = pipeline.run(request).await?;

    let user = request.current_claims(&Slot::Default).expect("user claims");
    let admin = request
        .current_claims(&Slot::named("admin"))
        .expect("admin claims");
    assert_eq!(user.get("sub").and_then(Value::as_str), Some("user-1"));
    assert_eq!(admin.get("sub").and_then(Value::as_str), Some("admin-1"));
    Ok(())
}

#[tokio::test]
async fn ttl_override_flows_through_the_stage() -> Result<()> {
    let backend = common::backend();
    let handler = Arc::new(RecordingHandler::default());
    let (refresh, _) = backend.encode_and_sign("user-1", TOKEN_TYPE_REFRESH, None)?;

    let pipeline = Pipeline::new(common::config(&backend, &handler))
        .stage(FetchCookies::new())
        .stage(ExchangeCookie::init(
            StageOptions::new().with_ttl(chrono::Duration::seconds(600)),
        ));
    let request = PipelineRequest::new()
        .with_header("Cookie", format!("warden_default_token={refresh}"));
    let request = pipeline.run(request).await?;

    let claims = request.current_claims(&Slot::Default).expect("claims installed");
    let iat = claims.get("iat").and_then(Value::as_i64).expect("iat");
    let exp = claims.get("exp").and_then(Value::as_i64).expect("exp");
    assert_eq!(exp - iat, 600);
    Ok(())
}

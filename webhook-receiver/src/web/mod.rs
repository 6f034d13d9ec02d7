//! Web server module for handling inbound webhooks.
//!
//! This module provides:
//! - Credential lookup across headers, query string and body
//! - Legacy and structured HMAC signature verification
//! - The axum handlers and router for the webhook endpoint

pub mod credentials;
pub mod handlers;
pub mod signature;

use axum::{extract::DefaultBodyLimit, routing::post, Router};
use tower_http::trace::TraceLayer;

pub use credentials::{first_present, resolve_credentials, ResolvedCredentials};
pub use handlers::{probe, webhook, AppState, WebhookResponse};
pub use signature::{
    sign_legacy, sign_structured, verify, verify_legacy, verify_structured, Scheme,
    SignatureError, Verdict,
};

/// Build the router: `POST` submits, `HEAD` probes, on the configured path.
pub fn router(state: AppState) -> Router {
    let path = state.config.webhook_path.clone();
    let body_limit = state.config.body_limit_bytes;

    Router::new()
        .route(&path, post(webhook).head(probe))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

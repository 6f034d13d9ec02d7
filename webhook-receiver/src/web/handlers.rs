//! Webhook endpoint handlers.
//!
//! The endpoint answers two methods:
//! 1. `HEAD` is a health probe and returns 200 with no body
//! 2. `POST` runs the submission through [`ingest`] and maps the outcome
//!    to a status code and JSON body

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ingest::{ingest, IncomingRequest, Outcome};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// Health Probe
// =============================================================================

/// Health probe: 200 with an empty body, no side effects.
pub async fn probe() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// Webhook Submission
// =============================================================================

/// Webhook response.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl WebhookResponse {
    fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
            reason: None,
        }
    }

    fn ignored(reason: &'static str) -> Self {
        Self {
            status: "ignored",
            message: None,
            reason: Some(reason),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: Some(message.into()),
            reason: None,
        }
    }
}

impl Outcome {
    /// HTTP status and body for this outcome.
    pub fn into_parts(self) -> (StatusCode, WebhookResponse) {
        match self {
            Outcome::MissingCredentials => (
                StatusCode::BAD_REQUEST,
                WebhookResponse::error("Missing signature or timestamp"),
            ),
            Outcome::InvalidSignature => (
                StatusCode::FORBIDDEN,
                WebhookResponse::error("Invalid signature"),
            ),
            Outcome::VerificationError => (
                StatusCode::BAD_REQUEST,
                WebhookResponse::error("Signature verify exception"),
            ),
            Outcome::SelfMessageSkipped => (
                StatusCode::OK,
                WebhookResponse::ignored("self message skipped"),
            ),
            Outcome::ProcessingError(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                WebhookResponse::error(message),
            ),
            Outcome::Accepted(_) => (StatusCode::OK, WebhookResponse::ok()),
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        let (status, body) = self.into_parts();
        (status, Json(body)).into_response()
    }
}

/// Webhook submission endpoint.
///
/// The body is taken as raw bytes so the legacy signature is checked against
/// exactly what was sent.
pub async fn webhook(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Outcome {
    let request = IncomingRequest {
        headers,
        query,
        body,
    };

    ingest(&state.config, &request)
}

//! Request orchestration for submitted webhooks.
//!
//! ## Processing Flow
//!
//! ```text
//! IncomingRequest → log snapshot → decode body → resolve credentials
//!     → verify (legacy | structured) → self-message filter → format → log
//! ```
//!
//! Every step ends in an explicit [`Outcome`]; nothing here panics or
//! propagates an error to the transport.

use axum::body::Bytes;
use axum::http::HeaderMap;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::payload::{decode_body, format_record, is_self_message, PayloadError};
use crate::web::credentials::resolve_credentials;
use crate::web::signature::{verify, Scheme, Verdict};

/// A submitted webhook as received from the transport.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    pub headers: HeaderMap,
    pub query: Option<String>,
    pub body: Bytes,
}

/// Terminal result of processing one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Signature or timestamp could not be found anywhere.
    MissingCredentials,
    /// Neither signature scheme matched.
    InvalidSignature,
    /// Signature computation itself failed.
    VerificationError,
    /// Payload flagged `isSelf` while self messages are excluded.
    SelfMessageSkipped,
    /// Payload could not be decoded for formatting.
    ProcessingError(String),
    /// Payload was logged. Carries the matched scheme unless running in open mode.
    Accepted(Option<Scheme>),
}

/// Process one submitted webhook against the configuration.
pub fn ingest(config: &Config, request: &IncomingRequest) -> Outcome {
    log_request_snapshot(request, config.body_log_limit);

    let decoded = decode_body(&request.body);
    let parsed = decoded.as_ref().ok();

    let credentials = resolve_credentials(&request.headers, request.query.as_deref(), parsed);

    let scheme = if config.verification_enabled() {
        let Some((signature, timestamp)) = credentials.pair() else {
            warn!(
                has_signature = credentials.signature.is_some(),
                has_timestamp = credentials.timestamp.is_some(),
                "webhook_credentials_missing"
            );
            return Outcome::MissingCredentials;
        };

        match verify(
            config.webhook_secret.as_bytes(),
            signature,
            timestamp,
            &request.body,
            parsed,
        ) {
            Ok(Verdict::Accepted(scheme)) => {
                info!(scheme = scheme.as_str(), "webhook_signature_verified");
                Some(scheme)
            }
            Ok(Verdict::Rejected) => {
                warn!("webhook_signature_invalid");
                return Outcome::InvalidSignature;
            }
            Err(e) => {
                error!(error = %e, "webhook_signature_verify_error");
                return Outcome::VerificationError;
            }
        }
    } else {
        None
    };

    let payload = match decoded {
        Ok(payload) => payload,
        Err(e) => return processing_error(e, request.body.len()),
    };

    if skip_self_message(config, &payload) {
        info!("webhook_self_message_skipped");
        return Outcome::SelfMessageSkipped;
    }

    // The record is fully built before the single log call.
    let record = format_record(&payload);
    info!("{record}");

    Outcome::Accepted(scheme)
}

fn skip_self_message(config: &Config, payload: &Value) -> bool {
    !config.include_self_messages && is_self_message(payload)
}

fn processing_error(e: PayloadError, body_length: usize) -> Outcome {
    error!(error = %e, error_debug = ?e, body_length, "webhook_processing_failed");
    Outcome::ProcessingError(e.to_string())
}

/// Log the header map and a lossy prefix of the body.
fn log_request_snapshot(request: &IncomingRequest, body_log_limit: usize) {
    info!(headers = ?request.headers, "webhook_request_headers");

    let prefix = &request.body[..request.body.len().min(body_log_limit)];

    if let Err(e) = std::str::from_utf8(prefix) {
        // A sequence cut short by the prefix boundary is not a decode error.
        if e.error_len().is_some() {
            warn!(error = %e, "webhook_request_body_decode_error");
        }
    }

    info!(
        body = %String::from_utf8_lossy(prefix),
        body_length = request.body.len(),
        "webhook_request_body"
    );
}

//! Webhook payload decoding and value helpers.
//!
//! Payloads are arbitrary JSON. They are kept as [`serde_json::Value`] with
//! insertion order preserved so the formatted record lists fields in the
//! order the sender wrote them.

pub mod format;

use serde_json::{Map, Value};
use thiserror::Error;

pub use format::{display_timestamp, format_record, pretty_format};

/// Errors raised while turning the raw body into a payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The body is not valid UTF-8 JSON.
    #[error("failed to decode JSON payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Decode the raw request body as JSON.
///
/// An empty body decodes to an empty object, so that a bare signed ping is
/// still a loggable payload.
pub fn decode_body(raw: &[u8]) -> Result<Value, PayloadError> {
    if raw.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    Ok(serde_json::from_slice(raw)?)
}

/// Text form of a JSON value: strings verbatim, everything else as compact JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Loose truthiness used for flags such as `isSelf`.
///
/// `null`, `false`, zero, and empty strings/arrays/objects are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Whether the payload is flagged as originating from the receiving account.
pub fn is_self_message(payload: &Value) -> bool {
    payload.get("isSelf").map(is_truthy).unwrap_or(false)
}

//! Signature and timestamp lookup across headers, query string and body.
//!
//! Senders disagree on where credentials go, so each value is searched in
//! three tiers: request headers, then query parameters, then top-level JSON
//! body fields. A value found in a higher tier is never replaced by a lower
//! one.

use axum::http::HeaderMap;
use serde_json::Value;
use url::form_urlencoded;

use crate::payload::value_text;

/// Header names carrying the signature, in priority order.
pub const SIGNATURE_HEADERS: &[&str] = &["X-Webhook-Signature", "X-Signature", "Signature", "Sign"];

/// Header names carrying the timestamp, in priority order.
pub const TIMESTAMP_HEADERS: &[&str] = &["X-Webhook-Timestamp", "X-Timestamp", "Timestamp"];

/// Query parameters carrying the signature, in priority order.
pub const SIGNATURE_PARAMS: &[&str] = &["sign", "signature"];

/// Query parameters carrying the timestamp, in priority order.
pub const TIMESTAMP_PARAMS: &[&str] = &["timestamp", "ts"];

/// Body fields carrying the signature, in priority order.
pub const SIGNATURE_FIELDS: &[&str] = &["Signature", "signature", "sign"];

/// Body fields carrying the timestamp, in priority order.
pub const TIMESTAMP_FIELDS: &[&str] = &["Timestamp", "timestamp", "ts", "timestamp_ms"];

/// Signature and timestamp as found on a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCredentials {
    pub signature: Option<String>,
    pub timestamp: Option<String>,
}

impl ResolvedCredentials {
    /// Both values, if both were found.
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (self.signature.as_deref(), self.timestamp.as_deref()) {
            (Some(signature), Some(timestamp)) => Some((signature, timestamp)),
            _ => None,
        }
    }

    fn is_complete(&self) -> bool {
        self.signature.is_some() && self.timestamp.is_some()
    }

    /// Fill whichever fields are still empty from one source tier.
    fn fill_from<F>(&mut self, signature_keys: &[&str], timestamp_keys: &[&str], lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.signature.is_none() {
            self.signature = first_present(signature_keys, &lookup);
        }
        if self.timestamp.is_none() {
            self.timestamp = first_present(timestamp_keys, &lookup);
        }
    }
}

/// Return the first candidate key whose lookup yields a non-empty value.
pub fn first_present<F>(candidates: &[&str], lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    candidates
        .iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
}

/// Resolve credentials for a request.
///
/// `body` is the decoded payload when decoding succeeded; only a JSON object
/// contributes fields.
pub fn resolve_credentials(
    headers: &HeaderMap,
    query: Option<&str>,
    body: Option<&Value>,
) -> ResolvedCredentials {
    let mut creds = ResolvedCredentials::default();

    creds.fill_from(SIGNATURE_HEADERS, TIMESTAMP_HEADERS, |name| {
        header_value(headers, name)
    });

    if creds.is_complete() {
        return creds;
    }

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        creds.fill_from(SIGNATURE_PARAMS, TIMESTAMP_PARAMS, |name| {
            query_param(query, name)
        });
    }

    if let Some(fields) = body.and_then(Value::as_object) {
        creds.fill_from(SIGNATURE_FIELDS, TIMESTAMP_FIELDS, |name| {
            fields.get(name).map(value_text)
        });
    }

    creds
}

/// First value of a header, if it is visible ASCII.
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// First non-empty value of a query parameter.
fn query_param(query: &str, name: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

//! Webhook signature verification.
//!
//! Two HMAC-SHA256 schemes are accepted, both producing a lower-case hex
//! digest:
//!
//! - **legacy**: HMAC over the timestamp followed by the raw body bytes
//! - **structured**: HMAC over `"{Wxid}:{MessageType}:{Timestamp}"` taken
//!   from the JSON body
//!
//! A request is accepted when either scheme matches.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, warn};

use crate::payload::value_text;

type HmacSha256 = Hmac<Sha256>;

/// Sender identifier field signed by the structured scheme.
pub const STRUCTURED_ID_FIELD: &str = "Wxid";

/// Message type field signed by the structured scheme.
pub const STRUCTURED_TYPE_FIELD: &str = "MessageType";

/// Epoch timestamp field signed by the structured scheme.
pub const STRUCTURED_TIMESTAMP_FIELD: &str = "Timestamp";

/// Internal failure while computing a signature.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid HMAC key: {0}")]
    InvalidKey(#[from] hmac::digest::InvalidLength),
    /// A hex digest can only ever be ASCII; anything else is a malformed input.
    #[error("signature contains non-ASCII characters")]
    NonAsciiSignature,
}

/// Signature scheme that matched a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Legacy,
    Structured,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Legacy => "legacy",
            Scheme::Structured => "structured",
        }
    }
}

/// Result of checking a request against both schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted(Scheme),
    Rejected,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }
}

/// Compute the legacy signature: HMAC-SHA256(secret, timestamp + raw_body).
///
/// The body is fed as received; it must never be re-serialized first.
pub fn sign_legacy(secret: &[u8], timestamp: &str, raw_body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret)?;
    mac.update(timestamp.as_bytes());
    mac.update(raw_body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a legacy signature. Missing inputs fail closed.
///
/// A non-ASCII signature is reported as [`SignatureError::NonAsciiSignature`]
/// rather than a plain mismatch.
pub fn verify_legacy(
    secret: &[u8],
    timestamp: &str,
    raw_body: &[u8],
    signature: &str,
) -> Result<bool, SignatureError> {
    if timestamp.is_empty() || signature.is_empty() {
        return Ok(false);
    }

    if !signature.is_ascii() {
        return Err(SignatureError::NonAsciiSignature);
    }

    let expected = sign_legacy(secret, timestamp, raw_body)?;
    Ok(constant_time_compare(&expected, signature))
}

/// Build the string signed by the structured scheme.
///
/// Returns `None` when the payload is not an object, a field is missing or
/// null, or the timestamp cannot be read as an integer.
pub fn structured_message(payload: &Value) -> Option<String> {
    let fields = payload.as_object()?;
    let id = fields.get(STRUCTURED_ID_FIELD).filter(|v| !v.is_null())?;
    let msg_type = fields.get(STRUCTURED_TYPE_FIELD).filter(|v| !v.is_null())?;
    let timestamp = fields.get(STRUCTURED_TIMESTAMP_FIELD).and_then(integer_value)?;

    Some(format!(
        "{}:{}:{}",
        value_text(id),
        value_text(msg_type),
        timestamp
    ))
}

/// Read an integer from a number (floats truncate) or an integer string.
fn integer_value(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.abs() < i128::MAX as f64)
                    .map(|f| f.trunc() as i128)
            }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Compute the structured signature, if the payload carries the signed fields.
pub fn sign_structured(secret: &[u8], payload: &Value) -> Result<Option<String>, SignatureError> {
    let Some(message) = structured_message(payload) else {
        return Ok(None);
    };

    let mut mac = HmacSha256::new_from_slice(secret)?;
    mac.update(message.as_bytes());
    Ok(Some(hex::encode(mac.finalize().into_bytes())))
}

/// Verify a structured signature. Missing or malformed fields, and
/// non-ASCII signatures, fail closed.
pub fn verify_structured(
    secret: &[u8],
    payload: &Value,
    signature: &str,
) -> Result<bool, SignatureError> {
    match sign_structured(secret, payload)? {
        Some(expected) => Ok(constant_time_compare(&expected, signature)),
        None => {
            debug!("structured_signature_fields_missing");
            Ok(false)
        }
    }
}

/// Check a request against both schemes.
///
/// The structured scheme is only tried when the body decoded to a JSON
/// object. When both schemes match, the structured one is reported.
pub fn verify(
    secret: &[u8],
    signature: &str,
    timestamp: &str,
    raw_body: &[u8],
    payload: Option<&Value>,
) -> Result<Verdict, SignatureError> {
    let structured_ok = match payload.filter(|p| p.is_object()) {
        Some(object) => verify_structured(secret, object, signature)?,
        None => false,
    };

    let legacy_ok = verify_legacy(secret, timestamp, raw_body, signature)?;

    let verdict = if structured_ok {
        Verdict::Accepted(Scheme::Structured)
    } else if legacy_ok {
        Verdict::Accepted(Scheme::Legacy)
    } else {
        warn!(
            signature_length = signature.len(),
            has_object_body = payload.is_some_and(|p| p.is_object()),
            "signature_mismatch"
        );
        Verdict::Rejected
    };

    debug!(structured_ok, legacy_ok, "signature_checked");

    Ok(verdict)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &[u8] = b"s3cr3t";

    fn hmac_hex(secret: &[u8], message: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(message);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_sign_legacy_matches_concatenation() {
        let signature = sign_legacy(SECRET, "1700000000", b"{}").unwrap();
        assert_eq!(signature, hmac_hex(SECRET, b"1700000000{}"));
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_verify_legacy_round_trip() {
        let body = br#"{"Content":"hello","Timestamp":1700000000}"#;
        let signature = sign_legacy(SECRET, "1700000000", body).unwrap();
        assert!(verify_legacy(SECRET, "1700000000", body, &signature).unwrap());
    }

    #[test]
    fn test_verify_legacy_tampered_body() {
        let body = br#"{"Content":"hello"}"#.to_vec();
        let signature = sign_legacy(SECRET, "1700000000", &body).unwrap();

        for idx in 0..body.len() {
            let mut tampered = body.clone();
            tampered[idx] ^= 0x01;
            assert!(!verify_legacy(SECRET, "1700000000", &tampered, &signature).unwrap());
        }
    }

    #[test]
    fn test_verify_legacy_is_byte_exact() {
        // Same JSON, different layout: the digest must differ.
        let signature = sign_legacy(SECRET, "1", br#"{"a":1}"#).unwrap();
        assert!(!verify_legacy(SECRET, "1", br#"{ "a": 1 }"#, &signature).unwrap());
    }

    #[test]
    fn test_verify_legacy_missing_fields() {
        let signature = sign_legacy(SECRET, "", b"{}").unwrap();
        assert!(!verify_legacy(SECRET, "", b"{}", &signature).unwrap());
        assert!(!verify_legacy(SECRET, "1700000000", b"{}", "").unwrap());
    }

    #[test]
    fn test_verify_legacy_wrong_secret_and_case() {
        let signature = sign_legacy(SECRET, "1700000000", b"{}").unwrap();
        assert!(!verify_legacy(b"other", "1700000000", b"{}", &signature).unwrap());
        assert!(!verify_legacy(SECRET, "1700000000", b"{}", &signature.to_uppercase()).unwrap());
    }

    #[test]
    fn test_structured_message() {
        let payload = json!({"Wxid": "wxid_abc", "MessageType": 1, "Timestamp": "1700000000"});
        assert_eq!(
            structured_message(&payload).as_deref(),
            Some("wxid_abc:1:1700000000")
        );

        let payload = json!({"Wxid": "wxid_abc", "MessageType": "text", "Timestamp": 1700000000.7});
        assert_eq!(
            structured_message(&payload).as_deref(),
            Some("wxid_abc:text:1700000000")
        );

        let payload = json!({"Wxid": "w", "MessageType": 1, "Timestamp": " -42 "});
        assert_eq!(structured_message(&payload).as_deref(), Some("w:1:-42"));
    }

    #[test]
    fn test_structured_message_wide_timestamps() {
        let payload = json!({"Wxid": "w", "MessageType": 1, "Timestamp": u64::MAX});
        assert_eq!(
            structured_message(&payload).as_deref(),
            Some("w:1:18446744073709551615")
        );

        let payload = json!({"Wxid": "w", "MessageType": 1, "Timestamp": "18446744073709551616"});
        assert_eq!(
            structured_message(&payload).as_deref(),
            Some("w:1:18446744073709551616")
        );

        let payload = json!({"Wxid": "w", "MessageType": 1, "Timestamp": 1e20});
        assert_eq!(
            structured_message(&payload).as_deref(),
            Some("w:1:100000000000000000000")
        );
    }

    #[test]
    fn test_structured_message_fails_closed() {
        assert_eq!(structured_message(&json!({"MessageType": 1, "Timestamp": 1})), None);
        assert_eq!(structured_message(&json!({"Wxid": "w", "Timestamp": 1})), None);
        assert_eq!(structured_message(&json!({"Wxid": "w", "MessageType": 1})), None);
        assert_eq!(
            structured_message(&json!({"Wxid": null, "MessageType": 1, "Timestamp": 1})),
            None
        );
        assert_eq!(
            structured_message(&json!({"Wxid": "w", "MessageType": 1, "Timestamp": "1.5"})),
            None
        );
        assert_eq!(
            structured_message(&json!({"Wxid": "w", "MessageType": 1, "Timestamp": true})),
            None
        );
        assert_eq!(structured_message(&json!(["Wxid", "MessageType", "Timestamp"])), None);
    }

    #[test]
    fn test_verify_structured_round_trip() {
        let payload = json!({"Wxid": "wxid_abc", "MessageType": 49, "Timestamp": 1700000000, "Content": "x"});
        let signature = sign_structured(SECRET, &payload).unwrap().unwrap();
        assert_eq!(signature, hmac_hex(SECRET, b"wxid_abc:49:1700000000"));
        assert!(verify_structured(SECRET, &payload, &signature).unwrap());
    }

    #[test]
    fn test_verify_structured_ignores_other_fields() {
        let payload = json!({"Wxid": "wxid_abc", "MessageType": 49, "Timestamp": 1700000000, "Content": "x"});
        let signature = sign_structured(SECRET, &payload).unwrap().unwrap();

        let edited = json!({"Wxid": "wxid_abc", "MessageType": 49, "Timestamp": 1700000000, "Content": "y"});
        assert!(verify_structured(SECRET, &edited, &signature).unwrap());

        let edited = json!({"Wxid": "wxid_xyz", "MessageType": 49, "Timestamp": 1700000000});
        assert!(!verify_structured(SECRET, &edited, &signature).unwrap());
    }

    #[test]
    fn test_verify_accepts_either_scheme() {
        let body = br#"{"Wxid":"wxid_abc","MessageType":1,"Timestamp":1700000000}"#;
        let payload: Value = serde_json::from_slice(body).unwrap();

        let legacy = sign_legacy(SECRET, "1700000000", body).unwrap();
        assert_eq!(
            verify(SECRET, &legacy, "1700000000", body, Some(&payload)).unwrap(),
            Verdict::Accepted(Scheme::Legacy)
        );

        let structured = sign_structured(SECRET, &payload).unwrap().unwrap();
        assert_eq!(
            verify(SECRET, &structured, "1700000000", body, Some(&payload)).unwrap(),
            Verdict::Accepted(Scheme::Structured)
        );

        assert_eq!(
            verify(SECRET, "deadbeef", "1700000000", body, Some(&payload)).unwrap(),
            Verdict::Rejected
        );
    }

    #[test]
    fn test_verify_tampered_body_keeps_structured_match() {
        let body = br#"{"Wxid":"wxid_abc","MessageType":1,"Timestamp":1700000000,"Content":"a"}"#;
        let tampered = br#"{"Wxid":"wxid_abc","MessageType":1,"Timestamp":1700000000,"Content":"b"}"#;
        let payload: Value = serde_json::from_slice(tampered).unwrap();

        let legacy = sign_legacy(SECRET, "1700000000", body).unwrap();
        assert_eq!(
            verify(SECRET, &legacy, "1700000000", tampered, Some(&payload)).unwrap(),
            Verdict::Rejected
        );

        let structured = sign_structured(SECRET, &payload).unwrap().unwrap();
        assert!(verify(SECRET, &structured, "1700000000", tampered, Some(&payload))
            .unwrap()
            .is_accepted());
    }

    #[test]
    fn test_verify_skips_structured_for_non_object() {
        let body = b"[1,2,3]";
        let payload: Value = serde_json::from_slice(body).unwrap();
        let legacy = sign_legacy(SECRET, "5", body).unwrap();
        assert_eq!(
            verify(SECRET, &legacy, "5", body, Some(&payload)).unwrap(),
            Verdict::Accepted(Scheme::Legacy)
        );
        assert_eq!(
            verify(SECRET, &legacy, "5", body, None).unwrap(),
            Verdict::Accepted(Scheme::Legacy)
        );
    }

    #[test]
    fn test_verify_legacy_non_ascii_signature_is_error() {
        let result = verify_legacy(SECRET, "1", b"{}", "\u{e9}");
        assert!(matches!(result, Err(SignatureError::NonAsciiSignature)));
    }

    #[test]
    fn test_verify_non_ascii_signature_errors_even_with_structured_body() {
        let body = br#"{"Wxid":"wxid_abc","MessageType":1,"Timestamp":1700000000}"#;
        let payload: Value = serde_json::from_slice(body).unwrap();

        assert!(!verify_structured(SECRET, &payload, "\u{e9}").unwrap());
        assert!(matches!(
            verify(SECRET, "\u{e9}", "1700000000", body, Some(&payload)),
            Err(SignatureError::NonAsciiSignature)
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(!constant_time_compare("abc", ""));
    }
}

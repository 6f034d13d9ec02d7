//! Configuration module for environment variable parsing.
//!
//! All settings are read once at startup and never change afterwards. The
//! resulting [`Config`] is shared read-only between request handlers.

use std::env;
use tracing::warn;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines, matching the formatted payload records.
    Text,
    /// Flattened JSON objects, one per line.
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret used as the HMAC key. Empty disables verification.
    pub webhook_secret: String,

    /// Whether messages flagged `isSelf` are processed or skipped
    pub include_self_messages: bool,

    // =========================================================================
    // Web Server Configuration
    // =========================================================================

    /// Port for the web server to listen on
    pub port: u16,

    /// Path the webhook endpoint is mounted on
    pub webhook_path: String,

    /// Maximum accepted request body in bytes
    pub body_limit_bytes: usize,

    // =========================================================================
    // Logging Configuration
    // =========================================================================

    /// File that mirrors the console log, if any
    pub log_file: Option<String>,

    /// Log line format for both console and file
    pub log_format: LogFormat,

    /// Number of body bytes echoed into the request log
    pub body_log_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            webhook_secret: String::new(),
            include_self_messages: true,
            port: 8000,
            webhook_path: "/webhook".to_string(),
            body_limit_bytes: 2 * 1024 * 1024,
            log_file: Some("webhook.log".to_string()),
            log_format: LogFormat::Text,
            body_log_limit: 500,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            webhook_secret: env::var("WEBHOOK_SECRET").unwrap_or_default(),

            include_self_messages: parse_bool(
                "INCLUDE_SELF_MESSAGE",
                defaults.include_self_messages,
            ),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),

            webhook_path: env::var("WEBHOOK_PATH")
                .ok()
                .map(|p| p.trim().to_string())
                .filter(|p| p.starts_with('/'))
                .unwrap_or(defaults.webhook_path),

            body_limit_bytes: env::var("BODY_LIMIT_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.body_limit_bytes),

            log_file: match env::var("WEBHOOK_LOG_FILE") {
                Ok(path) if path.trim().is_empty() => None,
                Ok(path) => Some(path),
                Err(_) => defaults.log_file,
            },

            log_format: parse_log_format("LOG_FORMAT", defaults.log_format),

            body_log_limit: env::var("BODY_LOG_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.body_log_limit),
        }
    }

    /// Whether requests must carry a valid signature.
    pub fn verification_enabled(&self) -> bool {
        !self.webhook_secret.is_empty()
    }
}

/// Parse a boolean flag such as "true", "0" or "off".
fn parse_bool(name: &str, default: bool) -> bool {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match parse_bool_value(&raw) {
        Some(value) => value,
        None => {
            warn!(env_var = name, value = %raw, "Invalid boolean value, using default");
            default
        }
    }
}

fn parse_bool_value(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse the log format name, falling back to the default on unknown values.
fn parse_log_format(name: &str, default: LogFormat) -> LogFormat {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "text" | "plain" => LogFormat::Text,
        "json" => LogFormat::Json,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid log format, using default");
            default
        }
    }
}

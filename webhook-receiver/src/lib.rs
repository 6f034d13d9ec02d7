//! Hooklog - signed webhook receiver.
//!
//! This library provides the pieces behind the `hooklog-web` binary:
//! - `web`: router, handlers, credential lookup and signature verification
//! - `ingest`: per-request orchestration from raw bytes to an [`Outcome`]
//! - `payload`: JSON decoding and the human-readable record formatter
//!
//! ## Architecture
//!
//! ```text
//! Webhook → Router → ingest() → verify → format → log sink
//! ```

pub mod config;
pub mod ingest;
pub mod logging;
pub mod payload;
pub mod web;

// Re-export commonly used types
pub use config::{Config, LogFormat};
pub use ingest::{ingest, IncomingRequest, Outcome};
pub use payload::{format_record, pretty_format, PayloadError};
pub use web::{router, AppState, ResolvedCredentials, Scheme, SignatureError, Verdict};

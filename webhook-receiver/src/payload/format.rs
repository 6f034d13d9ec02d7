//! Human-readable rendering of webhook payloads.
//!
//! A record looks like:
//!
//! ```text
//! Received webhook message at 2023-11-14 22:13:20:
//! - Wxid: wxid_abc
//! - Data:
//!   - Content: hello
//!   - Tags:
//!     - [0]:
//!       urgent
//! ```

use std::fmt::Display;

use chrono::{Datelike, Local, TimeZone};
use serde_json::Value;

use super::value_text;

/// Top-level keys searched, in order, for the record timestamp.
pub const DISPLAY_TIMESTAMP_KEYS: &[&str] = &["Timestamp", "timestamp", "ts"];

/// Rendered when the payload carries no timestamp field.
pub const MISSING_TIMESTAMP: &str = "none";

const INDENT_UNIT: &str = "  ";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Years that fit the four-digit `%Y` rendering.
const DISPLAY_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Render a JSON value as an indented, line-oriented dump.
///
/// Object keys become `- key:` lines, array elements become `- [i]:` lines,
/// and each nesting level adds two spaces of indentation.
pub fn pretty_format(value: &Value, indent: usize) -> String {
    let mut out = String::new();
    write_value(&mut out, value, indent);
    out
}

fn write_value(out: &mut String, value: &Value, indent: usize) {
    let pad = INDENT_UNIT.repeat(indent);

    match value {
        Value::Object(map) => {
            for (key, item) in map {
                out.push_str(&pad);
                out.push_str("- ");
                out.push_str(key);
                out.push(':');
                if is_container(item) {
                    out.push('\n');
                    write_value(out, item, indent + 1);
                } else {
                    out.push(' ');
                    out.push_str(&value_text(item));
                    out.push('\n');
                }
            }
        }
        Value::Array(items) => {
            // Elements always recurse so the index marker is never lost.
            for (idx, item) in items.iter().enumerate() {
                out.push_str(&format!("{pad}- [{idx}]:\n"));
                write_value(out, item, indent + 1);
            }
        }
        scalar => {
            out.push_str(&pad);
            out.push_str(&value_text(scalar));
            out.push('\n');
        }
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Resolve the display timestamp of a payload in the given time zone.
///
/// Numeric values and all-digit strings are read as epoch seconds. Any other
/// value, or an epoch outside years 1 to 9999 (such as a millisecond value),
/// is shown as raw text.
pub fn display_timestamp<Tz>(payload: &Value, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(raw) = find_timestamp(payload) else {
        return MISSING_TIMESTAMP.to_string();
    };

    epoch_seconds(raw)
        .and_then(|secs| tz.timestamp_opt(secs, 0).earliest())
        .filter(|dt| DISPLAY_YEARS.contains(&dt.year()))
        .map(|dt| dt.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| value_text(raw))
}

fn find_timestamp(payload: &Value) -> Option<&Value> {
    let map = payload.as_object()?;
    DISPLAY_TIMESTAMP_KEYS.iter().find_map(|key| map.get(*key))
}

fn epoch_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    }
}

/// Build the full log record for a payload, timestamps in local time.
pub fn format_record(payload: &Value) -> String {
    format_record_in(payload, &Local)
}

/// Build the full log record for a payload in the given time zone.
pub fn format_record_in<Tz>(payload: &Value, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "Received webhook message at {}:\n{}",
        display_timestamp(payload, tz),
        pretty_format(payload, 0)
    )
}

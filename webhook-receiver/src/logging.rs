//! Log subscriber setup.
//!
//! Events go to the console and, when configured, are mirrored into an
//! append-only log file. The file writer sits behind a mutex so each event
//! is written in one piece even when requests log concurrently.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LogFormat};

/// Install the global subscriber described by the configuration.
pub fn init_logging(config: &Config) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file = config
        .log_file
        .as_deref()
        .map(open_log_file)
        .transpose()?;

    let json = config.log_format == LogFormat::Json;

    let console_text = (!json).then(|| fmt::layer());
    let console_json = json.then(|| fmt::layer().json().flatten_event(true));

    let (file_text, file_json) = match file {
        Some(file) if json => (
            None,
            Some(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(Mutex::new(file)),
            ),
        ),
        Some(file) => (
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            None,
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_text)
        .with(console_json)
        .with(file_text)
        .with(file_json)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(())
}

/// Open (or create) the log file for appending.
pub fn open_log_file(path: &str) -> Result<File> {
    let path = Path::new(path);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

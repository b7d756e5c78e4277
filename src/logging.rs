// src/logging.rs

//! Logging setup for `pipewright` using `tracing` + `tracing-subscriber`,
//! plus the diagnostic line every stage uses to report a failure.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `PIPEWRIGHT_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that tool stdout stays readable.

use std::fmt::Display;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};
use tracing::{error, info};
use tracing_subscriber::fmt;

use crate::cli::LogLevel;
use crate::errors::PipewrightError;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("PIPEWRIGHT_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

/// Log a `tag> value` line in yellow.
pub fn log_value(tag: &str, value: impl Display) {
    let line = format!("{tag}> {value}");
    info!("{}", line.if_supports_color(Stream::Stderr, |s| s.yellow()));
}

/// Report a failure that was caught at a stage boundary.
///
/// The error is turned into one structured log event; it is never
/// re-raised from here.
pub fn report_failure(source: &str, err: &PipewrightError) {
    let line = format_failure(source, err, true);
    error!(source, kind = err.kind(), "{line}");
}

/// Render the diagnostic line for a failure.
///
/// With a location:    `tag> Kind: file: Line L & Column C: message`
/// Without a location: `tag> Kind: message`
pub fn format_failure(source: &str, err: &PipewrightError, colored: bool) -> String {
    let paint = |text: String, color: fn(&String) -> String| {
        if colored { color(&text) } else { text }
    };
    let red = |s: &String| s.if_supports_color(Stream::Stderr, |t| t.red()).to_string();
    let yellow = |s: &String| s.if_supports_color(Stream::Stderr, |t| t.yellow()).to_string();
    let magenta = |s: &String| s.if_supports_color(Stream::Stderr, |t| t.magenta()).to_string();

    let head = format!(
        "{}> {}: ",
        paint(source.to_string(), red),
        paint(err.kind().to_string(), red)
    );

    match err {
        PipewrightError::Transform(t) if t.file.is_some() => {
            let file = t
                .file
                .as_ref()
                .map(|f| f.display().to_string())
                .unwrap_or_default();
            let line = t.line.map(|l| l.to_string()).unwrap_or_else(|| "?".into());
            let column = t.column.map(|c| c.to_string()).unwrap_or_else(|| "?".into());
            format!(
                "{head}{}: Line {} & Column {}: {}",
                paint(file, yellow),
                paint(line, magenta),
                paint(column, magenta),
                paint(t.message.clone(), yellow)
            )
        }
        PipewrightError::Transform(t) => {
            format!("{head}{}", paint(t.message.clone(), yellow))
        }
        other => format!("{head}{}", paint(other.to_string(), yellow)),
    }
}

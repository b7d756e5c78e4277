// src/errors.rs

//! Crate-wide error types.
//!
//! - `ConfigError`: unrecognized flags or an invalid `Pipewright.toml`.
//! - `Transform`: a transpile / bundle / minify failure for one unit.
//! - `ToolError`: an external process (lint, test, transpiler) failed.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipewrightError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("{tool} failed: {message}")]
    ToolError { tool: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipewrightError {
    /// Short error name used as the `Kind` part of a diagnostic line.
    pub fn kind(&self) -> &str {
        match self {
            PipewrightError::ConfigError(_) => "ConfigError",
            PipewrightError::Transform(err) => &err.kind,
            PipewrightError::ToolError { .. } => "ToolError",
            PipewrightError::IoError(_) => "IoError",
            PipewrightError::TomlError(_) => "TomlError",
            PipewrightError::JsonError(_) => "JsonError",
            PipewrightError::Other(_) => "Error",
        }
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        PipewrightError::ToolError {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// A failure while transforming a single unit of source.
///
/// `file`, `line` and `column` are filled in when the failing tool reported
/// a location.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct TransformError {
    pub kind: String,
    pub file: Option<PathBuf>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub message: String,
}

impl TransformError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            file: None,
            line: None,
            column: None,
            message: message.into(),
        }
    }

    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(file) = &self.file {
            write!(f, " in {}", file.display())?;
            if let (Some(line), Some(column)) = (self.line, self.column) {
                write!(f, ":{line}:{column}")?;
            }
        }
        write!(f, ": {}", self.message)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipewrightError>;

// src/platform/transpile.rs

//! Dialect transformation seam.
//!
//! The strategies never spawn a transpiler themselves; they go through a
//! [`Transpiler`], so tests can count invocations without running `babel`.

use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::config::ToolsSection;
use crate::errors::{Result, TransformError};
use crate::exec::tool::{ToolInvocation, last_lines, spawn_tool};
use crate::types::Language;

/// Boxed future returned by [`Transpiler::transpile`].
pub type TranspileFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// Turns one source file of the configured dialect into plain JavaScript.
///
/// `file` is the project-relative path, used for diagnostics. Output may end
/// with an inline source map comment, which the stage set picks up.
pub trait Transpiler: Send + Sync + Debug {
    fn transpile<'a>(&'a self, source: &'a str, file: &'a str) -> TranspileFuture<'a>;
}

/// Pass-through used for `es6`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTranspiler;

impl Transpiler for NoopTranspiler {
    fn transpile<'a>(&'a self, source: &'a str, _file: &'a str) -> TranspileFuture<'a> {
        Box::pin(async move { Ok(source.to_string()) })
    }
}

/// Runs the `[tools] transpiler` command with the source on stdin.
#[derive(Debug, Clone)]
pub struct CommandTranspiler {
    command: String,
    cwd: PathBuf,
}

impl CommandTranspiler {
    pub fn new(command: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            cwd: cwd.into(),
        }
    }
}

impl Transpiler for CommandTranspiler {
    fn transpile<'a>(&'a self, source: &'a str, file: &'a str) -> TranspileFuture<'a> {
        Box::pin(async move {
            let invocation = ToolInvocation::new("transpile", &self.command)
                .env("PIPEWRIGHT_FILE", file)
                .cwd(&self.cwd)
                .stdin(source)
                .capture_stdout();
            let outcome = spawn_tool(&invocation).await?;
            if outcome.success {
                debug!(%file, bytes = outcome.stdout.len(), "transpiled");
                return Ok(outcome.stdout);
            }
            Err(parse_transpile_error(file, &outcome.stderr).into())
        })
    }
}

/// `(line:column)` as printed by babel-style tools.
static LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+):(\d+)\)").expect("valid location regex"));

/// `SyntaxError: ...` or `TypeError: ...` at the start of a line.
static ERROR_KIND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\S+:\s*)?([A-Z][A-Za-z]*Error):\s*(.*)$").expect("valid kind regex"));

/// Build a located [`TransformError`] from a failed transpiler's stderr.
pub fn parse_transpile_error(file: &str, stderr: &str) -> TransformError {
    let first = stderr
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");

    let (kind, mut message) = match ERROR_KIND.captures(first) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None if first.is_empty() => (
            "TranspileError".to_string(),
            "transpiler failed without output".to_string(),
        ),
        None => ("TranspileError".to_string(), last_lines(stderr, 1)),
    };

    // babel repeats the file name at the front of the message.
    if let Some(rest) = message.strip_prefix(&format!("{file}: ")) {
        message = rest.to_string();
    }

    let mut err = TransformError::new(kind, message.clone()).in_file(file);
    if let Some(caps) = LOCATION.captures(stderr) {
        let line = caps[1].parse().unwrap_or(0);
        let column = caps[2].parse().unwrap_or(0);
        err = err.at(line, column);
        err.message = LOCATION.replace(&message, "").trim().to_string();
    }
    err
}

/// The transpiler for `language`.
pub fn transpiler_for(
    language: &Language,
    tools: &ToolsSection,
    root: impl Into<PathBuf>,
) -> Arc<dyn Transpiler> {
    if language.is_es6() {
        Arc::new(NoopTranspiler)
    } else {
        Arc::new(CommandTranspiler::new(tools.transpiler.clone(), root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn babel_syntax_error_is_located() {
        let stderr = "SyntaxError: src/app.js: Unexpected token, expected \",\" (3:14)\n\n  1 | ...\n";
        let err = parse_transpile_error("src/app.js", stderr);
        assert_eq!(err.kind, "SyntaxError");
        assert_eq!(err.file.as_deref(), Some(std::path::Path::new("src/app.js")));
        assert_eq!((err.line, err.column), (Some(3), Some(14)));
        assert_eq!(err.message, "Unexpected token, expected \",\"");
    }

    #[test]
    fn unknown_output_is_kept_as_message() {
        let err = parse_transpile_error("src/a.js", "boom\n");
        assert_eq!(err.kind, "TranspileError");
        assert_eq!(err.message, "boom");
        assert_eq!(err.line, None);
    }
}

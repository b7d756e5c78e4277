// src/exec/tool.rs

//! External tool process runner.
//!
//! Lint, test and transpile commands are plain shell strings from
//! `[tools]`. They run through `sh -c` with file arguments passed as
//! positional parameters (`"$@"`), so paths never need quoting.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{PipewrightError, Result};

/// One run of an external tool.
#[derive(Debug, Clone, Default)]
pub struct ToolInvocation {
    /// Short name used in logs and diagnostics (`lint`, `test`, ...).
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    /// Written to the child's stdin, which is otherwise closed.
    pub stdin: Option<String>,
    /// Collect stdout instead of forwarding it to our stdout.
    pub capture_stdout: bool,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn capture_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    /// The full `sh -c` script.
    pub fn script(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} \"$@\"", self.command)
        }
    }
}

/// How a tool process ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutcome {
    pub exit_code: i32,
    pub success: bool,
    /// Captured stdout; empty unless `capture_stdout` was set.
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutcome {
    /// `Ok(self)` on success, else a `ToolError` carrying the tail of stderr.
    pub fn check(self, tool: &str) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let detail = last_lines(&self.stderr, 5);
        let message = if detail.is_empty() {
            format!("exited with code {}", self.exit_code)
        } else {
            format!("exited with code {}: {detail}", self.exit_code)
        };
        Err(PipewrightError::tool(tool, message))
    }
}

/// Run `invocation` to completion.
///
/// A non-zero exit becomes a `ToolError` carrying the tail of stderr, so the
/// caller can report it and move on.
pub async fn run_tool(invocation: &ToolInvocation) -> Result<ToolOutcome> {
    spawn_tool(invocation).await?.check(&invocation.name)
}

/// Run `invocation` and report how it ended without judging the exit code.
///
/// Only a failure to start or wait on the process is an error.
pub async fn spawn_tool(invocation: &ToolInvocation) -> Result<ToolOutcome> {
    info!(
        tool = %invocation.name,
        cmd = %invocation.command,
        files = invocation.args.len(),
        "starting tool process"
    );

    let mut cmd = Command::new("sh");
    // `$0` is the tool name; the files follow as `$1..`.
    cmd.arg("-c")
        .arg(invocation.script())
        .arg(&invocation.name)
        .args(&invocation.args);
    for (key, value) in &invocation.envs {
        cmd.env(key, value);
    }
    if let Some(cwd) = &invocation.cwd {
        cmd.current_dir(cwd);
    }

    cmd.stdin(if invocation.stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(if invocation.capture_stdout {
        Stdio::piped()
    } else {
        Stdio::inherit()
    })
    .stderr(Stdio::piped())
    .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for tool '{}'", invocation.name))?;

    if let (Some(input), Some(mut stdin)) = (invocation.stdin.clone(), child.stdin.take()) {
        tokio::spawn(async move {
            // A tool that exits without reading stdin closes the pipe early.
            let _ = stdin.write_all(input.as_bytes()).await;
        });
    }

    let stdout_task = child.stdout.take().map(|mut stdout| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.map(|_| buf)
        })
    });

    // Always consume stderr so buffers don't fill; log at debug.
    let stderr_task = child.stderr.take().map(|stderr| {
        let name = invocation.name.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(tool = %name, "stderr: {}", line);
                collected.push(line);
            }
            collected.join("\n")
        })
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of tool '{}'", invocation.name))?;

    let stdout = match stdout_task {
        Some(task) => {
            let bytes = task
                .await
                .with_context(|| format!("joining stdout reader of tool '{}'", invocation.name))?
                .map_err(|e| {
                    PipewrightError::tool(&invocation.name, format!("reading stdout failed: {e}"))
                })?;
            String::from_utf8(bytes).map_err(|e| {
                PipewrightError::tool(&invocation.name, format!("stdout is not valid UTF-8: {e}"))
            })?
        }
        None => String::new(),
    };
    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    let code = status.code().unwrap_or(-1);
    info!(
        tool = %invocation.name,
        exit_code = code,
        success = status.success(),
        "tool process exited"
    );

    Ok(ToolOutcome {
        exit_code: code,
        success: status.success(),
        stdout,
        stderr,
    })
}

/// The last `n` non-blank lines of `text`.
pub fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::{DEFAULT_CONFIG_FILE, FlagValue, RawFlags};
use crate::tasks::TaskName;

/// Command-line arguments for `pipewright`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipewright",
    version,
    about = "Build, check and watch a small JavaScript library.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run (config, prepare, clean, lint, test, package, watch,
    /// distribution, default).
    #[arg(value_enum, default_value = "default")]
    pub task: TaskName,

    /// Path to the project config file (TOML). A missing file means defaults.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Target platform: `node` (per-file) or `browser` (bundle).
    #[arg(long = "js-platform", alias = "platform", value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Source dialect; anything other than `es6` is transpiled.
    #[arg(long = "js-language", alias = "language", value_name = "LANGUAGE")]
    pub language: Option<String>,

    /// Production build (enables minification for non-es6 dialects).
    #[arg(long)]
    pub production: bool,

    /// Skip files whose content has not changed since the last build.
    #[arg(long)]
    pub incremental: bool,

    /// Run tests under the coverage tool.
    #[arg(long)]
    pub coverage: bool,

    /// Write the test runner's output to `<target>/mocha.log`.
    #[arg(long)]
    pub report: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEWRIGHT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve config, print the task order and stage plan, run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Flags given on the command line. Boolean switches are only recorded
    /// when set, so they never mask a `true` from the config file.
    pub fn raw_flags(&self) -> RawFlags {
        let mut flags = RawFlags::new();
        if let Some(platform) = &self.platform {
            flags.insert("platform", FlagValue::Str(platform.clone()));
        }
        if let Some(language) = &self.language {
            flags.insert("language", FlagValue::Str(language.clone()));
        }
        for (name, set) in [
            ("production", self.production),
            ("incremental", self.incremental),
            ("coverage", self.coverage),
            ("report", self.report),
        ] {
            if set {
                flags.insert(name, FlagValue::Bool(true));
            }
        }
        flags
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

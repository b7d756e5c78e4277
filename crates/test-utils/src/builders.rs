#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use pipewright::config::{BuildConfig, ConfigFile, FlagValue, RawConfigFile, RawFlags, resolve};
use pipewright::fs::FileSystem;
use pipewright::fs::mock::MockFileSystem;
use pipewright::pipeline::BuildContext;
use pipewright::platform::transpile::Transpiler;
use pipewright::types::CacheStorageMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ProjectConfigBuilder {
    config: RawConfigFile,
}

impl ProjectConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn sources(mut self, patterns: &[&str]) -> Self {
        self.config.paths.sources = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn tests(mut self, patterns: &[&str]) -> Self {
        self.config.paths.tests = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn entry(mut self, entry: &str) -> Self {
        self.config.paths.entry = entry.to_string();
        self
    }

    pub fn bundle(mut self, name: &str) -> Self {
        self.config.paths.bundle = name.to_string();
        self
    }

    pub fn lint_command(mut self, cmd: &str) -> Self {
        self.config.tools.lint = cmd.to_string();
        self
    }

    pub fn test_command(mut self, cmd: &str) -> Self {
        self.config.tools.test = cmd.to_string();
        self
    }

    pub fn coverage_command(mut self, cmd: &str) -> Self {
        self.config.tools.coverage = cmd.to_string();
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.config.project.version = Some(version.to_string());
        self
    }

    pub fn storage(mut self, mode: CacheStorageMode) -> Self {
        self.config.cache.storage = mode;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ProjectConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RawFlags`.
#[derive(Default)]
pub struct RawFlagsBuilder {
    flags: RawFlags,
}

impl RawFlagsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn platform(mut self, value: &str) -> Self {
        self.flags.insert("js-platform", FlagValue::Str(value.to_string()));
        self
    }

    pub fn language(mut self, value: &str) -> Self {
        self.flags.insert("js-language", FlagValue::Str(value.to_string()));
        self
    }

    pub fn production(mut self, val: bool) -> Self {
        self.flags.insert("production", FlagValue::Bool(val));
        self
    }

    pub fn incremental(mut self, val: bool) -> Self {
        self.flags.insert("incremental", FlagValue::Bool(val));
        self
    }

    pub fn coverage(mut self, val: bool) -> Self {
        self.flags.insert("coverage", FlagValue::Bool(val));
        self
    }

    pub fn report(mut self, val: bool) -> Self {
        self.flags.insert("report", FlagValue::Bool(val));
        self
    }

    pub fn build(self) -> RawFlags {
        self.flags
    }

    /// Resolve straight into a `BuildConfig`.
    pub fn resolve(self) -> BuildConfig {
        resolve(&self.flags).expect("Failed to resolve flags from builder")
    }
}

/// A `BuildContext` over an in-memory tree rooted at `"."`.
///
/// Files in `fs` must be added with `./`-prefixed paths (`./src/index.js`).
pub fn mock_context(
    fs: &MockFileSystem,
    project: &ConfigFile,
    config: BuildConfig,
    transpiler: Arc<dyn Transpiler>,
) -> BuildContext {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    BuildContext {
        config,
        layout: project.layout(PathBuf::from(".")),
        fs,
        transpiler,
    }
}

// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::CacheStorageMode;

/// Project configuration as read from `Pipewright.toml`.
///
/// ```toml
/// [build]
/// platform = "browser"
/// language = "babel"
/// production = true
///
/// [paths]
/// sources = ["src/**/*.js"]
/// entry = "src/index.js"
///
/// [tools]
/// lint = "npx eslint"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    /// Default values for the build flags; CLI flags override them.
    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub cache: CacheSection,
}

/// Validated project configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub project: ProjectSection,
    pub build: BuildSection,
    pub paths: PathsSection,
    pub tools: ToolsSection,
    pub cache: CacheSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            project: raw.project,
            build: raw.build,
            paths: raw.paths,
            tools: raw.tools,
            cache: raw.cache,
        }
    }

    /// Resolve the `[paths]` section against a project root.
    pub fn layout(&self, root: impl Into<PathBuf>) -> ProjectLayout {
        let root = root.into();
        ProjectLayout {
            sources: self.paths.sources.clone(),
            tests: self.paths.tests.clone(),
            entry: PathBuf::from(&self.paths.entry),
            bundle: self.paths.bundle.clone(),
            target: root.join(&self.paths.target),
            lib: root.join(&self.paths.lib),
            root,
        }
    }
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectSection {
    /// Fallback version stamp when there is no `package.json`.
    #[serde(default)]
    pub version: Option<String>,
}

/// `[build]` section. Every field is optional so that an absent value can
/// be told apart from an explicit `false`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BuildSection {
    pub platform: Option<String>,
    pub language: Option<String>,
    pub production: Option<bool>,
    pub incremental: Option<bool>,
    pub coverage: Option<bool>,
    pub report: Option<bool>,
}

/// `[paths]` section. Globs are relative to the project root.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    #[serde(default = "default_tests")]
    pub tests: Vec<String>,

    /// Entry module for browser bundles.
    #[serde(default = "default_entry")]
    pub entry: String,

    /// File name of the browser bundle inside `<target>/browser/`.
    #[serde(default = "default_bundle")]
    pub bundle: String,

    #[serde(default = "default_target")]
    pub target: String,

    #[serde(default = "default_lib")]
    pub lib: String,
}

fn default_sources() -> Vec<String> {
    vec!["src/**/*.js".to_string()]
}

fn default_tests() -> Vec<String> {
    vec!["test/**/*.spec.js".to_string()]
}

fn default_entry() -> String {
    "src/index.js".to_string()
}

fn default_bundle() -> String {
    "index.js".to_string()
}

fn default_target() -> String {
    "target".to_string()
}

fn default_lib() -> String {
    "lib".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            tests: default_tests(),
            entry: default_entry(),
            bundle: default_bundle(),
            target: default_target(),
            lib: default_lib(),
        }
    }
}

/// `[tools]` section: shell commands for the external collaborators.
///
/// Commands run through `sh -c`; file arguments are appended as `"$@"`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// Reads source on stdin, writes transpiled code on stdout.
    /// `$PIPEWRIGHT_FILE` holds the project-relative source path.
    #[serde(default = "default_transpiler")]
    pub transpiler: String,

    #[serde(default = "default_lint")]
    pub lint: String,

    #[serde(default = "default_test")]
    pub test: String,

    /// Prefix wrapped around the test command when `coverage` is on.
    #[serde(default = "default_coverage")]
    pub coverage: String,
}

fn default_transpiler() -> String {
    "npx babel --source-maps inline --filename \"$PIPEWRIGHT_FILE\"".to_string()
}

fn default_lint() -> String {
    "npx eslint".to_string()
}

fn default_test() -> String {
    "npx mocha".to_string()
}

fn default_coverage() -> String {
    "npx nyc --report-dir \"$PIPEWRIGHT_COVERAGE_DIR\"".to_string()
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            transpiler: default_transpiler(),
            lint: default_lint(),
            test: default_test(),
            coverage: default_coverage(),
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CacheSection {
    #[serde(default)]
    pub storage: CacheStorageMode,
}

/// `[paths]` resolved against the project root.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub sources: Vec<String>,
    pub tests: Vec<String>,
    /// Project-relative entry module.
    pub entry: PathBuf,
    pub bundle: String,
    pub target: PathBuf,
    pub lib: PathBuf,
}

impl ProjectLayout {
    /// Output directory for a platform: `<target>/<platform>`.
    pub fn platform_dir(&self, platform: &str) -> PathBuf {
        self.target.join(platform)
    }

    /// Project-relative form of `path`, with forward slashes.
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

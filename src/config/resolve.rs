// src/config/resolve.rs

//! Turn a flat set of named flags into a normalized [`BuildConfig`].

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::model::BuildSection;
use crate::errors::{PipewrightError, Result};
use crate::types::{Language, Platform};

/// Value of a single raw flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Str(String),
    Bool(bool),
}

impl FlagValue {
    /// Truthiness of a flag. Strings count as true unless they spell out a
    /// negative (`""`, `0`, `false`, `no`, `off`).
    pub fn as_bool(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Str(s) => !matches!(
                s.trim().to_lowercase().as_str(),
                "" | "0" | "false" | "no" | "off"
            ),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            FlagValue::Str(s) => s.clone(),
            FlagValue::Bool(b) => b.to_string(),
        }
    }
}

/// Flat, named flags as they arrive from the CLI or the config file.
///
/// Keys are stored without a `js-` prefix, so `js-platform` and `platform`
/// address the same flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFlags {
    values: BTreeMap<String, FlagValue>,
}

impl RawFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: FlagValue) {
        self.values.insert(normalize_key(name), value);
    }

    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.values.get(&normalize_key(name))
    }

    /// Flags taken from the `[build]` section of the config file.
    pub fn from_build_section(section: &BuildSection) -> Self {
        let mut flags = Self::new();
        if let Some(platform) = &section.platform {
            flags.insert("platform", FlagValue::Str(platform.clone()));
        }
        if let Some(language) = &section.language {
            flags.insert("language", FlagValue::Str(language.clone()));
        }
        for (name, value) in [
            ("production", section.production),
            ("incremental", section.incremental),
            ("coverage", section.coverage),
            ("report", section.report),
        ] {
            if let Some(v) = value {
                flags.insert(name, FlagValue::Bool(v));
            }
        }
        flags
    }

    /// Layer `overrides` on top of `self`; keys present in both take the
    /// override's value.
    pub fn layered(mut self, overrides: &RawFlags) -> Self {
        for (k, v) in overrides.values.iter() {
            self.values.insert(k.clone(), v.clone());
        }
        self
    }
}

fn normalize_key(name: &str) -> String {
    let name = name.trim().to_lowercase();
    name.strip_prefix("js-").map(str::to_string).unwrap_or(name)
}

/// Normalized, immutable build configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub platform: Platform,
    pub language: Language,
    pub production: bool,
    pub incremental: bool,
    pub coverage: bool,
    pub report: bool,
    /// `production && language != es6`.
    pub minify: bool,
}

impl BuildConfig {
    pub fn new(
        platform: Platform,
        language: Language,
        production: bool,
        incremental: bool,
        coverage: bool,
        report: bool,
    ) -> Self {
        let minify = production && !language.is_es6();
        Self {
            platform,
            language,
            production,
            incremental,
            coverage,
            report,
            minify,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::new(Platform::Node, Language::Es6, false, false, false, false)
    }
}

/// Resolve raw flags into a [`BuildConfig`].
///
/// Platform and language are lowercased and default to `node` / `es6`.
/// An unrecognized platform or an empty language is a `ConfigError`.
pub fn resolve(raw: &RawFlags) -> Result<BuildConfig> {
    let platform = match raw.get("platform") {
        Some(value) => {
            Platform::from_str(&value.as_text()).map_err(PipewrightError::ConfigError)?
        }
        None => Platform::default(),
    };

    let language = match raw.get("language") {
        Some(value) => {
            Language::from_str(&value.as_text()).map_err(PipewrightError::ConfigError)?
        }
        None => Language::default(),
    };

    let flag = |name: &str| raw.get(name).map(FlagValue::as_bool).unwrap_or(false);

    Ok(BuildConfig::new(
        platform,
        language,
        flag("production"),
        flag("incremental"),
        flag("coverage"),
        flag("report"),
    ))
}

// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipewrightError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PipewrightError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_globs("sources", &cfg.paths.sources)?;
    validate_globs("tests", &cfg.paths.tests)?;
    validate_paths(cfg)?;
    validate_tools(cfg)?;
    Ok(())
}

fn validate_globs(field: &str, patterns: &[String]) -> Result<()> {
    if patterns.is_empty() {
        return Err(PipewrightError::ConfigError(format!(
            "[paths].{field} must contain at least one glob"
        )));
    }
    for pat in patterns {
        Glob::new(pat).map_err(|e| {
            PipewrightError::ConfigError(format!("[paths].{field}: invalid glob '{pat}': {e}"))
        })?;
    }
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    for (field, value) in [
        ("entry", &cfg.paths.entry),
        ("bundle", &cfg.paths.bundle),
        ("target", &cfg.paths.target),
        ("lib", &cfg.paths.lib),
    ] {
        if value.trim().is_empty() {
            return Err(PipewrightError::ConfigError(format!(
                "[paths].{field} must not be empty"
            )));
        }
    }
    Ok(())
}

fn validate_tools(cfg: &RawConfigFile) -> Result<()> {
    for (field, value) in [
        ("transpiler", &cfg.tools.transpiler),
        ("lint", &cfg.tools.lint),
        ("test", &cfg.tools.test),
        ("coverage", &cfg.tools.coverage),
    ] {
        if value.trim().is_empty() {
            return Err(PipewrightError::ConfigError(format!(
                "[tools].{field} must not be empty"
            )));
        }
    }
    Ok(())
}

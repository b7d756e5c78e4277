// tests/config_resolution.rs

mod common;

use std::error::Error;

use proptest::prelude::*;

use pipewright::config::{BuildSection, FlagValue, RawFlags, load_or_default, resolve};
use pipewright::errors::PipewrightError;
use pipewright::types::{CacheStorageMode, Language, Platform};
use pipewright_test_utils::RawFlagsBuilder;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn defaults_to_node_es6() -> TestResult {
    let config = resolve(&RawFlags::new())?;

    assert_eq!(config.platform, Platform::Node);
    assert_eq!(config.language, Language::Es6);
    assert!(!config.production);
    assert!(!config.minify);
    Ok(())
}

#[test]
fn platform_and_language_are_case_insensitive() -> TestResult {
    let config = resolve(
        &RawFlagsBuilder::new()
            .platform("BROWSER")
            .language("TypeScript")
            .build(),
    )?;

    assert_eq!(config.platform, Platform::Browser);
    assert_eq!(config.language, Language::Other("typescript".to_string()));
    Ok(())
}

#[test]
fn unknown_platform_is_a_config_error() {
    let err = resolve(&RawFlagsBuilder::new().platform("deno").build()).unwrap_err();

    assert!(matches!(err, PipewrightError::ConfigError(_)));
    assert!(err.to_string().contains("deno"));
}

#[test]
fn empty_language_is_a_config_error() {
    let err = resolve(&RawFlagsBuilder::new().language("  ").build()).unwrap_err();
    assert!(matches!(err, PipewrightError::ConfigError(_)));
}

#[test]
fn string_flags_are_read_as_booleans() -> TestResult {
    let mut flags = RawFlags::new();
    flags.insert("js-production", FlagValue::Str("yes".to_string()));
    flags.insert("incremental", FlagValue::Str("off".to_string()));
    flags.insert("language", FlagValue::Str("coffee".to_string()));

    let config = resolve(&flags)?;

    assert!(config.production);
    assert!(!config.incremental);
    assert!(config.minify);
    Ok(())
}

#[test]
fn command_line_overrides_config_file() -> TestResult {
    let section = BuildSection {
        platform: Some("browser".to_string()),
        production: Some(true),
        ..Default::default()
    };
    let cli = RawFlagsBuilder::new().platform("node").build();

    let config = resolve(&RawFlags::from_build_section(&section).layered(&cli))?;

    assert_eq!(config.platform, Platform::Node);
    assert!(config.production);
    Ok(())
}

#[test]
fn missing_config_file_yields_defaults() -> TestResult {
    let dir = tempfile::tempdir()?;
    let config = load_or_default(dir.path().join("Pipewright.toml"))?;

    assert_eq!(config.paths.sources, vec!["src/**/*.js".to_string()]);
    assert_eq!(config.paths.entry, "src/index.js");
    assert_eq!(config.cache.storage, CacheStorageMode::Memory);
    Ok(())
}

#[test]
fn config_file_sections_are_loaded() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Pipewright.toml");
    std::fs::write(
        &path,
        r#"
[project]
version = "1.2.3"

[build]
platform = "browser"
language = "babel"

[paths]
sources = ["app/**/*.js"]
entry = "app/main.js"

[tools]
lint = "true"

[cache]
storage = "file"
"#,
    )?;

    let config = load_or_default(&path)?;

    assert_eq!(config.project.version.as_deref(), Some("1.2.3"));
    assert_eq!(config.build.platform.as_deref(), Some("browser"));
    assert_eq!(config.paths.sources, vec!["app/**/*.js".to_string()]);
    assert_eq!(config.paths.entry, "app/main.js");
    assert_eq!(config.paths.target, "target");
    assert_eq!(config.tools.lint, "true");
    assert_eq!(config.tools.test, "npx mocha");
    assert_eq!(config.cache.storage, CacheStorageMode::File);
    Ok(())
}

#[test]
fn invalid_glob_is_rejected() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Pipewright.toml");
    std::fs::write(&path, "[paths]\nsources = [\"src/[*.js\"]\n")?;

    let err = load_or_default(&path).unwrap_err();

    assert!(matches!(err, PipewrightError::ConfigError(_)));
    assert!(err.to_string().contains("sources"));
    Ok(())
}

proptest! {
    #[test]
    fn minification_requires_production_and_a_dialect(
        production in any::<bool>(),
        language in prop_oneof![
            Just("es6".to_string()),
            Just("ES6".to_string()),
            "[a-z]{1,8}",
        ],
    ) {
        let flags = RawFlagsBuilder::new()
            .language(&language)
            .production(production)
            .build();
        let config = resolve(&flags).unwrap();

        let es6 = language.eq_ignore_ascii_case("es6");
        prop_assert_eq!(config.minify, production && !es6);
    }
}

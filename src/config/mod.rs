// src/config/mod.rs

//! Configuration loading, validation and flag resolution for pipewright.
//!
//! Responsibilities:
//! - Define the TOML-backed project model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate globs, paths and tool commands (`validate.rs`).
//! - Resolve flat build flags into a `BuildConfig` (`resolve.rs`).

pub mod loader;
pub mod model;
pub mod resolve;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, load_and_validate, load_from_path, load_or_default};
pub use model::{
    BuildSection, CacheSection, ConfigFile, PathsSection, ProjectLayout, ProjectSection,
    RawConfigFile, ToolsSection,
};
pub use resolve::{resolve, BuildConfig, FlagValue, RawFlags};

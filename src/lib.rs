// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod platform;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::cache::{CACHE_FILE_NAME, CacheStore};
use crate::cli::CliArgs;
use crate::config::{RawFlags, load_or_default, resolve};
use crate::fs::{FileSystem, RealFileSystem};
use crate::logging::log_value;
use crate::pipeline::BuildContext;
use crate::platform::transpile::transpiler_for;
use crate::tasks::{RunSummary, TaskGraph, TaskRunner};
use crate::types::CacheStorageMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and flag resolution
/// - the build context (filesystem, transpiler, layout)
/// - the cache store
/// - the task runner
///
/// An unusable flag set (unknown platform, empty language) is reported as a
/// single warning and nothing runs; that is not a failure.
pub async fn run(args: CliArgs) -> Result<RunSummary> {
    let config_path = PathBuf::from(&args.config);
    let project = load_or_default(&config_path)?;

    let flags = RawFlags::from_build_section(&project.build).layered(&args.raw_flags());
    let config = match resolve(&flags) {
        Ok(config) => config,
        Err(err) => {
            warn!("{err}; nothing to do");
            return Ok(RunSummary::default());
        }
    };

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let root = project_root(fs.as_ref(), &config_path);
    debug!(?root, "project root");
    let layout = project.layout(root);

    let graph = TaskGraph::standard();
    if args.dry_run {
        print_dry_run(&graph, &args, &config);
        return Ok(RunSummary::default());
    }

    let cache = match project.cache.storage {
        CacheStorageMode::File => {
            CacheStore::persistent(fs.as_ref(), layout.target.join(CACHE_FILE_NAME))?
        }
        CacheStorageMode::Memory => CacheStore::in_memory(),
    };

    let ctx = BuildContext {
        transpiler: transpiler_for(&config.language, &project.tools, layout.root.clone()),
        config,
        layout,
        fs,
    };

    let mut runner = TaskRunner::new(ctx, project.tools, project.project, cache);
    Ok(runner.run(args.task).await)
}

/// Directory holding the config file, canonicalized when possible.
///
/// - If the config path has a non-empty parent (e.g. "web/Pipewright.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Pipewright.toml" (parent = ""),
///   we fall back to the current working directory.
fn project_root(fs: &dyn FileSystem, config_path: &Path) -> PathBuf {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    fs.canonicalize(&dir).unwrap_or(dir)
}

/// Print the task order and stage plan without running anything.
fn print_dry_run(graph: &TaskGraph, args: &CliArgs, config: &config::BuildConfig) {
    let order: Vec<&str> = graph
        .execution_order(args.task)
        .iter()
        .map(|t| t.as_str())
        .collect();
    let stages: Vec<&str> = pipeline::plan(config).iter().map(|s| s.name()).collect();

    log_value("tasks", order.join(" -> "));
    log_value("stages", stages.join(" -> "));
    log_value("minification", config.minify);
    debug!("dry-run complete (no execution)");
}

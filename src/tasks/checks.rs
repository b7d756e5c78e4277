// src/tasks/checks.rs

//! Lint and test: thin wrappers around the external tools.

use std::path::PathBuf;

use tracing::info;

use crate::cache::{CacheEntry, CacheStore, LINT_BUCKET, compute_file_hash, normalize_path};
use crate::config::ToolsSection;
use crate::errors::{PipewrightError, Result};
use crate::exec::{ToolInvocation, run_tool, spawn_tool};
use crate::fs::collect_files;
use crate::fs::glob::GlobList;
use crate::logging::log_value;
use crate::pipeline::BuildContext;
use crate::watch::{CheckRunner, ChecksFuture};

/// Name of the captured test output inside the target directory.
pub const TEST_LOG: &str = "mocha.log";

/// Files below the project root matching any of `patterns`.
fn matching_files(ctx: &BuildContext, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let globs = GlobList::new(patterns)?;
    Ok(collect_files(ctx.fs.as_ref(), &ctx.layout.root, |rel| {
        globs.is_match(rel)
    })?)
}

/// Run the lint tool over sources and tests.
///
/// With `incremental`, files whose hash is already in the `"lint"` bucket
/// are left out, and the bucket is only updated after a clean run.
pub async fn lint(ctx: &BuildContext, tools: &ToolsSection, cache: &mut CacheStore) -> Result<()> {
    let layout = &ctx.layout;
    let patterns: Vec<String> = layout
        .sources
        .iter()
        .chain(layout.tests.iter())
        .cloned()
        .collect();

    let mut pending = Vec::new();
    for path in matching_files(ctx, &patterns)? {
        let key = normalize_path(&layout.root, &path);
        let hash = compute_file_hash(ctx.fs.as_ref(), &path)?;
        if ctx.config.incremental && cache.is_fresh(LINT_BUCKET, &key, &hash) {
            continue;
        }
        pending.push((layout.relative(&path), key, hash));
    }

    if pending.is_empty() {
        info!("lint: nothing changed");
        return Ok(());
    }

    let invocation = ToolInvocation::new("lint", &tools.lint)
        .args(pending.iter().map(|(rel, _, _)| rel.clone()))
        .cwd(&layout.root);
    run_tool(&invocation).await?;

    if ctx.config.incremental {
        for (_, key, hash) in pending {
            cache.insert(LINT_BUCKET, key, CacheEntry::new(hash));
        }
    }
    Ok(())
}

/// Run the test tool over the test files.
///
/// `coverage` wraps the command in the coverage tool; `report` captures
/// stdout into `<target>/mocha.log`, which is written even when tests fail.
pub async fn test(ctx: &BuildContext, tools: &ToolsSection) -> Result<()> {
    let layout = &ctx.layout;
    let files: Vec<String> = matching_files(ctx, &layout.tests)?
        .iter()
        .map(|p| layout.relative(p))
        .collect();
    if files.is_empty() {
        info!("test: no test files");
        return Ok(());
    }

    let command = if ctx.config.coverage {
        format!("{} {}", tools.coverage, tools.test)
    } else {
        tools.test.clone()
    };
    let mut invocation = ToolInvocation::new("test", command)
        .args(files)
        .cwd(&layout.root);
    if ctx.config.coverage {
        let dir = layout.target.join("coverage");
        invocation = invocation.env("PIPEWRIGHT_COVERAGE_DIR", dir.to_string_lossy());
    }
    if ctx.config.report {
        invocation = invocation.capture_stdout();
    }

    let outcome = spawn_tool(&invocation).await?;
    if ctx.config.report {
        let log = layout.target.join(TEST_LOG);
        ctx.fs.write(&log, outcome.stdout.as_bytes())?;
        log_value("report", log.display());
    }
    outcome.check("test")?;
    Ok(())
}

/// Lint then test, as watch mode does after every change.
#[derive(Debug, Clone)]
pub struct ToolChecks {
    tools: ToolsSection,
}

impl ToolChecks {
    pub fn new(tools: ToolsSection) -> Self {
        Self { tools }
    }
}

impl CheckRunner for ToolChecks {
    fn run_checks<'a>(&'a self, ctx: &'a BuildContext, cache: &'a mut CacheStore) -> ChecksFuture<'a> {
        Box::pin(async move {
            let mut failures: Vec<PipewrightError> = Vec::new();
            if let Err(err) = lint(ctx, &self.tools, cache).await {
                failures.push(err);
            }
            if let Err(err) = test(ctx, &self.tools).await {
                failures.push(err);
            }
            failures
        })
    }
}

// src/tasks/runner.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::config::{ProjectSection, ToolsSection};
use crate::errors::{PipewrightError, Result, TransformError};
use crate::fs::collect_files;
use crate::logging::{log_value, report_failure};
use crate::pipeline::{self, BuildContext, BuildScope};
use crate::platform::PlatformStrategy;
use crate::tasks::checks::{self, ToolChecks};
use crate::tasks::{TaskGraph, TaskName};
use crate::watch;

/// File holding the version stamp inside the target directory.
pub const VERSION_FILE: &str = "version";

/// Outcome of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: Vec<TaskName>,
    /// Tasks that failed, with the rendered error.
    pub failed: Vec<(TaskName, String)>,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs tasks against one build context and cache.
#[derive(Debug)]
pub struct TaskRunner {
    ctx: BuildContext,
    tools: ToolsSection,
    project: ProjectSection,
    cache: CacheStore,
    graph: TaskGraph,
}

impl TaskRunner {
    pub fn new(
        ctx: BuildContext,
        tools: ToolsSection,
        project: ProjectSection,
        cache: CacheStore,
    ) -> Self {
        Self {
            ctx,
            tools,
            project,
            cache,
            graph: TaskGraph::standard(),
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn into_cache(self) -> CacheStore {
        self.cache
    }

    /// Run `task` after all of its dependencies.
    ///
    /// A failing task is reported and recorded; the remaining tasks still
    /// run.
    pub async fn run(&mut self, task: TaskName) -> RunSummary {
        let order = self.graph.execution_order(task);
        info!(task = %task, order = ?order, "running tasks");

        let mut summary = RunSummary::default();
        for next in order {
            summary.executed.push(next);
            if let Err(err) = self.run_one(next).await {
                report_failure(next.as_str(), &err);
                summary.failed.push((next, err.to_string()));
            }
        }

        if let Err(err) = self.cache.flush(self.ctx.fs.as_ref()) {
            warn!(error = %err, "failed to persist cache");
        }
        summary
    }

    async fn run_one(&mut self, task: TaskName) -> Result<()> {
        match task {
            TaskName::Config => {
                self.log_config();
                Ok(())
            }
            TaskName::Prepare => self.prepare(),
            TaskName::Clean => self.clean(),
            TaskName::Lint => checks::lint(&self.ctx, &self.tools, &mut self.cache).await,
            TaskName::Test => checks::test(&self.ctx, &self.tools).await,
            TaskName::Package => self.package().await,
            TaskName::Watch => self.watch().await,
            TaskName::Distribution => self.distribution(),
            TaskName::Default => Ok(()),
        }
    }

    fn log_config(&self) {
        let config = &self.ctx.config;
        log_value("platform", config.platform);
        log_value("language", &config.language);
        log_value("production", config.production);
        log_value("incremental", config.incremental);
        log_value("coverage", config.coverage);
        log_value("report", config.report);
        log_value("minification", config.minify);
        log_value(
            "output",
            self.ctx.layout.platform_dir(config.platform.as_str()).display(),
        );
    }

    /// Version from `package.json`, else `[project].version`, else `0.0.0`.
    pub fn project_version(&self) -> String {
        let package_json = self.ctx.layout.root.join("package.json");
        let from_package = self
            .ctx
            .fs
            .read_to_string(&package_json)
            .ok()
            .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok())
            .and_then(|json| json.get("version")?.as_str().map(str::to_string));

        from_package
            .or_else(|| self.project.version.clone())
            .unwrap_or_else(|| "0.0.0".to_string())
    }

    fn prepare(&self) -> Result<()> {
        let version = self.project_version();
        let path = self.ctx.layout.target.join(VERSION_FILE);
        self.ctx.fs.write(&path, version.as_bytes())?;
        log_value("version", &version);
        Ok(())
    }

    fn clean(&mut self) -> Result<()> {
        self.cache.clear();
        let layout = &self.ctx.layout;
        for dir in [&layout.lib, &layout.target] {
            self.ctx.fs.remove_all(dir)?;
            info!(?dir, "removed");
        }
        Ok(())
    }

    async fn package(&mut self) -> Result<()> {
        let report = pipeline::build(&self.ctx, &mut self.cache, &BuildScope::Full).await;
        if report.is_success() {
            return Ok(());
        }
        Err(TransformError::new(
            "BuildError",
            format!("{} unit(s) failed to build", report.failures.len()),
        )
        .into())
    }

    async fn watch(&mut self) -> Result<()> {
        self.package().await.unwrap_or_else(|_| {
            info!("initial build failed; watching anyway");
        });

        let cache = std::mem::take(&mut self.cache);
        let checks = Arc::new(ToolChecks::new(self.tools.clone()));
        let handle = watch::start(self.ctx.clone(), cache, checks)?;
        info!("watching for changes; press Ctrl-C to stop");

        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
        }
        self.cache = handle.stop().await?;
        Ok(())
    }

    /// Copy every `.min.js` of the current platform into the library
    /// directory, dropping the `.min` part of the name.
    fn distribution(&self) -> Result<()> {
        let strategy = PlatformStrategy::for_config(&self.ctx.config, &self.ctx.layout);
        let out_dir = strategy.out_dir();
        let fs = self.ctx.fs.as_ref();

        let minified = collect_files(fs, out_dir, |rel| rel.ends_with(".min.js"))?;
        if minified.is_empty() {
            return Err(PipewrightError::tool(
                "distribution",
                format!("no minified artifacts in {}", out_dir.display()),
            ));
        }
        for path in minified {
            let rel = path.strip_prefix(out_dir).unwrap_or(&path);
            let name = rel.to_string_lossy().replace(".min.js", ".js");
            let dest: PathBuf = self.ctx.layout.lib.join(name);
            let contents = fs.read_to_string(&path)?;
            fs.write(&dest, contents.as_bytes())?;
            info!(from = ?path, to = ?dest, "distributed");
        }
        Ok(())
    }
}

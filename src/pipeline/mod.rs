// src/pipeline/mod.rs

//! The fixed transformation pipeline.
//!
//! A build is: acquire a [`SourceBatch`] through the platform strategy, then
//! push every unit through the [`StageSet`]. Both halves always run to
//! completion; failures are collected into the [`BuildReport`] and reported
//! as they happen instead of aborting the run.

pub mod minify;
pub mod source_map;
pub mod syntax;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::config::{BuildConfig, ProjectLayout};
use crate::errors::{PipewrightError, Result};
use crate::fs::FileSystem;
use crate::logging::report_failure;
use crate::platform::PlatformStrategy;
use crate::platform::transpile::Transpiler;

use self::minify::minify;
use self::source_map::SourceMap;

/// One stage of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Dialect transformation; runs inside the platform strategy while the
    /// sources are acquired.
    Transpile,
    /// Write the canonical (unminified) artifact.
    WriteIntermediate,
    /// Rename to `<stem>.min.<ext>`.
    RenameWithSuffix,
    /// Load an inline source map, or start an identity map.
    SourceMapInit,
    /// Only when `BuildConfig::minify`.
    Minify,
    /// Finalize the map and point the code at it.
    SourceMapWrite,
    /// Write the `.min` artifact and its map.
    WriteFinal,
}

impl PipelineStage {
    pub const ORDER: [PipelineStage; 7] = [
        PipelineStage::Transpile,
        PipelineStage::WriteIntermediate,
        PipelineStage::RenameWithSuffix,
        PipelineStage::SourceMapInit,
        PipelineStage::Minify,
        PipelineStage::SourceMapWrite,
        PipelineStage::WriteFinal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Transpile => "transpile",
            PipelineStage::WriteIntermediate => "write-intermediate",
            PipelineStage::RenameWithSuffix => "rename-with-suffix",
            PipelineStage::SourceMapInit => "sourcemap-init",
            PipelineStage::Minify => "minify",
            PipelineStage::SourceMapWrite => "sourcemap-write",
            PipelineStage::WriteFinal => "write-final",
        }
    }

    pub fn is_active(&self, config: &BuildConfig) -> bool {
        match self {
            PipelineStage::Transpile => !config.language.is_es6(),
            PipelineStage::Minify => config.minify,
            PipelineStage::WriteIntermediate
            | PipelineStage::RenameWithSuffix
            | PipelineStage::SourceMapInit
            | PipelineStage::SourceMapWrite
            | PipelineStage::WriteFinal => true,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every stage that will run for `config`, in order.
pub fn plan(config: &BuildConfig) -> Vec<PipelineStage> {
    PipelineStage::ORDER
        .into_iter()
        .filter(|s| s.is_active(config))
        .collect()
}

/// A unit of code flowing through the stage set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path relative to the platform output directory.
    pub relative: PathBuf,
    pub contents: String,
    /// Project-relative source path, used when no inline map is present.
    pub origin: String,
}

/// Everything the platform strategy produced for one run.
#[derive(Debug, Default)]
pub struct SourceBatch {
    pub units: Vec<Artifact>,
    /// Sources left out because the cache says they are unchanged.
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<PipewrightError>,
}

/// What a run wrote and what went wrong.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<PipewrightError>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Which sources a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildScope {
    Full,
    /// Absolute paths of changed sources.
    Files(Vec<PathBuf>),
}

/// Shared state for every build in a process.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub config: BuildConfig,
    pub layout: ProjectLayout,
    pub fs: Arc<dyn FileSystem>,
    pub transpiler: Arc<dyn Transpiler>,
}

/// `index.js` -> `index.min.js`, `service/life.js` -> `service/life.min.js`.
pub fn min_name(relative: &Path) -> PathBuf {
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match relative.extension() {
        Some(ext) => format!("{stem}.min.{}", ext.to_string_lossy()),
        None => format!("{stem}.min"),
    };
    relative.with_file_name(name)
}

/// Map file written next to `relative`.
fn map_name(relative: &Path) -> PathBuf {
    let mut name = relative.as_os_str().to_owned();
    name.push(".map");
    PathBuf::from(name)
}

/// The post-acquisition stages, bound to one output directory.
pub struct StageSet<'a> {
    config: &'a BuildConfig,
    fs: &'a dyn FileSystem,
    out_dir: PathBuf,
}

/// Per-unit state threaded through the stages.
struct Working {
    relative: PathBuf,
    code: String,
    origin: String,
    map: Option<SourceMap>,
    written: Vec<PathBuf>,
}

impl<'a> StageSet<'a> {
    pub fn new(config: &'a BuildConfig, fs: &'a dyn FileSystem, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            fs,
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Active stages owned by the stage set (everything after `Transpile`).
    pub fn stages(&self) -> Vec<PipelineStage> {
        plan(self.config)
            .into_iter()
            .filter(|s| *s != PipelineStage::Transpile)
            .collect()
    }

    /// Run every unit of `batch` through the stages.
    ///
    /// A failing unit is reported and skipped; the remaining units still run.
    pub fn apply(&self, batch: SourceBatch) -> BuildReport {
        let mut report = BuildReport {
            written: Vec::new(),
            skipped: batch.skipped,
            failures: batch.failures,
        };
        let stages = self.stages();

        for artifact in batch.units {
            let origin = artifact.origin.clone();
            match self.apply_unit(&stages, artifact) {
                Ok(mut written) => report.written.append(&mut written),
                Err((stage, err)) => {
                    debug!(%origin, %stage, "unit failed");
                    report_failure(stage.name(), &err);
                    report.failures.push(err);
                }
            }
        }
        report
    }

    fn apply_unit(
        &self,
        stages: &[PipelineStage],
        artifact: Artifact,
    ) -> std::result::Result<Vec<PathBuf>, (PipelineStage, PipewrightError)> {
        let mut unit = Working {
            relative: artifact.relative,
            code: artifact.contents,
            origin: artifact.origin,
            map: None,
            written: Vec::new(),
        };
        for stage in stages {
            self.run_stage(*stage, &mut unit)
                .map_err(|err| (*stage, err))?;
        }
        Ok(unit.written)
    }

    fn run_stage(&self, stage: PipelineStage, unit: &mut Working) -> Result<()> {
        match stage {
            PipelineStage::Transpile => {}
            PipelineStage::WriteIntermediate => {
                let path = self.out_dir.join(&unit.relative);
                self.fs.write(&path, unit.code.as_bytes())?;
                unit.written.push(path);
            }
            PipelineStage::RenameWithSuffix => {
                unit.relative = min_name(&unit.relative);
            }
            PipelineStage::SourceMapInit => {
                let (code, map) = match source_map::extract_inline(&unit.code)? {
                    Some(found) => found,
                    None => {
                        let map = source_map::identity(&unit.origin, &unit.code);
                        (unit.code.clone(), map)
                    }
                };
                unit.code = code;
                unit.map = Some(map);
            }
            PipelineStage::Minify => {
                let minified = minify(&unit.code, &unit.origin)
                    .map_err(|e| e.in_file(unit.origin.clone()))?;
                unit.map = match (unit.map.take(), minified.map) {
                    (Some(input), Some(output)) => Some(source_map::compose(&output, &input)),
                    (_, output) => output,
                };
                unit.code = minified.code;
            }
            PipelineStage::SourceMapWrite => {
                let file_name = unit
                    .relative
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if let Some(map) = &mut unit.map {
                    map.set_file(&file_name);
                }
                if !unit.code.is_empty() && !unit.code.ends_with('\n') {
                    unit.code.push('\n');
                }
                unit.code
                    .push_str(&format!("//# sourceMappingURL={file_name}.map\n"));
            }
            PipelineStage::WriteFinal => {
                let path = self.out_dir.join(&unit.relative);
                self.fs.write(&path, unit.code.as_bytes())?;
                unit.written.push(path.clone());
                if let Some(map) = &unit.map {
                    let map_path = map_name(&path);
                    self.fs.write(&map_path, map.to_json_string().as_bytes())?;
                    unit.written.push(map_path);
                }
            }
        }
        Ok(())
    }
}

/// One complete build: acquire sources for `scope`, run the stage set.
pub async fn build(ctx: &BuildContext, cache: &mut CacheStore, scope: &BuildScope) -> BuildReport {
    let strategy = PlatformStrategy::for_config(&ctx.config, &ctx.layout);
    let batch = strategy.acquire(ctx, cache, scope).await;
    let out_dir = strategy.out_dir();

    let stage_set = StageSet::new(&ctx.config, ctx.fs.as_ref(), out_dir);
    let report = stage_set.apply(batch);

    info!(
        platform = %ctx.config.platform,
        written = report.written.len(),
        skipped = report.skipped.len(),
        failures = report.failures.len(),
        "build finished"
    );
    report
}

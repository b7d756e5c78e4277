// src/platform/mod.rs

//! Platform strategies: how sources are acquired for a build.
//!
//! - [`node`]: every file matching the source globs is its own unit.
//! - [`browser`]: the entry module and everything it imports become one
//!   bundle.
//!
//! Both run the configured [`transpile::Transpiler`] while acquiring, and
//! both always hand back a complete [`SourceBatch`]: failures are reported
//! and collected, never thrown past the batch.

pub mod browser;
pub mod node;
pub mod transpile;

use std::path::{Path, PathBuf};

use crate::cache::CacheStore;
use crate::config::{BuildConfig, ProjectLayout};
use crate::pipeline::{BuildContext, BuildScope, SourceBatch};
use crate::types::Platform;

/// Source acquisition for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformStrategy {
    Node { out_dir: PathBuf },
    Browser { out_dir: PathBuf },
}

impl PlatformStrategy {
    pub fn for_config(config: &BuildConfig, layout: &ProjectLayout) -> Self {
        let out_dir = layout.platform_dir(config.platform.as_str());
        match config.platform {
            Platform::Node => PlatformStrategy::Node { out_dir },
            Platform::Browser => PlatformStrategy::Browser { out_dir },
        }
    }

    /// `<target>/<platform>`.
    pub fn out_dir(&self) -> &Path {
        match self {
            PlatformStrategy::Node { out_dir } | PlatformStrategy::Browser { out_dir } => out_dir,
        }
    }

    pub async fn acquire(
        &self,
        ctx: &BuildContext,
        cache: &mut CacheStore,
        scope: &BuildScope,
    ) -> SourceBatch {
        match self {
            PlatformStrategy::Node { .. } => node::acquire(ctx, cache, scope).await,
            // Bundles always cover the whole graph; there is no per-file cache.
            PlatformStrategy::Browser { .. } => browser::acquire(ctx).await,
        }
    }

    /// What to rebuild when `paths` changed.
    pub fn scope_for_changes(&self, paths: Vec<PathBuf>) -> BuildScope {
        match self {
            PlatformStrategy::Node { .. } => BuildScope::Files(paths),
            PlatformStrategy::Browser { .. } => BuildScope::Full,
        }
    }
}

// src/platform/node.rs

//! Per-file acquisition for the `node` platform.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheStore, NODE_BUCKET, content_hash, normalize_path};
use crate::errors::{PipewrightError, Result};
use crate::fs::collect_files;
use crate::fs::glob::GlobList;
use crate::logging::report_failure;
use crate::pipeline::{Artifact, BuildContext, BuildScope, SourceBatch};

/// Collect, filter and transpile the source files covered by `scope`.
///
/// With `incremental` on, a file whose content hash matches its entry in the
/// `"node"` bucket is skipped before the transpiler is invoked; every
/// successful transpile writes its hash through to the bucket.
pub async fn acquire(ctx: &BuildContext, cache: &mut CacheStore, scope: &BuildScope) -> SourceBatch {
    let mut batch = SourceBatch::default();

    let globs = match GlobList::new(&ctx.layout.sources) {
        Ok(globs) => globs,
        Err(err) => {
            let err = PipewrightError::from(err);
            report_failure("node", &err);
            batch.failures.push(err);
            return batch;
        }
    };

    let files = match source_files(ctx, &globs, scope) {
        Ok(files) => files,
        Err(err) => {
            report_failure("node", &err);
            batch.failures.push(err);
            return batch;
        }
    };
    debug!(count = files.len(), "node sources collected");

    for path in files {
        match acquire_file(ctx, cache, &globs, &path).await {
            Ok(Some(artifact)) => batch.units.push(artifact),
            Ok(None) => batch.skipped.push(path),
            Err(err) => {
                report_failure("transpile", &err);
                batch.failures.push(err);
            }
        }
    }

    if !batch.skipped.is_empty() {
        info!(skipped = batch.skipped.len(), "unchanged sources skipped");
    }
    batch
}

fn source_files(ctx: &BuildContext, globs: &GlobList, scope: &BuildScope) -> Result<Vec<PathBuf>> {
    let layout = &ctx.layout;
    match scope {
        BuildScope::Full => Ok(collect_files(ctx.fs.as_ref(), &layout.root, |rel| {
            globs.is_match(rel)
        })?),
        BuildScope::Files(paths) => {
            let mut files: Vec<PathBuf> = paths
                .iter()
                .filter(|p| ctx.fs.is_file(p) && globs.is_match(&layout.relative(p)))
                .cloned()
                .collect();
            files.sort();
            files.dedup();
            Ok(files)
        }
    }
}

/// `Ok(None)` means the cache says the file is unchanged.
async fn acquire_file(
    ctx: &BuildContext,
    cache: &mut CacheStore,
    globs: &GlobList,
    path: &Path,
) -> Result<Option<Artifact>> {
    let origin = ctx.layout.relative(path);
    let relative = PathBuf::from(globs.strip_base(&origin));
    let source = ctx.fs.read_to_string(path)?;

    let key = normalize_path(&ctx.layout.root, path);
    let hash = content_hash(&source);
    if ctx.config.incremental && cache.is_fresh(NODE_BUCKET, &key, &hash) {
        debug!(file = %origin, "cache hit");
        return Ok(None);
    }

    let code = ctx.transpiler.transpile(&source, &origin).await?;

    if ctx.config.incremental {
        cache.insert(
            NODE_BUCKET,
            key,
            CacheEntry::new(hash).with_artifact(relative.clone()),
        );
    }

    Ok(Some(Artifact {
        relative,
        contents: code,
        origin,
    }))
}

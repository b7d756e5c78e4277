// src/cache/mod.rs

//! Bucket-scoped cache of per-file build state.
//!
//! Each named bucket (`"lint"`, `"node"`) maps a normalized absolute path to
//! a [`CacheEntry`]. The store is an explicit object passed by `&mut` into
//! the platform strategy and the watch coordinator; there is no global
//! instance.

pub mod hash;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::fs::FileSystem;

pub use hash::{compute_file_hash, content_hash};

/// Bucket used by the lint task.
pub const LINT_BUCKET: &str = "lint";
/// Bucket used by the per-file node build.
pub const NODE_BUCKET: &str = "node";

/// File name of the persisted cache inside the target directory.
pub const CACHE_FILE_NAME: &str = ".pipewright-cache";

/// What we remember about one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// blake3 hash of the source contents that produced this entry.
    pub content_hash: String,
    /// Artifact produced from the file, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
}

impl CacheEntry {
    pub fn new(content_hash: impl Into<String>) -> Self {
        Self {
            content_hash: content_hash.into(),
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: impl Into<PathBuf>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }
}

/// Normalize a path for use as a cache key: made absolute against `root`
/// and lexically cleaned (`.` and `..` removed).
pub fn normalize_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path_clean::clean(path)
    } else {
        path_clean::clean(root.join(path))
    }
}

/// In-memory cache with optional file persistence.
#[derive(Debug, Default)]
pub struct CacheStore {
    buckets: BTreeMap<String, BTreeMap<PathBuf, CacheEntry>>,
    persist_to: Option<PathBuf>,
}

impl CacheStore {
    /// A store that lives for the process lifetime only.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A store backed by `path`; existing entries are loaded immediately.
    pub fn persistent(fs: &dyn FileSystem, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let buckets = if fs.is_file(&path) {
            let text = fs.read_to_string(&path)?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing cache file {:?}", path))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            buckets,
            persist_to: Some(path),
        })
    }

    pub fn get(&self, bucket: &str, path: &Path) -> Option<&CacheEntry> {
        self.buckets.get(bucket).and_then(|b| b.get(path))
    }

    /// Insert or overwrite the entry for `path` in `bucket`.
    pub fn insert(&mut self, bucket: &str, path: impl Into<PathBuf>, entry: CacheEntry) {
        self.buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(path.into(), entry);
    }

    /// True if `bucket` holds an entry for `path` with the given hash.
    pub fn is_fresh(&self, bucket: &str, path: &Path, content_hash: &str) -> bool {
        self.get(bucket, path)
            .is_some_and(|e| e.content_hash == content_hash)
    }

    /// Remove the entry for `path` from every bucket. Returns the names of
    /// the buckets that held one.
    pub fn invalidate(&mut self, path: &Path) -> Vec<String> {
        let mut removed = Vec::new();
        for (name, bucket) in self.buckets.iter_mut() {
            if bucket.remove(path).is_some() {
                removed.push(name.clone());
            }
        }
        if !removed.is_empty() {
            debug!(?path, buckets = ?removed, "invalidated cache entries");
        }
        removed
    }

    /// Drop every entry in every bucket.
    pub fn clear(&mut self) {
        self.buckets.clear();
        info!("cleared all cache buckets");
    }

    pub fn len(&self, bucket: &str) -> usize {
        self.buckets.get(bucket).map(|b| b.len()).unwrap_or(0)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.buckets.values().any(|b| b.contains_key(path))
    }

    /// Write the store to its backing file, if it has one.
    pub fn flush(&self, fs: &dyn FileSystem) -> Result<()> {
        let Some(path) = &self.persist_to else {
            return Ok(());
        };
        // Nothing to remember, nothing to overwrite (e.g. right after `clean`).
        if self.buckets.values().all(|b| b.is_empty()) && !fs.exists(path) {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.buckets)?;
        fs.write(path, json.as_bytes())?;
        debug!(?path, "flushed cache to disk");
        Ok(())
    }
}

// src/watch/patterns.rs

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::ProjectLayout;
use crate::fs::glob::GlobList;

/// Why a path is watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    /// Matches `[paths].sources`; a change triggers a rebuild.
    Source,
    /// Matches `[paths].tests` only.
    Test,
}

/// Compiled source and test globs, evaluated relative to the project root.
#[derive(Debug, Clone)]
pub struct WatchPatterns {
    /// The project root, plus its canonical form when that differs, so
    /// events reported through symlinked prefixes still match.
    roots: Vec<PathBuf>,
    sources: GlobList,
    tests: GlobList,
}

impl WatchPatterns {
    pub fn new(layout: &ProjectLayout) -> Result<Self> {
        Ok(Self {
            roots: vec![layout.root.clone()],
            sources: GlobList::new(&layout.sources)?,
            tests: GlobList::new(&layout.tests)?,
        })
    }

    /// Also accept events reported under `root`.
    pub fn with_alias_root(mut self, root: PathBuf) -> Self {
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
        self
    }

    /// `path` relative to the project root with forward slashes, or `None`
    /// if it lies outside every known root.
    pub fn relative(&self, path: &Path) -> Option<String> {
        self.roots.iter().find_map(|root| {
            path.strip_prefix(root)
                .ok()
                .map(|rel| rel.to_string_lossy().replace('\\', "/"))
        })
    }

    pub fn classify(&self, path: &Path) -> Option<FileRole> {
        let rel = self.relative(path)?;
        if self.sources.is_match(&rel) {
            Some(FileRole::Source)
        } else if self.tests.is_match(&rel) {
            Some(FileRole::Test)
        } else {
            None
        }
    }
}

// src/fs/glob.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// A compiled list of project-relative glob patterns.
///
/// Besides matching, it knows each pattern's literal base directory
/// (`src/**/*.js` -> `src`) so outputs can mirror the tree below it.
#[derive(Clone)]
pub struct GlobList {
    patterns: Vec<String>,
    bases: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for GlobList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobList")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl GlobList {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
            builder.add(glob);
        }
        let bases = patterns.iter().map(|p| glob_base(p)).collect();
        Ok(Self {
            patterns: patterns.to_vec(),
            bases,
            set: builder.build()?,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// `rel` uses forward slashes and is relative to the project root.
    pub fn is_match(&self, rel: &str) -> bool {
        self.set.is_match(rel)
    }

    /// `rel` with the base directory of the first pattern matching it
    /// removed. Unmatched paths come back unchanged.
    pub fn strip_base<'a>(&self, rel: &'a str) -> &'a str {
        let Some(&index) = self.set.matches(rel).iter().min() else {
            return rel;
        };
        let base = self.bases[index].as_str();
        if base.is_empty() {
            return rel;
        }
        rel.strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(rel)
    }
}

/// Leading path components of `pattern` that contain no glob syntax.
pub fn glob_base(pattern: &str) -> String {
    let mut parts = Vec::new();
    let segments: Vec<&str> = pattern.split('/').collect();
    // The last segment names files, never a directory.
    for segment in &segments[..segments.len().saturating_sub(1)] {
        if segment.contains(['*', '?', '[', '{']) {
            break;
        }
        if !segment.is_empty() && *segment != "." {
            parts.push(*segment);
        }
    }
    parts.join("/")
}

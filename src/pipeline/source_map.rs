// src/pipeline/source_map.rs

//! Source map plumbing on top of `oxc_sourcemap`.
//!
//! Maps travel through the pipeline as [`SourceMap`] values. This module
//! adds what the stages need around them: identity maps for untouched
//! code, chaining a stage's map onto the map it started from, and the
//! inline `data:` comment form that transpilers and the bundler emit.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
pub use oxc_sourcemap::{ConcatSourceMapBuilder, SourceMap, SourceMapBuilder};

use crate::errors::{Result, TransformError};

const INLINE_PREFIX: &str = "//# sourceMappingURL=data:application/json";

/// Where a generated position came from. Lines and columns are zero based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
    pub source: String,
    pub line: u32,
    pub column: u32,
}

/// Every line of `code` maps onto the same line of `source`.
pub fn identity(source: &str, code: &str) -> SourceMap {
    let mut builder = SourceMapBuilder::default();
    let id = builder.set_source_and_content(source, code);
    for line in 0..line_count(code) {
        builder.add_token(line, 0, line, 0, Some(id), None);
    }
    builder.into_sourcemap()
}

pub fn parse(json: &str) -> Result<SourceMap> {
    Ok(SourceMap::from_json_string(json)
        .map_err(|e| TransformError::new("SourceMapError", format!("invalid source map: {e}")))?)
}

/// `//# sourceMappingURL=data:...` comment embedding `map`.
pub fn to_inline_comment(map: &SourceMap) -> String {
    format!("//# sourceMappingURL={}", map.to_data_url())
}

/// Split an inline map off the end of `code`.
///
/// Returns the code without the comment and the decoded map, or `None`
/// when the last non-empty line is not an inline map.
pub fn extract_inline(code: &str) -> Result<Option<(String, SourceMap)>> {
    let trimmed = code.trim_end();
    let (head, last) = match trimmed.rfind('\n') {
        Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
        None => ("", trimmed),
    };
    let last = last.trim();
    if !last.starts_with(INLINE_PREFIX) {
        return Ok(None);
    }
    let Some((_, payload)) = last.split_once("base64,") else {
        return Ok(None);
    };
    let bytes = STANDARD.decode(payload.trim()).map_err(|e| {
        TransformError::new("SourceMapError", format!("invalid inline map: {e}"))
    })?;
    let json = String::from_utf8(bytes).map_err(|e| {
        TransformError::new("SourceMapError", format!("inline map is not UTF-8: {e}"))
    })?;
    let map = parse(&json)?;
    let mut code = head.to_string();
    if !code.is_empty() {
        code.push('\n');
    }
    Ok(Some((code, map)))
}

/// Chain `outer` (generated code to an intermediate) onto `inner` (that
/// intermediate to the original sources).
///
/// Tokens of `outer` that land where `inner` has nothing are dropped.
pub fn compose(outer: &SourceMap, inner: &SourceMap) -> SourceMap {
    let lookup = Lookup::new(inner);
    let mut builder = SourceMapBuilder::default();
    let mut ids: HashMap<u32, u32> = HashMap::new();

    for token in outer.get_tokens() {
        if token.get_source_id().is_none() {
            continue;
        }
        let Some(origin) = lookup.find(token.get_src_line(), token.get_src_col()) else {
            continue;
        };
        let id = *ids.entry(origin.source).or_insert_with(|| {
            let name = inner
                .get_source(origin.source)
                .map(|s| s.to_string())
                .unwrap_or_default();
            let content = inner
                .get_source_content(origin.source)
                .map(|c| c.to_string())
                .unwrap_or_default();
            builder.set_source_and_content(&name, &content)
        });
        builder.add_token(
            token.get_dst_line(),
            token.get_dst_col(),
            origin.line,
            origin.column,
            Some(id),
            None,
        );
    }

    let mut map = builder.into_sourcemap();
    if let Some(file) = outer.get_file() {
        map.set_file(&file.to_string());
    }
    map
}

/// Original position of a generated one, if `map` covers it.
pub fn original_position(map: &SourceMap, line: u32, column: u32) -> Option<OriginalPosition> {
    Lookup::new(map).original(line, column)
}

/// Number of lines in `code` as an editor would count them.
pub fn line_count(code: &str) -> u32 {
    if code.is_empty() {
        return 0;
    }
    let newlines = code.matches('\n').count() as u32;
    if code.ends_with('\n') { newlines } else { newlines + 1 }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    column: u32,
    source: u32,
    line: u32,
    src_column: u32,
}

/// Tokens of one map indexed by generated line, for repeated lookups.
pub struct Lookup<'m> {
    map: &'m SourceMap,
    lines: Vec<Vec<Segment>>,
}

impl<'m> Lookup<'m> {
    pub fn new(map: &'m SourceMap) -> Self {
        let mut lines: Vec<Vec<Segment>> = Vec::new();
        for token in map.get_tokens() {
            let Some(source) = token.get_source_id() else {
                continue;
            };
            let line = token.get_dst_line() as usize;
            if lines.len() <= line {
                lines.resize_with(line + 1, Vec::new);
            }
            lines[line].push(Segment {
                column: token.get_dst_col(),
                source,
                line: token.get_src_line(),
                src_column: token.get_src_col(),
            });
        }
        for segments in &mut lines {
            segments.sort_by_key(|s| s.column);
        }
        Self { map, lines }
    }

    pub fn original(&self, line: u32, column: u32) -> Option<OriginalPosition> {
        let segment = self.find(line, column)?;
        Some(OriginalPosition {
            source: self
                .map
                .get_source(segment.source)
                .map(|s| s.to_string())
                .unwrap_or_default(),
            line: segment.line,
            column: segment.src_column,
        })
    }

    /// The segment covering `column` on generated `line`. Columns past the
    /// segment start advance its original column by the same amount.
    fn find(&self, line: u32, column: u32) -> Option<Segment> {
        let segments = self.lines.get(line as usize)?;
        let after = segments.partition_point(|s| s.column <= column);
        let segment = match after {
            0 => *segments.first()?,
            n => segments[n - 1],
        };
        Some(Segment {
            column,
            src_column: segment.src_column + column.saturating_sub(segment.column),
            ..segment
        })
    }
}

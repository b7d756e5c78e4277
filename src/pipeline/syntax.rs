// src/pipeline/syntax.rs

//! JavaScript parsing shared by the minifier and the browser bundler.

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::{Parser, ParserReturn};
use oxc_span::SourceType;

use crate::errors::TransformError;

/// The first error the parser reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxFailure {
    pub message: String,
    /// Byte offset into the parsed code.
    pub offset: usize,
}

impl SyntaxFailure {
    /// A `TransformError` of `kind`, located in `code` (one based).
    pub fn into_error(self, kind: &str, code: &str) -> TransformError {
        let (line, column) = position_of(code, self.offset);
        TransformError::new(kind, self.message).at(line + 1, column + 1)
    }
}

/// Parse `code`. The source type follows the extension of `name`; names
/// without a known one parse as an ES module.
pub fn parse_program<'a>(
    allocator: &'a Allocator,
    code: &'a str,
    name: &str,
) -> Result<Program<'a>, SyntaxFailure> {
    let source_type = SourceType::from_path(name).unwrap_or(SourceType::mjs());
    let ParserReturn {
        program, errors, ..
    } = Parser::new(allocator, code, source_type).parse();

    match errors.first() {
        Some(error) => Err(SyntaxFailure {
            message: error.message.to_string(),
            offset: error
                .labels
                .as_ref()
                .and_then(|labels| labels.first())
                .map_or(0, |label| label.offset()),
        }),
        None => Ok(program),
    }
}

/// Zero-based line and column (in bytes) of `offset` in `code`.
pub fn position_of(code: &str, offset: usize) -> (u32, u32) {
    let mut offset = offset.min(code.len());
    while !code.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &code[..offset];
    let line = before.matches('\n').count();
    let column = before.len() - before.rfind('\n').map_or(0, |i| i + 1);
    (line as u32, column as u32)
}

// src/pipeline/minify.rs

//! JavaScript minification through oxc.
//!
//! `oxc_minifier` compresses and mangles the parsed program and
//! `oxc_codegen` prints it in minified form together with a source map
//! from the printed code back to the input.

use std::path::PathBuf;

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};

use crate::errors::TransformError;
use crate::pipeline::source_map::SourceMap;
use crate::pipeline::syntax::parse_program;

/// Output of [`minify`].
#[derive(Debug)]
pub struct Minified {
    pub code: String,
    /// Maps `code` back onto the minifier's input, whose source is named
    /// after the `name` given to [`minify`].
    pub map: Option<SourceMap>,
}

/// Minify `source`. `name` picks the source type and names the input in
/// the returned map.
pub fn minify(source: &str, name: &str) -> Result<Minified, TransformError> {
    let allocator = Allocator::default();
    let mut program = parse_program(&allocator, source, name)
        .map_err(|failure| failure.into_error("MinifyError", source))?;

    let minified = Minifier::new(MinifierOptions::default()).minify(&allocator, &mut program);
    let printed = Codegen::new()
        .with_options(CodegenOptions {
            source_map_path: Some(PathBuf::from(name)),
            ..CodegenOptions::minify()
        })
        .with_scoping(minified.scoping)
        .build(&program);

    Ok(Minified {
        code: printed.code,
        map: printed.map,
    })
}

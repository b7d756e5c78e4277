// tests/diagnostics.rs

use pipewright::errors::{PipewrightError, TransformError};
use pipewright::logging::format_failure;

#[test]
fn located_failure_names_file_line_and_column() {
    let err: PipewrightError = TransformError::new("SyntaxError", "Unexpected token")
        .in_file("src/a.js")
        .at(3, 5)
        .into();

    assert_eq!(
        format_failure("transpile", &err, false),
        "transpile> SyntaxError: src/a.js: Line 3 & Column 5: Unexpected token"
    );
}

#[test]
fn unlocated_failure_is_a_single_message() {
    let err = PipewrightError::tool("lint", "exited with code 1");

    assert_eq!(
        format_failure("lint", &err, false),
        "lint> ToolError: lint failed: exited with code 1"
    );
}

#[test]
fn transform_without_file_keeps_its_kind() {
    let err: PipewrightError = TransformError::new("BuildError", "2 unit(s) failed to build").into();

    assert_eq!(err.kind(), "BuildError");
    assert_eq!(
        format_failure("package", &err, false),
        "package> BuildError: 2 unit(s) failed to build"
    );
}


// tests/pipeline_artifacts.rs

mod common;
use crate::common::{init_tracing, mock_project};

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use pipewright::cache::CacheStore;
use pipewright::errors::{PipewrightError, TransformError};
use pipewright::pipeline::source_map;
use pipewright::pipeline::{self, BuildScope, PipelineStage, min_name};
use pipewright_test_utils::{CountingTranspiler, ProjectConfigBuilder, RawFlagsBuilder, mock_context};

type TestResult = Result<(), Box<dyn Error>>;

const INDEX: &str = "const life = require('./service/life');\nmodule.exports = life;\n";
const LIFE: &str = "// answer\nmodule.exports = function () {\n  return 42;\n};\n";

#[test]
fn stage_plan_follows_the_flags() {
    let es6 = RawFlagsBuilder::new().production(true).resolve();
    assert_eq!(
        pipeline::plan(&es6),
        vec![
            PipelineStage::WriteIntermediate,
            PipelineStage::RenameWithSuffix,
            PipelineStage::SourceMapInit,
            PipelineStage::SourceMapWrite,
            PipelineStage::WriteFinal,
        ]
    );

    let dialect = RawFlagsBuilder::new().language("babel").production(true).resolve();
    let plan = pipeline::plan(&dialect);
    assert_eq!(plan.first(), Some(&PipelineStage::Transpile));
    assert!(plan.contains(&PipelineStage::Minify));
    assert_eq!(plan.len(), PipelineStage::ORDER.len());
}

#[test]
fn min_names_keep_the_directory() {
    assert_eq!(min_name(&PathBuf::from("index.js")), PathBuf::from("index.min.js"));
    assert_eq!(
        min_name(&PathBuf::from("service/life.js")),
        PathBuf::from("service/life.min.js")
    );
}

#[tokio::test]
async fn node_es6_production_copies_without_minifying() -> TestResult {
    init_tracing();
    let fs = mock_project(&[("src/index.js", INDEX), ("src/service/life.js", LIFE)]);
    let project = ProjectConfigBuilder::new().build();
    let config = RawFlagsBuilder::new().production(true).resolve();
    assert!(!config.minify);

    let transpiler = CountingTranspiler::new();
    let ctx = mock_context(&fs, &project, config, Arc::new(transpiler.clone()));
    let mut cache = CacheStore::in_memory();

    let report = pipeline::build(&ctx, &mut cache, &BuildScope::Full).await;

    assert!(report.is_success());
    assert_eq!(report.written.len(), 6);
    assert_eq!(transpiler.count(), 2);

    assert_eq!(fs.contents("./target/node/index.js").as_deref(), Some(INDEX));
    assert_eq!(
        fs.contents("./target/node/service/life.js").as_deref(),
        Some(LIFE)
    );

    let min = fs.contents("./target/node/service/life.min.js").ok_or("missing .min.js")?;
    let tail = min.strip_prefix(LIFE).ok_or("minified copy differs from source")?;
    assert_eq!(tail, "//# sourceMappingURL=life.min.js.map\n");

    let map_json = fs
        .contents("./target/node/service/life.min.js.map")
        .ok_or("missing map")?;
    let map = source_map::parse(&map_json)?;
    assert_eq!(map.get_file().map(|f| f.to_string()).as_deref(), Some("life.min.js"));
    let sources: Vec<String> = map.get_sources().map(|s| s.to_string()).collect();
    assert_eq!(sources, vec!["src/service/life.js".to_string()]);
    let last = source_map::original_position(&map, 3, 0).ok_or("line 4 unmapped")?;
    assert_eq!(last.line, 3);
    assert!(source_map::original_position(&map, 4, 0).is_none());
    Ok(())
}

#[tokio::test]
async fn browser_dialect_production_bundles_and_minifies() -> TestResult {
    init_tracing();
    let fs = mock_project(&[
        (
            "src/index.js",
            "import { greet } from './greet';\nconsole.log(greet('x'));\n",
        ),
        (
            "src/greet.js",
            "export function greet(name) {\n  // say hello\n  return 'hi ' + name;\n}\n",
        ),
    ]);
    let project = ProjectConfigBuilder::new().build();
    let config = RawFlagsBuilder::new()
        .platform("browser")
        .language("babel")
        .production(true)
        .resolve();
    assert!(config.minify);

    let transpiler = CountingTranspiler::new();
    let ctx = mock_context(&fs, &project, config, Arc::new(transpiler.clone()));
    let mut cache = CacheStore::in_memory();

    let report = pipeline::build(&ctx, &mut cache, &BuildScope::Full).await;

    assert!(report.is_success(), "failures: {:?}", report.failures);
    assert_eq!(report.written.len(), 3);
    assert_eq!(
        transpiler.calls(),
        vec!["src/index.js".to_string(), "src/greet.js".to_string()]
    );

    let bundle = fs.contents("./target/browser/index.js").ok_or("missing bundle")?;
    assert!(bundle.contains("__pw_require(\"src/greet.js\")"));
    assert!(bundle.contains("\"src/index.js\": function (module, exports, __pw_require) {"));

    let min = fs.contents("./target/browser/index.min.js").ok_or("missing .min.js")?;
    assert!(!min.contains("say hello"));
    assert!(min.len() < bundle.len());
    assert!(min.ends_with("//# sourceMappingURL=index.min.js.map\n"));

    let map_json = fs
        .contents("./target/browser/index.min.js.map")
        .ok_or("missing map")?;
    let map = source_map::parse(&map_json)?;
    let sources: Vec<String> = map.get_sources().map(|s| s.to_string()).collect();
    assert!(sources.contains(&"src/index.js".to_string()));
    assert!(sources.contains(&"src/greet.js".to_string()));
    Ok(())
}

#[tokio::test]
async fn failing_unit_does_not_stop_the_others() -> TestResult {
    init_tracing();
    let fs = mock_project(&[("src/index.js", INDEX), ("src/service/life.js", LIFE)]);
    let project = ProjectConfigBuilder::new().build();
    let config = RawFlagsBuilder::new().language("babel").resolve();

    let transpiler = CountingTranspiler::new().fail_on(
        "src/index.js",
        TransformError::new("SyntaxError", "Unexpected token")
            .in_file("src/index.js")
            .at(1, 7),
    );
    let ctx = mock_context(&fs, &project, config, Arc::new(transpiler.clone()));
    let mut cache = CacheStore::in_memory();

    let report = pipeline::build(&ctx, &mut cache, &BuildScope::Full).await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind(), "SyntaxError");
    assert!(fs.contents("./target/node/index.js").is_none());
    assert!(fs.contents("./target/node/service/life.min.js").is_some());
    Ok(())
}

#[tokio::test]
async fn minify_errors_carry_the_source_file() -> TestResult {
    init_tracing();
    let fs = mock_project(&[("src/broken.js", "var s = 'never closed;\n")]);
    let project = ProjectConfigBuilder::new().build();
    let config = RawFlagsBuilder::new().language("babel").production(true).resolve();
    let ctx = mock_context(&fs, &project, config, Arc::new(CountingTranspiler::new()));
    let mut cache = CacheStore::in_memory();

    let report = pipeline::build(&ctx, &mut cache, &BuildScope::Full).await;

    assert_eq!(report.failures.len(), 1);
    match &report.failures[0] {
        PipewrightError::Transform(err) => {
            assert_eq!(err.file, Some(PathBuf::from("src/broken.js")));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // The intermediate artifact is written before minification.
    assert!(fs.contents("./target/node/broken.js").is_some());
    assert!(fs.contents("./target/node/broken.min.js").is_none());
    Ok(())
}

#[tokio::test]
async fn minified_output_maps_back_to_the_original_line() -> TestResult {
    init_tracing();
    let source = "// header\n\nmodule.exports = function () {\n  return 42;\n};\n";
    let fs = mock_project(&[("src/answer.js", source)]);
    let project = ProjectConfigBuilder::new().build();
    let config = RawFlagsBuilder::new().language("babel").production(true).resolve();
    let ctx = mock_context(&fs, &project, config, Arc::new(CountingTranspiler::new()));
    let mut cache = CacheStore::in_memory();

    let report = pipeline::build(&ctx, &mut cache, &BuildScope::Full).await;
    assert!(report.is_success(), "failures: {:?}", report.failures);

    let min = fs.contents("./target/node/answer.min.js").ok_or("missing .min.js")?;
    assert!(!min.contains("header"));
    let map_json = fs
        .contents("./target/node/answer.min.js.map")
        .ok_or("missing map")?;
    let map = source_map::parse(&map_json)?;
    let start = source_map::original_position(&map, 0, 0).ok_or("first line unmapped")?;
    assert_eq!(start.source, "src/answer.js");
    assert_eq!(start.line, 2);
    Ok(())
}

#[tokio::test]
async fn overlapping_source_globs_keep_outputs_apart() -> TestResult {
    init_tracing();
    let fs = mock_project(&[
        ("src/x.js", "var app = 1;\n"),
        ("src/vendor/x.js", "var vendor = 2;\n"),
    ]);
    let project = ProjectConfigBuilder::new()
        .sources(&["src/**/*.js", "src/vendor/*.js"])
        .build();
    let config = RawFlagsBuilder::new().resolve();
    let ctx = mock_context(&fs, &project, config, Arc::new(CountingTranspiler::new()));
    let mut cache = CacheStore::in_memory();

    let report = pipeline::build(&ctx, &mut cache, &BuildScope::Full).await;

    assert!(report.is_success(), "failures: {:?}", report.failures);
    assert_eq!(fs.contents("./target/node/x.js").as_deref(), Some("var app = 1;\n"));
    assert_eq!(
        fs.contents("./target/node/vendor/x.js").as_deref(),
        Some("var vendor = 2;\n")
    );
    Ok(())
}

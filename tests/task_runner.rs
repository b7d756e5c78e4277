// tests/task_runner.rs

mod common;
use crate::common::{init_tracing, mock_project};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use pipewright::cache::{CacheStore, LINT_BUCKET};
use pipewright::config::ConfigFile;
use pipewright::errors::PipewrightError;
use pipewright::fs::mock::MockFileSystem;
use pipewright::fs::FileSystem;
use pipewright::tasks::runner::{TaskRunner, VERSION_FILE};
use pipewright::tasks::{TaskGraph, TaskName};
use pipewright_test_utils::{CountingTranspiler, ProjectConfigBuilder, RawFlagsBuilder, mock_context};

type TestResult = Result<(), Box<dyn Error>>;

const INDEX: &str = "module.exports = 1;\n";

fn quiet_project() -> ConfigFile {
    ProjectConfigBuilder::new()
        .lint_command("true")
        .test_command("true")
        .version("2.0.1")
        .build()
}

fn runner(fs: &MockFileSystem, project: &ConfigFile, flags: RawFlagsBuilder) -> TaskRunner {
    let ctx = mock_context(
        fs,
        project,
        flags.resolve(),
        Arc::new(CountingTranspiler::new()),
    );
    TaskRunner::new(
        ctx,
        project.tools.clone(),
        project.project.clone(),
        CacheStore::in_memory(),
    )
}

#[test]
fn package_runs_after_prepare_lint_and_test() {
    let graph = TaskGraph::standard();

    assert_eq!(
        graph.execution_order(TaskName::Package),
        vec![
            TaskName::Prepare,
            TaskName::Lint,
            TaskName::Test,
            TaskName::Package
        ]
    );
    assert_eq!(
        graph.dependencies_of(TaskName::Package),
        vec![TaskName::Lint, TaskName::Test]
    );
    assert_eq!(
        graph.execution_order(TaskName::Distribution).last(),
        Some(&TaskName::Distribution)
    );
    assert_eq!(graph.execution_order(TaskName::Clean), vec![TaskName::Clean]);
}

#[test]
fn cyclic_task_table_is_rejected() {
    let err = TaskGraph::new(&[
        (TaskName::Lint, TaskName::Test),
        (TaskName::Test, TaskName::Lint),
    ])
    .unwrap_err();

    assert!(matches!(err, PipewrightError::ConfigError(_)));
    assert!(err.to_string().contains("cycle"));
}

#[tokio::test]
async fn prepare_writes_the_version_stamp() -> TestResult {
    init_tracing();
    let fs = mock_project(&[]);
    let project = quiet_project();
    let mut runner = runner(&fs, &project, RawFlagsBuilder::new());

    let summary = runner.run(TaskName::Prepare).await;

    assert!(summary.success());
    assert_eq!(summary.executed, vec![TaskName::Prepare]);
    let stamp = Path::new("./target").join(VERSION_FILE);
    assert_eq!(fs.contents(&stamp).as_deref(), Some("2.0.1"));
    Ok(())
}

#[tokio::test]
async fn package_json_version_wins() -> TestResult {
    let fs = mock_project(&[("package.json", r#"{ "name": "lib", "version": "3.1.4" }"#)]);
    let project = quiet_project();
    let runner = runner(&fs, &project, RawFlagsBuilder::new());

    assert_eq!(runner.project_version(), "3.1.4");

    let bare = mock_project(&[]);
    let defaults = ProjectConfigBuilder::new().build();
    assert_eq!(
        self::runner(&bare, &defaults, RawFlagsBuilder::new()).project_version(),
        "0.0.0"
    );
    Ok(())
}

#[tokio::test]
async fn distribution_strips_the_min_suffix() -> TestResult {
    init_tracing();
    let fs = mock_project(&[("src/index.js", INDEX), ("src/util/math.js", INDEX)]);
    let project = quiet_project();
    let mut runner = runner(&fs, &project, RawFlagsBuilder::new().production(true));

    let summary = runner.run(TaskName::Distribution).await;

    assert!(summary.success(), "failed: {:?}", summary.failed);
    assert_eq!(
        summary.executed,
        vec![
            TaskName::Prepare,
            TaskName::Lint,
            TaskName::Test,
            TaskName::Package,
            TaskName::Distribution
        ]
    );
    let index = fs.contents("./lib/index.js").ok_or("missing lib/index.js")?;
    assert!(index.starts_with(INDEX));
    assert!(index.ends_with("//# sourceMappingURL=index.min.js.map\n"));
    assert!(fs.contents("./lib/util/math.js").is_some());
    assert!(fs.contents("./lib/index.min.js").is_none());
    Ok(())
}

#[tokio::test]
async fn distribution_without_artifacts_fails() -> TestResult {
    init_tracing();
    let fs = mock_project(&[]);
    let project = quiet_project();
    let mut runner = runner(&fs, &project, RawFlagsBuilder::new());

    let summary = runner.run(TaskName::Distribution).await;

    assert!(!summary.success());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, TaskName::Distribution);
    Ok(())
}

#[tokio::test]
async fn failing_tool_does_not_stop_later_tasks() -> TestResult {
    init_tracing();
    let fs = mock_project(&[("src/index.js", INDEX), ("test/index.spec.js", "it();\n")]);
    let project = ProjectConfigBuilder::new()
        .lint_command("sh -c 'exit 2'")
        .test_command("true")
        .build();
    let mut runner = runner(&fs, &project, RawFlagsBuilder::new());

    let summary = runner.run(TaskName::Package).await;

    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, TaskName::Lint);
    assert!(summary.failed[0].1.contains("exited with code 2"));
    assert_eq!(summary.executed.last(), Some(&TaskName::Package));
    assert!(fs.contents("./target/node/index.min.js").is_some());
    Ok(())
}

#[tokio::test]
async fn lint_cache_is_only_written_after_a_clean_run() -> TestResult {
    init_tracing();
    let fs = mock_project(&[("src/index.js", INDEX), ("test/index.spec.js", "it();\n")]);

    let failing = ProjectConfigBuilder::new().lint_command("false").build();
    let mut runner_a = runner(&fs, &failing, RawFlagsBuilder::new().incremental(true));
    runner_a.run(TaskName::Lint).await;
    assert_eq!(runner_a.cache().len(LINT_BUCKET), 0);

    let passing = ProjectConfigBuilder::new().lint_command("true").build();
    let mut runner_b = runner(&fs, &passing, RawFlagsBuilder::new().incremental(true));
    let summary = runner_b.run(TaskName::Lint).await;
    assert!(summary.success());
    assert_eq!(runner_b.cache().len(LINT_BUCKET), 2);
    Ok(())
}

#[tokio::test]
async fn report_captures_test_output_even_on_failure() -> TestResult {
    init_tracing();
    let fs = mock_project(&[("test/a.spec.js", "it();\n")]);
    let project = ProjectConfigBuilder::new()
        .test_command("echo \"ran $#\" && false")
        .build();
    let mut runner = runner(&fs, &project, RawFlagsBuilder::new().report(true));

    let summary = runner.run(TaskName::Test).await;

    assert!(!summary.success());
    assert_eq!(
        fs.contents("./target/mocha.log").as_deref(),
        Some("ran 1\n")
    );
    assert!(fs.contents("./target/test.log").is_none());
    Ok(())
}

#[tokio::test]
async fn clean_removes_outputs_and_cache() -> TestResult {
    init_tracing();
    let fs = mock_project(&[
        ("src/index.js", INDEX),
        ("target/node/index.js", INDEX),
        ("lib/index.js", INDEX),
    ]);
    let project = quiet_project();
    let mut runner = runner(&fs, &project, RawFlagsBuilder::new());

    let summary = runner.run(TaskName::Clean).await;

    assert!(summary.success());
    assert!(!fs.exists(Path::new("./target")));
    assert!(!fs.exists(Path::new("./lib")));
    assert!(fs.exists(Path::new("./src/index.js")));
    Ok(())
}

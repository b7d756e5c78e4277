// tests/watch_coordinator.rs

mod common;
use crate::common::{init_tracing, mock_project, with_timeout, write_project};

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pipewright::cache::{CacheEntry, CacheStore, LINT_BUCKET, NODE_BUCKET};
use pipewright::config::ProjectLayout;
use pipewright::errors::PipewrightError;
use pipewright::fs::{FileSystem, RealFileSystem};
use pipewright::pipeline::{self, BuildContext, BuildScope};
use pipewright::platform::PlatformStrategy;
use pipewright::watch::{
    CheckRunner, ChecksFuture, CoordinatorCore, FileRole, NoChecks, WatchCommand, WatchEvent,
    WatchPatterns, spawn_coordinator,
};
use pipewright_test_utils::{CountingTranspiler, ProjectConfigBuilder, RawFlagsBuilder, mock_context};

type TestResult = Result<(), Box<dyn Error>>;

fn layout() -> ProjectLayout {
    ProjectConfigBuilder::new().build().layout(".")
}

fn core_for(platform: &str) -> Result<CoordinatorCore, Box<dyn Error>> {
    let layout = layout();
    let config = RawFlagsBuilder::new().platform(platform).resolve();
    let strategy = PlatformStrategy::for_config(&config, &layout);
    let patterns = WatchPatterns::new(&layout)?;
    Ok(CoordinatorCore::new(".", strategy, patterns))
}

/// Counts check runs and fails every one of them.
#[derive(Debug, Default)]
struct FailingChecks {
    runs: AtomicUsize,
}

impl CheckRunner for FailingChecks {
    fn run_checks<'a>(&'a self, _ctx: &'a BuildContext, _cache: &'a mut CacheStore) -> ChecksFuture<'a> {
        Box::pin(async move {
            self.runs.fetch_add(1, Ordering::SeqCst);
            vec![PipewrightError::tool("test", "exited with code 1")]
        })
    }
}

#[test]
fn patterns_classify_sources_and_tests() -> TestResult {
    let patterns = WatchPatterns::new(&layout())?;

    assert_eq!(patterns.classify(Path::new("./src/a.js")), Some(FileRole::Source));
    assert_eq!(
        patterns.classify(Path::new("./test/a.spec.js")),
        Some(FileRole::Test)
    );
    assert_eq!(patterns.classify(Path::new("./README.md")), None);
    assert_eq!(patterns.classify(Path::new("/elsewhere/src/a.js")), None);

    let aliased = patterns.with_alias_root(PathBuf::from("/work/project"));
    assert_eq!(
        aliased.classify(Path::new("/work/project/src/a.js")),
        Some(FileRole::Source)
    );
    Ok(())
}

#[test]
fn node_changes_rebuild_only_the_changed_files() -> TestResult {
    let core = core_for("node")?;

    let commands = core.step(&[
        WatchEvent::changed("./src/b.js"),
        WatchEvent::changed("./src/a.js"),
        WatchEvent::changed("./src/a.js"),
    ]);

    assert_eq!(
        commands,
        vec![
            WatchCommand::Rebuild(BuildScope::Files(vec![
                PathBuf::from("./src/a.js"),
                PathBuf::from("./src/b.js"),
            ])),
            WatchCommand::RunChecks,
        ]
    );
    Ok(())
}

#[test]
fn browser_changes_rebuild_the_whole_bundle() -> TestResult {
    let core = core_for("browser")?;

    let commands = core.step(&[WatchEvent::changed("./src/a.js")]);

    assert_eq!(
        commands,
        vec![WatchCommand::Rebuild(BuildScope::Full), WatchCommand::RunChecks]
    );
    Ok(())
}

#[test]
fn deletions_invalidate_before_rebuilding() -> TestResult {
    let core = core_for("node")?;

    let commands = core.step(&[
        WatchEvent::deleted("./src/old.js"),
        WatchEvent::deleted("./test/old.spec.js"),
        WatchEvent::changed("./docs/notes.md"),
    ]);

    assert_eq!(
        commands,
        vec![
            WatchCommand::Invalidate(PathBuf::from("src/old.js")),
            WatchCommand::Invalidate(PathBuf::from("test/old.spec.js")),
            WatchCommand::Rebuild(BuildScope::Files(vec![PathBuf::from("./src/old.js")])),
            WatchCommand::RunChecks,
        ]
    );
    Ok(())
}

#[test]
fn test_only_changes_just_run_checks() -> TestResult {
    let core = core_for("node")?;

    assert_eq!(
        core.step(&[WatchEvent::changed("./test/a.spec.js")]),
        vec![WatchCommand::RunChecks]
    );
    assert!(core.step(&[WatchEvent::changed("./notes.txt")]).is_empty());
    Ok(())
}

#[tokio::test]
async fn deleted_file_leaves_every_bucket() -> TestResult {
    init_tracing();
    let fs = mock_project(&[("src/a.js", "var a = 1;\n")]);
    let project = ProjectConfigBuilder::new().build();
    let config = RawFlagsBuilder::new().language("babel").incremental(true).resolve();
    let ctx = mock_context(&fs, &project, config, Arc::new(CountingTranspiler::new()));

    let mut cache = CacheStore::in_memory();
    cache.insert(NODE_BUCKET, "src/gone.js", CacheEntry::new("h").with_artifact("gone.js"));
    cache.insert(LINT_BUCKET, "src/gone.js", CacheEntry::new("h"));

    let checks = Arc::new(FailingChecks::default());
    let handle = spawn_coordinator(ctx, cache, checks.clone())?;
    handle.send(vec![WatchEvent::deleted("./src/gone.js")])?;
    let cache = with_timeout(handle.stop()).await?;

    assert!(!cache.contains(Path::new("src/gone.js")));
    assert_eq!(checks.runs.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn failing_checks_keep_the_loop_alive() -> TestResult {
    init_tracing();
    let fs = mock_project(&[("src/a.js", "var a = 1;\n")]);
    let project = ProjectConfigBuilder::new().build();
    let config = RawFlagsBuilder::new().language("babel").incremental(true).resolve();
    let transpiler = CountingTranspiler::new();
    let ctx = mock_context(&fs, &project, config, Arc::new(transpiler.clone()));

    let checks = Arc::new(FailingChecks::default());
    let handle = spawn_coordinator(ctx, CacheStore::in_memory(), checks.clone())?;

    handle.send(vec![WatchEvent::changed("./src/a.js")])?;
    fs.add_file("./src/b.js", "var b = 2;\n");
    handle.send(vec![WatchEvent::changed("./src/b.js")])?;
    let cache = with_timeout(handle.stop()).await?;

    // Batches may be coalesced; both files are built either way.
    assert!(checks.runs.load(Ordering::SeqCst) >= 1);
    let mut calls = transpiler.calls();
    calls.sort();
    assert_eq!(calls, vec!["src/a.js".to_string(), "src/b.js".to_string()]);
    assert_eq!(cache.len(NODE_BUCKET), 2);
    assert!(fs.contents("./target/node/b.min.js").is_some());
    Ok(())
}

#[tokio::test]
async fn deleting_a_built_file_forces_a_rebuild_when_it_returns() -> TestResult {
    init_tracing();
    let fs = mock_project(&[("src/a.js", "var a = 1;\n")]);
    let project = ProjectConfigBuilder::new().build();
    let config = RawFlagsBuilder::new().language("babel").incremental(true).resolve();
    let transpiler = CountingTranspiler::new();
    let ctx = mock_context(&fs, &project, config, Arc::new(transpiler.clone()));

    let mut cache = CacheStore::in_memory();
    let report = pipeline::build(&ctx, &mut cache, &BuildScope::Full).await;
    assert!(report.is_success());
    assert_eq!(cache.len(NODE_BUCKET), 1);
    assert!(cache.get(NODE_BUCKET, Path::new("src/a.js")).is_some());

    fs.remove_all(Path::new("./src/a.js"))?;
    let handle = spawn_coordinator(ctx.clone(), cache, Arc::new(NoChecks))?;
    handle.send(vec![WatchEvent::deleted("./src/a.js")])?;
    let mut cache = with_timeout(handle.stop()).await?;

    assert!(cache.get(NODE_BUCKET, Path::new("src/a.js")).is_none());
    assert_eq!(cache.len(NODE_BUCKET), 0);

    // Same content as before; without the invalidation this would be skipped.
    transpiler.reset();
    fs.add_file("./src/a.js", "var a = 1;\n");
    let report = pipeline::build(&ctx, &mut cache, &BuildScope::Full).await;

    assert!(report.is_success());
    assert_eq!(transpiler.calls(), vec!["src/a.js".to_string()]);
    assert_eq!(cache.len(NODE_BUCKET), 1);
    Ok(())
}

#[tokio::test]
async fn new_file_on_disk_is_picked_up_by_the_watcher() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    // notify reports canonical paths.
    let root = dir.path().canonicalize()?;
    write_project(&root, &[("src/a.js", "var a = 1;\n")])?;

    let project = ProjectConfigBuilder::new().build();
    let transpiler = CountingTranspiler::new();
    let ctx = BuildContext {
        config: RawFlagsBuilder::new().language("babel").incremental(true).resolve(),
        layout: project.layout(root.clone()),
        fs: Arc::new(RealFileSystem),
        transpiler: Arc::new(transpiler.clone()),
    };

    let handle = pipewright::watch::start(ctx, CacheStore::in_memory(), Arc::new(NoChecks))?;
    write_project(&root, &[("src/b.js", "var b = 2;\n")])?;

    let output = root.join("target/node/b.min.js");
    with_timeout(async {
        while !output.is_file() {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    })
    .await;
    let cache = with_timeout(handle.stop()).await?;

    assert!(transpiler.calls().contains(&"src/b.js".to_string()));
    assert!(cache.get(NODE_BUCKET, &root.join("src/b.js")).is_some());
    Ok(())
}

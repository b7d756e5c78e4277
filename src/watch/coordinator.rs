// src/watch/coordinator.rs

//! Watch-mode coordination.
//!
//! [`CoordinatorCore`] is pure: it turns a batch of [`WatchEvent`]s into
//! [`WatchCommand`]s and never touches the filesystem or the cache. The
//! async [`run_loop`] owns the [`CacheStore`] and executes those commands one
//! batch at a time.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, normalize_path};
use crate::errors::PipewrightError;
use crate::logging::report_failure;
use crate::pipeline::{self, BuildContext, BuildScope};
use crate::platform::PlatformStrategy;
use crate::watch::event::{WatchEvent, WatchEventKind};
use crate::watch::patterns::{FileRole, WatchPatterns};

/// One action derived from a batch of events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    /// Drop the cache entry for this (normalized) path from every bucket.
    Invalidate(PathBuf),
    Rebuild(BuildScope),
    /// Re-run lint and test.
    RunChecks,
}

/// Messages consumed by the coordinator loop.
#[derive(Debug)]
pub enum LoopMessage {
    Events(Vec<WatchEvent>),
    Shutdown,
}

/// Boxed future returned by [`CheckRunner::run_checks`].
pub type ChecksFuture<'a> = Pin<Box<dyn Future<Output = Vec<PipewrightError>> + Send + 'a>>;

/// Runs the lint and test checks after a change.
///
/// Returns every failure; the loop reports them and keeps going.
pub trait CheckRunner: Send + Sync + Debug {
    fn run_checks<'a>(&'a self, ctx: &'a BuildContext, cache: &'a mut CacheStore) -> ChecksFuture<'a>;
}

/// A [`CheckRunner`] that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoChecks;

impl CheckRunner for NoChecks {
    fn run_checks<'a>(&'a self, _ctx: &'a BuildContext, _cache: &'a mut CacheStore) -> ChecksFuture<'a> {
        Box::pin(async { Vec::new() })
    }
}

/// Pure event-to-command logic.
#[derive(Debug, Clone)]
pub struct CoordinatorCore {
    root: PathBuf,
    strategy: PlatformStrategy,
    patterns: WatchPatterns,
}

impl CoordinatorCore {
    pub fn new(root: impl Into<PathBuf>, strategy: PlatformStrategy, patterns: WatchPatterns) -> Self {
        Self {
            root: root.into(),
            strategy,
            patterns,
        }
    }

    /// Coalesce a batch into deduplicated commands, ordered as
    /// invalidations, then at most one rebuild, then at most one check run.
    pub fn step(&self, batch: &[WatchEvent]) -> Vec<WatchCommand> {
        let mut invalidate = BTreeSet::new();
        let mut changed_sources = BTreeSet::new();
        let mut checks = false;

        for event in batch {
            let Some(role) = self.patterns.classify(&event.path) else {
                debug!(path = ?event.path, "ignoring unwatched path");
                continue;
            };
            if event.kind == WatchEventKind::Deleted {
                invalidate.insert(normalize_path(&self.root, &event.path));
            }
            if role == FileRole::Source {
                changed_sources.insert(event.path.clone());
            }
            checks = true;
        }

        let mut commands: Vec<WatchCommand> =
            invalidate.into_iter().map(WatchCommand::Invalidate).collect();

        if !changed_sources.is_empty() {
            let scope = self
                .strategy
                .scope_for_changes(changed_sources.into_iter().collect());
            commands.push(WatchCommand::Rebuild(scope));
        }
        if checks {
            commands.push(WatchCommand::RunChecks);
        }
        commands
    }
}

/// Consume messages until `Shutdown` (or the channel closes) and hand the
/// cache back.
///
/// Events that are already queued when a batch starts are folded into that
/// batch. Failures are reported and never end the loop.
pub async fn run_loop(
    core: CoordinatorCore,
    ctx: BuildContext,
    mut cache: CacheStore,
    checks: std::sync::Arc<dyn CheckRunner>,
    mut rx: mpsc::UnboundedReceiver<LoopMessage>,
) -> CacheStore {
    let mut shutdown = false;

    while !shutdown {
        let mut batch = match rx.recv().await {
            Some(LoopMessage::Events(events)) => events,
            Some(LoopMessage::Shutdown) | None => break,
        };
        while let Ok(message) = rx.try_recv() {
            match message {
                LoopMessage::Events(more) => batch.extend(more),
                LoopMessage::Shutdown => {
                    shutdown = true;
                    break;
                }
            }
        }

        let commands = core.step(&batch);
        debug!(events = batch.len(), commands = commands.len(), "watch batch");
        for command in commands {
            execute(&ctx, &mut cache, checks.as_ref(), command).await;
        }
        if let Err(err) = cache.flush(ctx.fs.as_ref()) {
            warn!(error = %err, "failed to persist cache");
        }
    }

    info!("watch loop finished");
    cache
}

async fn execute(
    ctx: &BuildContext,
    cache: &mut CacheStore,
    checks: &dyn CheckRunner,
    command: WatchCommand,
) {
    match command {
        WatchCommand::Invalidate(path) => {
            let buckets = cache.invalidate(&path);
            info!(?path, ?buckets, "file removed; cache entries dropped");
        }
        WatchCommand::Rebuild(scope) => {
            info!(?scope, "rebuilding");
            pipeline::build(ctx, cache, &scope).await;
        }
        WatchCommand::RunChecks => {
            for err in checks.run_checks(ctx, cache).await {
                report_failure("watch", &err);
            }
        }
    }
}

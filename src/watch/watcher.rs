// src/watch/watcher.rs

use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::pipeline::BuildContext;
use crate::platform::PlatformStrategy;
use crate::watch::coordinator::{CheckRunner, CoordinatorCore, LoopMessage, run_loop};
use crate::watch::event::{WatchEvent, from_notify};
use crate::watch::patterns::WatchPatterns;

/// Handle for a running watch session.
///
/// Holds the `notify` watcher (if any) and the coordinator task. Dropping
/// the handle stops file watching but leaves the loop to drain on its own;
/// use [`WatchHandle::stop`] to get the cache back.
pub struct WatchHandle {
    watcher: Option<RecommendedWatcher>,
    tx: mpsc::UnboundedSender<LoopMessage>,
    task: JoinHandle<CacheStore>,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("listening", &self.watcher.is_some())
            .finish_non_exhaustive()
    }
}

impl WatchHandle {
    /// Feed events straight into the coordinator.
    pub fn send(&self, events: Vec<WatchEvent>) -> Result<()> {
        self.tx
            .send(LoopMessage::Events(events))
            .map_err(|_| anyhow::anyhow!("watch loop has already stopped"))
    }

    /// Detach the filesystem listener, let the in-flight batch finish and
    /// return the cache.
    pub async fn stop(mut self) -> Result<CacheStore> {
        drop(self.watcher.take());
        // The loop may already be gone if the channel closed.
        let _ = self.tx.send(LoopMessage::Shutdown);
        let cache = self.task.await?;
        info!("watch stopped");
        Ok(cache)
    }
}

/// Start the coordinator loop without a filesystem listener.
pub fn spawn_coordinator(
    ctx: BuildContext,
    cache: CacheStore,
    checks: Arc<dyn CheckRunner>,
) -> Result<WatchHandle> {
    spawn(ctx, cache, checks, None)
}

/// Watch the project root recursively and rebuild on change.
pub fn start(
    ctx: BuildContext,
    cache: CacheStore,
    checks: Arc<dyn CheckRunner>,
) -> Result<WatchHandle> {
    let root = ctx.layout.root.clone();
    // notify reports canonical paths on some platforms.
    let canonical = ctx.fs.canonicalize(&root).unwrap_or_else(|_| root.clone());
    spawn(ctx, cache, checks, Some(canonical))
}

fn spawn(
    ctx: BuildContext,
    cache: CacheStore,
    checks: Arc<dyn CheckRunner>,
    listen_on: Option<std::path::PathBuf>,
) -> Result<WatchHandle> {
    let strategy = PlatformStrategy::for_config(&ctx.config, &ctx.layout);
    let mut patterns = WatchPatterns::new(&ctx.layout)?;
    if let Some(root) = &listen_on {
        patterns = patterns.with_alias_root(root.clone());
    }
    let core = CoordinatorCore::new(ctx.layout.root.clone(), strategy, patterns);

    let (tx, rx) = mpsc::unbounded_channel::<LoopMessage>();

    let watcher = match listen_on {
        Some(root) => {
            let event_tx = tx.clone();
            let mut watcher = RecommendedWatcher::new(
                move |res: notify::Result<Event>| match res {
                    Ok(event) => {
                        debug!(?event, "received notify event");
                        let events = from_notify(&event);
                        if !events.is_empty() {
                            // Fails only once the loop has stopped.
                            let _ = event_tx.send(LoopMessage::Events(events));
                        }
                    }
                    Err(err) => warn!(error = %err, "file watch error"),
                },
                Config::default(),
            )?;
            watcher.watch(&root, RecursiveMode::Recursive)?;
            info!("file watcher started on {:?}", root);
            Some(watcher)
        }
        None => None,
    };

    let task = tokio::spawn(run_loop(core, ctx, cache, checks, rx));
    Ok(WatchHandle { watcher, tx, task })
}

// src/watch/mod.rs

//! File watching and change coordination.
//!
//! - [`event`] converts `notify` events into [`WatchEvent`]s.
//! - [`patterns`] decides whether a path is a source, a test, or ignored.
//! - [`coordinator`] turns event batches into commands (pure core) and runs
//!   them against the build and the cache (async loop).
//! - [`watcher`] wires a recursive `notify` watcher to the loop.

pub mod coordinator;
pub mod event;
pub mod patterns;
pub mod watcher;

pub use coordinator::{CheckRunner, ChecksFuture, CoordinatorCore, NoChecks, WatchCommand};
pub use event::{WatchEvent, WatchEventKind};
pub use patterns::{FileRole, WatchPatterns};
pub use watcher::{WatchHandle, spawn_coordinator, start};

// src/tasks/mod.rs

//! Named tasks and the order they run in.
//!
//! - [`graph`] holds the dependency graph and computes execution order.
//! - [`checks`] wraps the external lint and test tools.
//! - [`runner`] executes a task and its dependencies against one build
//!   context and cache.

pub mod checks;
pub mod graph;
pub mod runner;

use std::fmt;

use clap::ValueEnum;

pub use checks::ToolChecks;
pub use graph::TaskGraph;
pub use runner::{RunSummary, TaskRunner};

/// A task selectable on the command line.
///
/// Declaration order doubles as the tie-break when several tasks are ready
/// at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum TaskName {
    /// Log the resolved configuration.
    Config,
    /// Write the version stamp.
    Prepare,
    /// Clear caches and remove build outputs.
    Clean,
    Lint,
    Test,
    /// Single-shot build.
    Package,
    /// Build, then rebuild on change until interrupted.
    Watch,
    /// Copy minified artifacts into the library directory.
    Distribution,
    Default,
}

impl TaskName {
    pub const ALL: [TaskName; 9] = [
        TaskName::Config,
        TaskName::Prepare,
        TaskName::Clean,
        TaskName::Lint,
        TaskName::Test,
        TaskName::Package,
        TaskName::Watch,
        TaskName::Distribution,
        TaskName::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskName::Config => "config",
            TaskName::Prepare => "prepare",
            TaskName::Clean => "clean",
            TaskName::Lint => "lint",
            TaskName::Test => "test",
            TaskName::Package => "package",
            TaskName::Watch => "watch",
            TaskName::Distribution => "distribution",
            TaskName::Default => "default",
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

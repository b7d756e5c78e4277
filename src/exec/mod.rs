// src/exec/mod.rs

//! Process execution layer.
//!
//! External tools (lint, test, transpiler) run through
//! `tokio::process::Command`; see [`tool`].

pub mod tool;

pub use tool::{ToolInvocation, ToolOutcome, run_tool, spawn_tool};

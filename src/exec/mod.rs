// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the supervised command,
//! using `tokio::process::Command`, enforcing the per-run deadline, and
//! classifying the outcome.
//!
//! - [`command`] owns the single-run executor: spawn, capture combined
//!   output, enforce the timeout, classify.
//! - [`reap`] collects exited children that were reparented to this
//!   process, so long-running deployments don't accumulate zombies.

pub mod command;
pub mod reap;

pub use command::{CommandSpec, ExitClassification, RunResult, run_command};
pub use reap::reap_children;

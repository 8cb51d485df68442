// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Run-level failures (spawn errors, timeouts, non-zero exits) are not
//! errors here; they are [`ExitClassification`](crate::exec::ExitClassification)
//! values. This module covers the genuinely exceptional paths.

pub use anyhow::{Error, Result};

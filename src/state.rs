// src/state.rs

//! Shared latest-result state.
//!
//! The scheduler is the single writer; HTTP handlers are the readers.
//! One mutex guards the whole record, so a reader either sees the
//! previous run in full or the new run in full, never a mix.

use std::sync::{Arc, Mutex};

use crate::exec::RunResult;

/// Latest run result plus the static command description, behind one lock.
///
/// `snapshot()` returns an owned copy, so readers never hold the lock
/// while formatting a response, and the scheduler never blocks on a slow
/// client.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug)]
struct Inner {
    command: String,
    last: Option<RunResult>,
}

/// Owned, consistent copy of the state at one instant.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Command line the process was started with.
    pub command: String,
    /// The most recently completed run, if any run has completed yet.
    pub last: Option<RunResult>,
}

impl SharedState {
    pub fn new(command: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                command,
                last: None,
            })),
        }
    }

    /// Replace the latest result. Called once per completed run.
    pub fn publish(&self, result: RunResult) {
        let mut inner = self.inner.lock().expect("state lock poisoned");
        inner.last = Some(result);
    }

    /// Copy out the current state.
    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.inner.lock().expect("state lock poisoned");
        StateSnapshot {
            command: inner.command.clone(),
            last: inner.last.clone(),
        }
    }
}

// src/exec/reap.rs

//! Zombie reaping for reparented children.
//!
//! The supervised command may fork subprocesses that outlive it. When it
//! exits, those get reparented to us, and unless someone collects their
//! exit status they stay in the process table as zombies. After every run
//! we sweep up whatever has already exited.
//!
//! On non-unix targets the operating system reaps automatically and this
//! module is a no-op.

#[cfg(unix)]
use tracing::debug;

/// Collect every already-exited child of this process, stopping as soon
/// as none remain.
///
/// Never blocks: `WNOHANG` makes each iteration a poll, and the loop ends
/// on "no exited child right now" as well as on "no children at all"
/// (`ECHILD`). Failures here are expected housekeeping noise, logged at
/// debug and otherwise ignored.
#[cfg(unix)]
pub fn reap_children() {
    use nix::errno::Errno;
    use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
    use nix::unistd::Pid;

    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => {
                // Children exist but none have exited yet.
                return;
            }
            Ok(status) => {
                debug!(?status, "reaped child");
            }
            Err(Errno::ECHILD) => {
                // No children at all; the expected terminal case.
                return;
            }
            Err(err) => {
                debug!(error = %err, "reap failed");
                return;
            }
        }
    }
}

#[cfg(not(unix))]
pub fn reap_children() {}

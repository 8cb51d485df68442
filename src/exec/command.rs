// src/exec/command.rs

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::exec::reap::reap_children;

/// Output recorded when the deadline killed the command before it produced
/// anything.
const TIMEOUT_SENTINEL: &[u8] = b"command timed out";

/// How long to wait for the output readers to hit pipe EOF once the
/// command is finished. A grandchild that inherited the pipes can hold
/// them open indefinitely (a daemonizing `foo & exit 0`); the command's
/// own output is already in the pipe by the time it exits, so whatever
/// has arrived within the grace window is everything we need.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// The command to supervise, fixed at startup.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the command. `None` inherits ours.
    pub working_dir: Option<PathBuf>,
    /// Hard wall-clock deadline per run, measured from spawn.
    pub timeout: Duration,
    /// Target cadence between run starts.
    pub period: Duration,
}

impl CommandSpec {
    /// The command line as shown on the status page, e.g. `"sh -c foo"`.
    pub fn display(&self) -> String {
        let mut s = self.program.clone();
        for arg in &self.args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }
}

/// How a single run ended. Exactly one variant applies per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitClassification {
    /// Exited with status 0.
    Success,
    /// Exited with a non-zero status; carries the real exit code
    /// (`128 + signal` when the process was signal-terminated).
    ExitCode(i32),
    /// Killed because it outlived the configured deadline.
    Timeout,
    /// The process never started (missing executable, permissions, ...).
    SpawnError(String),
}

impl ExitClassification {
    /// Label value for the per-exit-code run counter. Success is `"0"`;
    /// timeouts and spawn failures are counted under the sentinel `"255"`.
    pub fn code_label(&self) -> String {
        match self {
            ExitClassification::Success => "0".to_string(),
            ExitClassification::ExitCode(code) => code.to_string(),
            ExitClassification::Timeout | ExitClassification::SpawnError(_) => "255".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitClassification::Success)
    }
}

/// Everything captured from one run. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Combined stdout + stderr (stdout first).
    pub output: Vec<u8>,
    pub classification: ExitClassification,
    pub started: SystemTime,
    pub duration: Duration,
}

impl RunResult {
    /// Lossy UTF-8 view of the captured output, for logging and the
    /// status page.
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Run the command once and classify the outcome.
///
/// Always produces exactly one `RunResult`: run-level failures (spawn
/// errors, timeouts, non-zero exits) become classifications, not `Err`s.
/// Reaps orphaned children after collecting the result, before returning.
pub async fn run_command(spec: &CommandSpec) -> RunResult {
    info!(command = %spec.program, args = ?spec.args, "running command");

    let started = SystemTime::now();
    let start = Instant::now();

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = &spec.working_dir {
        cmd.current_dir(dir);
    }

    // Own process group, so the deadline kill reaches children the
    // command spawned.
    #[cfg(unix)]
    cmd.process_group(0);

    let result = match cmd.spawn() {
        Ok(child) => supervise(child, spec.timeout).await,
        Err(err) => {
            warn!(command = %spec.program, error = %err, "failed to spawn command");
            let message = err.to_string();
            (message.clone().into_bytes(), ExitClassification::SpawnError(message))
        }
    };

    reap_children();

    let (output, classification) = result;
    RunResult {
        output,
        classification,
        started,
        duration: start.elapsed(),
    }
}

/// Wait for a spawned child under the deadline, collecting combined output.
async fn supervise(mut child: Child, timeout: Duration) -> (Vec<u8>, ExitClassification) {
    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let output = join_output(stdout, stderr).await;
            (output, classify_status(status))
        }
        Ok(Err(err)) => {
            // wait() itself failed; the child's fate is unknown.
            warn!(error = %err, "failed to wait on command");
            let output = join_output(stdout, stderr).await;
            (output, ExitClassification::SpawnError(err.to_string()))
        }
        Err(_) => {
            warn!(?timeout, "command deadline expired, killing process group");
            kill_group(&mut child).await;

            let mut output = join_output(stdout, stderr).await;
            if output.is_empty() {
                output = TIMEOUT_SENTINEL.to_vec();
            }
            (output, ExitClassification::Timeout)
        }
    }
}

fn classify_status(status: std::process::ExitStatus) -> ExitClassification {
    if status.success() {
        return ExitClassification::Success;
    }
    let code = status.code().unwrap_or_else(|| signal_code(&status));
    ExitClassification::ExitCode(code)
}

/// Exit code for a signal-terminated process, shell convention 128+N.
#[cfg(unix)]
fn signal_code(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|sig| 128 + sig).unwrap_or(-1)
}

#[cfg(not(unix))]
fn signal_code(_status: &std::process::ExitStatus) -> i32 {
    -1
}

/// Kill the child's whole process group, falling back to the child alone.
async fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        // The child leads its own group (process_group(0) at spawn).
        match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) => {
                // Collect the leader so it doesn't linger as a zombie
                // until the next reap pass.
                let _ = child.wait().await;
                return;
            }
            Err(err) => {
                debug!(pid, error = %err, "killpg failed, killing child directly");
            }
        }
    }

    if let Err(err) = child.kill().await {
        warn!(error = %err, "failed to kill timed-out command");
    }
}

/// An output stream being captured in the background. The buffer is
/// shared so partial output stays reachable even when the reader never
/// sees EOF.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

fn spawn_reader<R>(reader: Option<R>) -> Option<Capture>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    reader.map(|mut r| {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let handle = tokio::spawn(async move {
            let mut chunk = [0u8; 8192];
            loop {
                match r.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let mut sink = sink.lock().expect("capture lock poisoned");
                        sink.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        });
        Capture { buf, handle }
    })
}

/// Concatenate captured stdout then stderr. The wait for pipe EOF is
/// bounded by [`DRAIN_GRACE`] on every path: a reader still blocked after
/// that is stuck on an inherited pipe, not on command output, and gets
/// aborted while we take what has arrived.
async fn join_output(stdout: Option<Capture>, stderr: Option<Capture>) -> Vec<u8> {
    let mut out = Vec::new();
    for capture in [stdout, stderr].into_iter().flatten() {
        let abort = capture.handle.abort_handle();
        if tokio::time::timeout(DRAIN_GRACE, capture.handle).await.is_err() {
            debug!("output reader held past grace, taking partial output");
            abort.abort();
        }
        let mut buf = capture.buf.lock().expect("capture lock poisoned");
        out.append(&mut buf);
    }
    out
}

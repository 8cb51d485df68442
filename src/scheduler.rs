// src/scheduler.rs

//! The supervised run loop.
//!
//! Runs the command once immediately at startup, then on a fixed-period
//! timer, strictly serialized: at most one run is ever in flight. The
//! interval uses [`MissedTickBehavior::Delay`], so a tick that would have
//! fired while a slow run was still going is dropped rather than queued,
//! and the cadence between runs is `max(period, run_duration)`.

use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::exec::{CommandSpec, ExitClassification, run_command};
use crate::metrics::Metrics;
use crate::state::SharedState;

/// Drive the run loop forever.
///
/// Run-level failures are classifications, not errors; nothing a single
/// run does can stop the loop. Intended to be spawned as a background
/// task for the lifetime of the process.
pub async fn run_loop(spec: CommandSpec, state: SharedState, metrics: Metrics) {
    // interval() panics on a zero period; clamp rather than die.
    let period = spec.period.max(std::time::Duration::from_millis(1));
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // The first tick completes immediately, giving the startup run.
        ticker.tick().await;
        run_once(&spec, &state, &metrics).await;
    }
}

/// Execute one run and publish its result and metrics.
pub async fn run_once(spec: &CommandSpec, state: &SharedState, metrics: &Metrics) {
    let result = run_command(spec).await;

    match &result.classification {
        ExitClassification::Success => {
            info!(
                duration_ms = result.duration.as_millis() as u64,
                output = %result.output_lossy(),
                "command exited successfully"
            );
        }
        ExitClassification::ExitCode(code) => {
            info!(
                exit_code = code,
                output = %result.output_lossy(),
                "command exited with non-zero status"
            );
        }
        ExitClassification::Timeout => {
            warn!(
                timeout = ?spec.timeout,
                "command timed out"
            );
        }
        ExitClassification::SpawnError(message) => {
            warn!(error = %message, "command failed to start");
        }
    }

    metrics.record(&result);
    state.publish(result);
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use prometheus::Registry;

    use super::*;

    /// Feeds the fmt subscriber into an in-memory buffer for assertions.
    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl CaptureWriter {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn spec(cmd: &str, period_ms: u64) -> CommandSpec {
        CommandSpec {
            program: "sh".into(),
            args: vec!["-c".into(), cmd.into()],
            working_dir: None,
            timeout: Duration::from_secs(5),
            period: Duration::from_millis(period_ms),
        }
    }

    fn fixtures(command: &str) -> (SharedState, Metrics) {
        let registry = Registry::new();
        (
            SharedState::new(command.into()),
            Metrics::new(&registry).unwrap(),
        )
    }

    #[tokio::test]
    async fn run_once_publishes_result_and_metrics() {
        let spec = spec("echo done", 1000);
        let (state, metrics) = fixtures("echo done");

        run_once(&spec, &state, &metrics).await;

        let snap = state.snapshot();
        let last = snap.last.expect("result published");
        assert_eq!(last.classification, ExitClassification::Success);
        assert_eq!(last.output_lossy().trim(), "done");
    }

    #[tokio::test]
    async fn success_log_includes_captured_output() {
        let writer = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let spec = spec("echo logged-output", 1000);
        let (state, metrics) = fixtures("echo logged-output");
        run_once(&spec, &state, &metrics).await;

        let logs = writer.contents();
        assert!(
            logs.contains("logged-output"),
            "success log line missing the command output: {logs}"
        );
        assert!(logs.contains("command exited successfully"));
    }

    #[tokio::test]
    async fn first_run_starts_immediately() {
        // Period much longer than the test: only the startup run fires.
        let spec = spec("echo started", 60_000);
        let (state, metrics) = fixtures("echo started");

        let loop_state = state.clone();
        tokio::spawn(run_loop(spec, loop_state, metrics));

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if state.snapshot().last.is_some() {
                break;
            }
            assert!(Instant::now() < deadline, "startup run never completed");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn slow_run_drops_ticks_instead_of_queueing() {
        // Each run takes ~300ms against a 100ms period. With tick
        // dropping the loop completes roughly elapsed/300 runs; a
        // queueing loop would burst to elapsed/100.
        let spec = spec("sleep 0.3; echo tick", 100);
        let (state, metrics) = fixtures("sleep");

        let counter = metrics.clone();
        tokio::spawn(run_loop(spec, state.clone(), counter));

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let runs = metrics.exit_count("0");
        assert!(runs >= 2, "expected at least two runs, got {runs}");
        assert!(runs <= 4, "runs queued up instead of dropping: {runs}");
    }
}

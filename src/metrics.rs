// src/metrics.rs

//! Prometheus metrics for completed runs.
//!
//! One `Metrics` value owns the handles; everything is registered against
//! a crate-owned [`Registry`] that the HTTP layer encodes for `/metrics`.
//! Metric names follow the `promrun_command_*` scheme.

use anyhow::Context;
use prometheus::{Gauge, Histogram, HistogramOpts, IntCounterVec, Opts, Registry};

use crate::errors::Result;
use crate::exec::RunResult;

#[derive(Debug, Clone)]
pub struct Metrics {
    exits_total: IntCounterVec,
    duration_seconds: Histogram,
    last_run_timestamp: Gauge,
    last_success_timestamp: Gauge,
    last_run_duration: Gauge,
}

impl Metrics {
    /// Create the run metrics and register them with `registry`.
    pub fn new(registry: &Registry) -> Result<Self> {
        let exits_total = IntCounterVec::new(
            Opts::new(
                "promrun_command_exits_total",
                "Counts the number of times the command ran by exit code.",
            ),
            &["code"],
        )
        .context("creating exits counter")?;

        let duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "promrun_command_duration_seconds",
            "Time spent running command.",
        ))
        .context("creating duration histogram")?;

        let last_run_timestamp = Gauge::new(
            "promrun_command_last_run_timestamp_seconds",
            "The timestamp of the last run.",
        )
        .context("creating last-run gauge")?;

        let last_success_timestamp = Gauge::new(
            "promrun_command_last_success_timestamp_seconds",
            "The timestamp of the last successful run.",
        )
        .context("creating last-success gauge")?;

        let last_run_duration = Gauge::new(
            "promrun_command_last_run_duration_seconds",
            "The duration of the last run.",
        )
        .context("creating last-duration gauge")?;

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(exits_total.clone()),
            Box::new(duration_seconds.clone()),
            Box::new(last_run_timestamp.clone()),
            Box::new(last_success_timestamp.clone()),
            Box::new(last_run_duration.clone()),
        ];
        for collector in collectors {
            registry
                .register(collector)
                .context("registering run metrics")?;
        }

        Ok(Self {
            exits_total,
            duration_seconds,
            last_run_timestamp,
            last_success_timestamp,
            last_run_duration,
        })
    }

    /// Record one completed run. Called exactly once per run; a run's
    /// metrics are never corrected afterwards.
    pub fn record(&self, result: &RunResult) {
        let seconds = result.duration.as_secs_f64();

        let code = result.classification.code_label();
        self.exits_total.with_label_values(&[code.as_str()]).inc();
        self.duration_seconds.observe(seconds);
        self.last_run_duration.set(seconds);
        self.last_run_timestamp.set(now_epoch_seconds());

        if result.classification.is_success() {
            self.last_success_timestamp.set(now_epoch_seconds());
        }
    }

    #[cfg(test)]
    pub(crate) fn exit_count(&self, code: &str) -> u64 {
        self.exits_total.with_label_values(&[code]).get()
    }
}

fn now_epoch_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

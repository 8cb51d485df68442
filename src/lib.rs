// src/lib.rs

pub mod cli;
pub mod errors;
pub mod exec;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod state;

use prometheus::Registry;

use crate::cli::CliArgs;
use crate::errors::Result;
use crate::exec::CommandSpec;
use crate::metrics::Metrics;
use crate::state::SharedState;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the command spec from CLI args
/// - shared state + metrics registry
/// - the background run loop
/// - the HTTP listener (runs until the process is terminated)
pub async fn run(args: CliArgs) -> Result<()> {
    let spec = command_spec(&args);

    let state = SharedState::new(spec.display());
    let registry = Registry::new();
    let metrics = Metrics::new(&registry)?;

    tokio::spawn(scheduler::run_loop(spec, state.clone(), metrics));

    http::serve(args.listen_addr, state, registry).await
}

/// Build the immutable command spec from parsed arguments.
///
/// `args.command` is non-empty by construction (clap requires it).
fn command_spec(args: &CliArgs) -> CommandSpec {
    let mut command = args.command.iter();
    let program = command.next().cloned().unwrap_or_default();

    CommandSpec {
        program,
        args: command.cloned().collect(),
        working_dir: args.working_dir.clone(),
        timeout: args.timeout,
        period: args.period,
    }
}

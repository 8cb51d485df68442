// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! NOTE: this expects `clap` to be built with the `derive` feature, e.g.:
//! `clap = { version = "4.5.53", features = ["derive"] }` in `Cargo.toml`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `prom-run`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "prom-run",
    version,
    about = "Periodically run a command and expose its status and Prometheus metrics.",
    long_about = None
)]
pub struct CliArgs {
    /// Period with which to run the command.
    #[arg(long, value_name = "DURATION", default_value = "10s", value_parser = parse_duration)]
    pub period: Duration,

    /// Amount of time to give the command to run.
    #[arg(long, value_name = "DURATION", default_value = "10m", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Address to listen on.
    #[arg(long, value_name = "ADDR", default_value = "0.0.0.0:9152")]
    pub listen_addr: SocketAddr,

    /// Working directory for the command. Defaults to our own.
    #[arg(long, value_name = "PATH")]
    pub working_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROMRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// The command to run, followed by its arguments.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Parse a simple duration string like `"10s"`, `"250ms"`, `"1m"`, `"2h"`.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("10d").is_err());
    }

    #[test]
    fn defaults_match_documented_values() {
        let args = CliArgs::parse_from(["prom-run", "date"]);
        assert_eq!(args.period, Duration::from_secs(10));
        assert_eq!(args.timeout, Duration::from_secs(600));
        assert_eq!(args.listen_addr.port(), 9152);
        assert!(args.working_dir.is_none());
        assert_eq!(args.command, vec!["date".to_string()]);
    }

    #[test]
    fn flags_after_command_belong_to_the_command() {
        let args =
            CliArgs::parse_from(["prom-run", "--period", "1s", "kubectl", "diff", "-f", "x"]);
        assert_eq!(args.period, Duration::from_secs(1));
        assert_eq!(args.command, vec!["kubectl", "diff", "-f", "x"]);
    }

    #[test]
    fn missing_command_is_a_usage_error() {
        let err = CliArgs::try_parse_from(["prom-run", "--period", "1s"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}

//! Command-line argument parsing.
//!
//! Usage:
//!   selscript [-v] [--logging <LEVEL>] [--debug] [--webdriver <URL>]
//!             [--set NAME=VALUE]... [--check | --dry-run] <SCRIPT>

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use crate::script::parse::parse_duration;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "selscript",
    version,
    disable_version_flag = true,
    about = "Run a browser automation script"
)]
pub struct CliArgs {
    /// Script file to run.
    pub script: PathBuf,

    /// Print version.
    #[arg(short = 'v', short_alias = 'V', long, action = ArgAction::Version)]
    pub version: Option<bool>,

    /// Log verbosity (overridden by `RUST_LOG`).  Defaults to `info`, or
    /// `debug` with `--debug`.
    #[arg(long, value_enum)]
    pub logging: Option<LogLevel>,

    /// Show the browser window; also logs at debug level unless `--logging`
    /// is given.
    #[arg(long)]
    pub debug: bool,

    /// WebDriver server to connect to.
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:4444")]
    pub webdriver: String,

    /// Set a script variable before the run (repeatable).
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Compile the script and report errors without running it.
    #[arg(long, conflicts_with = "dry_run")]
    pub check: bool,

    /// Run against an in-memory browser that only logs what it is asked to do.
    #[arg(long)]
    pub dry_run: bool,

    /// Default timeout for element lookups and waits.
    #[arg(long, value_name = "DURATION", value_parser = duration_arg, default_value = "10s")]
    pub timeout: Duration,

    /// How often waits re-check the browser.
    #[arg(long, value_name = "DURATION", value_parser = duration_arg, default_value = "250ms")]
    pub poll_interval: Duration,
}

/// `--logging` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The equivalent `tracing` filter directive.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn duration_arg(raw: &str) -> Result<Duration, String> {
    parse_duration(raw).map_err(|e| e.to_string())
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()`; exits with usage on error.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Parse a slice of argument strings, not including the program name
/// (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, clap::Error> {
    CliArgs::try_parse_from(std::iter::once("selscript".to_owned()).chain(argv.iter().cloned()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

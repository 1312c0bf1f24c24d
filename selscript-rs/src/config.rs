//! Run configuration assembled from the command line and environment.
//!
//! | Source              | Setting                                  |
//! |---------------------|------------------------------------------|
//! | `.env` / process env| `WEBDRIVER_URL`, script variables         |
//! | `--webdriver`       | WebDriver base URL                       |
//! | `--logging`         | log level (explicit value wins)          |
//! | `--debug`           | headful browser, debug logging           |
//! | `--set NAME=VALUE`  | context override (wins over environment) |
//! | `--check`/`--dry-run` | [`Mode`]                               |

use std::path::PathBuf;

use thiserror::Error;

use crate::cli::{CliArgs, LogLevel};
use crate::script::Settings;

// ── Public API ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("--set expects NAME=VALUE, got {0:?}")]
    InvalidAssignment(String),
    #[error("invalid variable name {0:?}")]
    InvalidName(String),
    #[error("webdriver URL must start with http:// or https://, got {0:?}")]
    InvalidUrl(String),
}

/// What to do with the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Compile and execute against the WebDriver server.
    #[default]
    Run,
    /// Compile only.
    Check,
    /// Execute against the in-memory recorder.
    DryRun,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub script: PathBuf,
    pub mode: Mode,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: &'static str,
    pub webdriver_url: String,
    pub overrides: Vec<(String, String)>,
    pub settings: Settings,
}

impl RunConfig {
    pub fn from_cli(args: CliArgs) -> Result<Self, ConfigError> {
        let overrides = args
            .set
            .iter()
            .map(|raw| parse_assignment(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let url = args.webdriver.trim().to_owned();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(url));
        }

        let mode = if args.check {
            Mode::Check
        } else if args.dry_run {
            Mode::DryRun
        } else {
            Mode::Run
        };
        let default_level = if args.debug { LogLevel::Debug } else { LogLevel::Info };
        let log_filter = args.logging.unwrap_or(default_level).as_filter();

        Ok(Self {
            script: args.script,
            mode,
            log_filter,
            webdriver_url: url,
            overrides,
            settings: Settings {
                headless: !args.debug,
                poll_interval: args.poll_interval,
                element_timeout: args.timeout,
            },
        })
    }
}

/// Split `NAME=VALUE`.  The value may be empty or contain further `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String), ConfigError> {
    let (name, value) =
        raw.split_once('=').ok_or_else(|| ConfigError::InvalidAssignment(raw.to_owned()))?;
    let name = name.trim();
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ConfigError::InvalidName(name.to_owned()));
    }
    Ok((name.to_owned(), value.to_owned()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

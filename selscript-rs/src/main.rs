use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use selscript::browser::{Browser, Recorder};
use selscript::cli;
use selscript::config::{Mode, RunConfig};
use selscript::context::Context;
use selscript::error::ScriptError;
use selscript::pacing::Interrupt;
use selscript::script::{Compiler, Executor, Registry, Settings, Token};
use selscript::webdriver::WebDriver;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // ── Environment ───────────────────────────────────────────────────────────
    // `.env` is optional; values already in the environment win.
    dotenvy::dotenv().ok();

    let args = cli::parse_args();
    let config = match RunConfig::from_cli(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("selscript: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(config.log_filter) {
        eprintln!("selscript: {e:#}");
        std::process::exit(1);
    }

    // ── Run ───────────────────────────────────────────────────────────────────
    let code = match execute(config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            1
        }
    };
    std::process::exit(code);
}

fn init_logging(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("invalid log filter")?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("cannot install log subscriber")?;
    Ok(())
}

/// Compile and (unless checking) run the script.  Returns the exit status.
/// Script failures are logged where they happen, so only setup problems
/// come back as `Err`.
async fn execute(config: RunConfig) -> Result<i32> {
    let registry = Arc::new(Registry::standard());
    let tokens = match Compiler::new(&registry).compile_file(&config.script) {
        Ok(tokens) => tokens,
        Err(e @ ScriptError::Compile(_)) => return Ok(e.exit_code()),
        Err(e) => return Err(e).context("cannot load script"),
    };

    if config.mode == Mode::Check {
        info!(tokens = tokens.len(), "{}: ok", config.script.display());
        return Ok(0);
    }

    let context = Context::for_run(config.overrides.clone());
    let settings = config.settings.clone();

    // One Ctrl-C listener for the whole run; yield so its handler is in
    // place before the first action.
    let interrupt = Interrupt::new();
    let _listener = interrupt.listen_for_ctrl_c();
    tokio::task::yield_now().await;

    let outcome = match config.mode {
        Mode::DryRun => {
            let (outcome, recorder) =
                run_with(Recorder::new(), registry, context, settings, interrupt, &tokens).await;
            for call in recorder.calls() {
                info!(target: "selscript::dry_run", "{call}");
            }
            outcome
        }
        _ => {
            let driver = WebDriver::new(config.webdriver_url.as_str())
                .context("cannot create WebDriver client")?;
            run_with(driver, registry, context, settings, interrupt, &tokens).await.0
        }
    };

    Ok(match outcome {
        Ok(()) => 0,
        Err(e) => e.exit_code(),
    })
}

async fn run_with<B: Browser>(
    browser: B,
    registry: Arc<Registry>,
    context: Context,
    settings: Settings,
    interrupt: Interrupt,
    tokens: &[Token],
) -> (Result<(), ScriptError>, B) {
    let mut executor = Executor::new(registry, context, browser)
        .with_settings(settings)
        .with_interrupt(interrupt);
    let outcome = executor.run(tokens).await;
    (outcome, executor.into_browser())
}

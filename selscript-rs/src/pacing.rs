//! Inter-action delay policy and interruptible sleeping.
//!
//! Ctrl-C is observed through one process-wide listener that raises an
//! [`Interrupt`].  Waits (`sleep` and pacing pauses) end early on an
//! interrupt and clear it; anywhere else it stays raised until the executor
//! stops the run.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::error::{Result, ScriptError};
use crate::script::parse::parse_duration_range;

/// How long to pause after each action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelayPolicy {
    #[default]
    Off,
    Fixed(Duration),
    /// Uniformly sampled from `[min, max)`.
    Range(Duration, Duration),
}

impl DelayPolicy {
    /// Parse `off`/`none`/`0`, a single duration, or `min-max`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if matches!(raw.to_ascii_lowercase().as_str(), "off" | "none" | "no" | "false" | "0") {
            return Ok(DelayPolicy::Off);
        }
        let (min, max) = parse_duration_range(raw)?;
        Ok(Self::between(min, max))
    }

    pub fn between(min: Duration, max: Duration) -> Self {
        if min == max {
            if min.is_zero() {
                DelayPolicy::Off
            } else {
                DelayPolicy::Fixed(min)
            }
        } else {
            DelayPolicy::Range(min, max)
        }
    }

    /// Pick the next pause length.
    pub fn sample(&self) -> Duration {
        match *self {
            DelayPolicy::Off => Duration::ZERO,
            DelayPolicy::Fixed(d) => d,
            DelayPolicy::Range(min, max) if min < max => rand::thread_rng().gen_range(min..max),
            DelayPolicy::Range(min, _) => min,
        }
    }
}

impl fmt::Display for DelayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayPolicy::Off => f.write_str("off"),
            DelayPolicy::Fixed(d) => write!(f, "{d:?}"),
            DelayPolicy::Range(min, max) => write!(f, "{min:?}-{max:?}"),
        }
    }
}

/// Applies the current [`DelayPolicy`] between actions.
#[derive(Debug, Clone, Default)]
pub struct Pacing {
    policy: DelayPolicy,
}

impl Pacing {
    pub fn new(policy: DelayPolicy) -> Self {
        Self { policy }
    }

    pub fn set_policy(&mut self, policy: DelayPolicy) {
        debug!(%policy, "delay policy changed");
        self.policy = policy;
    }

    /// Sleep for one sample of the policy.
    pub async fn pause(&self, interrupt: &Interrupt) {
        let d = self.policy.sample();
        if !d.is_zero() {
            sleep_interruptible(d, interrupt).await;
        }
    }
}

// ── Interrupts ────────────────────────────────────────────────────────────────

/// Shared Ctrl-C flag.  Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct Interrupt {
    flag: Arc<watch::Sender<bool>>,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupt {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self { flag: Arc::new(flag) }
    }

    pub fn raise(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_raised(&self) -> bool {
        *self.flag.borrow()
    }

    /// Clear the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.flag.send_replace(false)
    }

    /// A raised interrupt as the quiet exit that stops a run.
    pub fn check(&self) -> Result<()> {
        if self.is_raised() {
            Err(ScriptError::Exit(1))
        } else {
            Ok(())
        }
    }

    /// Resolves once the flag is raised (immediately if it already is).
    pub async fn raised(&self) {
        let mut rx = self.flag.subscribe();
        if rx.wait_for(|raised| *raised).await.is_err() {
            // The sender lives in `self`, so this is unreachable.
            std::future::pending::<()>().await;
        }
    }

    /// Raise this interrupt on every Ctrl-C for the rest of the process.
    ///
    /// The OS handler is installed when the task first runs, so callers on a
    /// current-thread runtime should yield once before doing real work.
    pub fn listen_for_ctrl_c(&self) -> JoinHandle<()> {
        let interrupt = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("cannot listen for Ctrl-C: {e}");
                    return;
                }
                warn!("interrupted");
                interrupt.raise();
            }
        })
    }
}

/// Sleep for `d`, ending early if `interrupt` is raised.  An interrupt that
/// ends the sleep is cleared.  Returns `false` if interrupted.
pub async fn sleep_interruptible(d: Duration, interrupt: &Interrupt) -> bool {
    let deadline = Instant::now() + d;
    tokio::select! {
        _ = sleep_until(deadline) => true,
        _ = interrupt.raised() => {
            interrupt.take();
            warn!("wait interrupted");
            false
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

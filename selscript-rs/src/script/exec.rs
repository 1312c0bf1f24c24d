//! Sequential token execution.
//!
//! Each token runs inside an `info`-level `line` span carrying its source
//! file and line number, so every record logged while it runs (including by
//! the browser backend) is attributed to that line.  A step is:
//!
//! 1. interpolate each argument against the [`Context`];
//! 2. bind the results to the action's parameters;
//! 3. run the handler;
//! 4. pause according to the current [`DelayPolicy`].
//!
//! The first failing step is logged and ends the run.  A Ctrl-C outside a
//! wait ends it too, as a quiet exit once the current step returns.
//! Whatever happens, an open browser session is closed exactly once before
//! [`Executor::run`] returns.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as Json;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, trace, warn, Instrument};

use super::bind::{bind, Bound};
use super::expand::expand;
use super::parse::parse_duration_range;
use super::registry::{ActionKind, Registry};
use super::token::Token;
use super::value::Value;
use crate::browser::{Browser, BrowserError, By, ElementRef, Locator};
use crate::context::Context;
use crate::error::{Result, ScriptError};
use crate::pacing::{sleep_interruptible, DelayPolicy, Interrupt, Pacing};

/// Run-time knobs that are not part of the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Ask the browser for a headless session unless the script says
    /// otherwise.
    pub headless: bool,
    /// How often condition waits re-check the browser.
    pub poll_interval: Duration,
    /// Default timeout for element lookups and `wait_till`.
    pub element_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            headless: true,
            poll_interval: Duration::from_millis(250),
            element_timeout: Duration::from_secs(10),
        }
    }
}

/// Runs compiled tokens against a browser backend.
pub struct Executor<B> {
    registry: Arc<Registry>,
    context: Context,
    browser: B,
    session_open: bool,
    active: Option<ElementRef>,
    pacing: Pacing,
    interrupt: Interrupt,
    settings: Settings,
}

impl<B: Browser> Executor<B> {
    pub fn new(registry: Arc<Registry>, context: Context, browser: B) -> Self {
        Self {
            registry,
            context,
            browser,
            session_open: false,
            active: None,
            pacing: Pacing::default(),
            interrupt: Interrupt::new(),
            settings: Settings::default(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Initial delay policy; scripts may change it with `delay`.
    pub fn with_delay(mut self, policy: DelayPolicy) -> Self {
        self.pacing = Pacing::new(policy);
        self
    }

    /// Share `interrupt` with whoever raises it (normally the Ctrl-C
    /// listener started in `main`).
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn into_browser(self) -> B {
        self.browser
    }

    /// Execute `tokens` in order, stopping at the first error.
    pub async fn run(&mut self, tokens: &[Token]) -> Result<()> {
        let outcome = self.run_tokens(tokens).await;
        self.release().await;
        outcome
    }

    async fn run_tokens(&mut self, tokens: &[Token]) -> Result<()> {
        for token in tokens {
            let span = tracing::info_span!("line", source = %token.source, line = token.line);
            self.stop_if_interrupted()?;
            self.run_token(token).instrument(span).await?;
        }
        Ok(())
    }

    async fn run_token(&mut self, token: &Token) -> Result<()> {
        let result = match self.step(token).await {
            Ok(()) => self.stop_if_interrupted(),
            Err(err) => Err(err),
        };
        match &result {
            Ok(()) => self.pacing.pause(&self.interrupt).await,
            Err(err) => {
                report(err);
                if err.is_domain() {
                    self.pacing.pause(&self.interrupt).await;
                }
            }
        }
        result
    }

    fn stop_if_interrupted(&self) -> Result<()> {
        let pending = self.interrupt.check();
        if pending.is_err() {
            warn!("stopping the run after an interrupt");
        }
        pending
    }

    /// Close the session if one is open.
    async fn release(&mut self) {
        if !self.session_open {
            return;
        }
        self.session_open = false;
        self.active = None;
        match self.browser.close().await {
            Ok(()) => debug!("browser session released"),
            Err(e) => warn!("closing browser session failed: {e}"),
        }
    }

    async fn step(&mut self, token: &Token) -> Result<()> {
        let registry = Arc::clone(&self.registry);
        let spec = registry.get(&token.action).ok_or_else(|| {
            ScriptError::Internal(format!("action {:?} is not registered", token.action))
        })?;
        let args = token
            .args
            .iter()
            .map(|raw| expand(raw, &self.context))
            .collect::<Result<Vec<_>>>()?;
        let bound = bind(spec, &args, &self.context)?;
        trace!(action = %spec.name, ?args, "dispatch");

        match spec.kind {
            ActionKind::Debug => debug!("{}", bound.joined_rest()),
            ActionKind::Info => info!("{}", bound.joined_rest()),
            ActionKind::Warning => warn!("{}", bound.joined_rest()),
            ActionKind::Error => error!("{}", bound.joined_rest()),
            ActionKind::Set => {
                let (name, value) = (bound.text("name")?, bound.text("value")?);
                debug!(%name, %value, "set");
                self.context.set(name, value);
            }
            ActionKind::Default => {
                let (name, value) = (bound.text("name")?, bound.text("value")?);
                if self.context.set_default(name.clone(), value) {
                    debug!(%name, "default applied");
                }
            }
            ActionKind::Delay => {
                let policy = DelayPolicy::parse(&bound.text("policy")?)?;
                self.pacing.set_policy(policy);
            }
            ActionKind::Sleep => {
                let (min, max) = parse_duration_range(&bound.text("duration")?)?;
                let d = DelayPolicy::between(min, max).sample();
                debug!(?d, "sleeping");
                sleep_interruptible(d, &self.interrupt).await;
            }
            ActionKind::Browser => self.open_browser(&bound).await?,
            ActionKind::Close => {
                self.require_session()?;
                self.session_open = false;
                self.active = None;
                self.browser.close().await?;
            }
            ActionKind::Visit => {
                self.require_session()?;
                let url = bound.text("url")?;
                info!(%url, "visit");
                self.browser.navigate(&url).await?;
                self.active = None;
            }
            ActionKind::Back => {
                self.require_session()?;
                self.browser.back().await?;
                self.active = None;
            }
            ActionKind::Forward => {
                self.require_session()?;
                self.browser.forward().await?;
                self.active = None;
            }
            ActionKind::Refresh => {
                self.require_session()?;
                self.browser.refresh().await?;
                self.active = None;
            }
            ActionKind::Select => {
                self.require_session()?;
                let locator = locator(&bound)?;
                let timeout = bound.duration("timeout").unwrap_or(self.settings.element_timeout);
                let element = self.poll_find(&locator, timeout).await?;
                debug!(%locator, "selected");
                self.active = Some(element);
            }
            ActionKind::Focused => {
                self.require_session()?;
                self.active = Some(self.browser.active_element().await?);
            }
            ActionKind::Click => {
                self.require_session()?;
                if bound.get("query").is_some() {
                    let locator = locator(&bound)?;
                    let element = self.poll_find(&locator, self.settings.element_timeout).await?;
                    self.active = Some(element);
                }
                let element = self.active_element()?;
                self.browser.click(&element).await?;
            }
            ActionKind::Write => {
                self.require_session()?;
                let element = self.active_element()?;
                self.browser.send_keys(&element, &bound.joined_rest()).await?;
            }
            ActionKind::Press => {
                self.require_session()?;
                let element = self.active_element()?;
                let text = key_text(&bound)?;
                self.browser.send_keys(&element, &text).await?;
            }
            ActionKind::WaitTill => {
                self.require_session()?;
                let condition = Condition::from_bound(&bound)?;
                let timeout = bound.duration("timeout").unwrap_or(self.settings.element_timeout);
                self.wait_for(&condition, timeout).await?;
                debug!(%condition, "condition met");
            }
            ActionKind::Script => {
                self.require_session()?;
                let result = self.browser.execute(&bound.joined_rest(), Vec::new()).await?;
                self.store_or_log(&bound, "script returned", json_to_text(&result));
            }
            ActionKind::Url => {
                self.require_session()?;
                let url = self.browser.current_url().await?;
                self.store_or_log(&bound, "current url", url);
            }
            ActionKind::Windows => {
                self.require_session()?;
                let handles = self.browser.window_handles().await?;
                info!("{} window(s): {}", handles.len(), handles.join(", "));
            }
            ActionKind::Timeouts => {
                self.require_session()?;
                let page_load = bound.duration("page_load");
                let implicit = bound.duration("implicit");
                self.browser.set_timeouts(page_load, implicit).await?;
            }
        }
        Ok(())
    }

    // ── Handler helpers ───────────────────────────────────────────────────────

    fn require_session(&self) -> Result<()> {
        if self.session_open {
            Ok(())
        } else {
            Err(ScriptError::NoSession)
        }
    }

    fn active_element(&self) -> Result<ElementRef> {
        self.active.clone().ok_or(ScriptError::NoElement)
    }

    async fn open_browser(&mut self, bound: &Bound) -> Result<()> {
        let name = bound.text("name")?;
        let options = render_options(bound.extra(), self.settings.headless);
        if self.session_open {
            debug!("replacing open browser session");
            self.session_open = false;
            self.active = None;
            self.browser.close().await?;
        }
        info!(browser = %name, ?options, "opening browser");
        self.browser.open(&name, &options).await?;
        self.session_open = true;
        Ok(())
    }

    fn store_or_log(&mut self, bound: &Bound, label: &str, text: String) {
        match bound.text_opt("into") {
            Some(var) => {
                debug!(%var, "{label}: {text}");
                self.context.set(var, text);
            }
            None => info!("{label}: {text}"),
        }
    }

    /// Look `locator` up until it exists or `timeout` elapses.
    async fn poll_find(&mut self, locator: &Locator, timeout: Duration) -> Result<ElementRef> {
        let deadline = Instant::now() + timeout;
        loop {
            self.stop_if_interrupted()?;
            match self.browser.find(locator).await {
                Ok(element) => return Ok(element),
                Err(BrowserError::NoSuchElement(_)) if Instant::now() < deadline => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    sleep(self.settings.poll_interval.min(left)).await;
                }
                Err(BrowserError::NoSuchElement(_)) if !timeout.is_zero() => {
                    return Err(ScriptError::Timeout {
                        what: format!("element {locator}"),
                        after: timeout,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn wait_for(&mut self, condition: &Condition, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            self.stop_if_interrupted()?;
            if self.holds(condition).await? {
                return Ok(());
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(ScriptError::Timeout { what: condition.to_string(), after: timeout });
            }
            sleep(self.settings.poll_interval.min(left)).await;
        }
    }

    async fn holds(&mut self, condition: &Condition) -> Result<bool> {
        Ok(match condition {
            Condition::Present(locator) => !self.browser.find_all(locator).await?.is_empty(),
            Condition::Absent(locator) => self.browser.find_all(locator).await?.is_empty(),
            Condition::UrlIs(url) => self.browser.current_url().await? == *url,
            Condition::UrlContains(part) => self.browser.current_url().await?.contains(part),
        })
    }
}

/// Log a failed step.  Domain errors get a one-line message; internal
/// errors their full debug form.  The quiet exit is not logged.
fn report(err: &ScriptError) {
    match err {
        ScriptError::Exit(_) => {}
        e if e.is_domain() => error!(kind = e.kind(), "{e}"),
        e => error!(kind = e.kind(), "{e:?}"),
    }
}

fn locator(bound: &Bound) -> Result<Locator> {
    let query = bound.text("query")?;
    by_strategy(bound).map(|by| Locator::new(by, query))
}

fn by_strategy(bound: &Bound) -> Result<By> {
    match bound.text_opt("by") {
        None => Ok(By::Css),
        Some(raw) => By::parse(&raw)
            .ok_or_else(|| ScriptError::value(raw, "locator strategy (css, name, xpath, link, partial-link)")),
    }
}

fn key_text(bound: &Bound) -> Result<String> {
    bound
        .rest()
        .iter()
        .map(|v| {
            v.as_key()
                .map(|k| k.code())
                .ok_or_else(|| ScriptError::Internal(format!("{v:?} is not a key")))
        })
        .collect()
}

/// Browser options as command-line flags.  `true` becomes `--name`, `false`
/// drops the flag and anything else is `--name=value`.
fn render_options(extra: &BTreeMap<String, Value>, headless: bool) -> Vec<String> {
    let mut options: Vec<String> = extra
        .iter()
        .filter_map(|(name, value)| match value {
            Value::Bool(true) => Some(format!("--{name}")),
            Value::Bool(false) => None,
            other => Some(format!("--{name}={other}")),
        })
        .collect();
    if headless && !extra.contains_key("headless") {
        options.push("--headless".to_owned());
    }
    options
}

fn json_to_text(value: &Json) -> String {
    match value {
        Json::Null => String::new(),
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Conditions ────────────────────────────────────────────────────────────────

/// Predicate polled by `wait_till`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Present(Locator),
    Absent(Locator),
    UrlIs(String),
    UrlContains(String),
}

impl Condition {
    fn from_bound(bound: &Bound) -> Result<Self> {
        let name = bound.text("condition")?.to_ascii_lowercase().replace('_', "-");
        let arg = bound.joined_rest();
        if arg.is_empty() {
            return Err(ScriptError::binding("wait_till", format!("{name} needs an argument")));
        }
        let by = by_strategy(bound)?;
        Ok(match name.as_str() {
            "present" => Condition::Present(Locator::new(by, arg)),
            "absent" => Condition::Absent(Locator::new(by, arg)),
            "url-is" => Condition::UrlIs(arg),
            "url-contains" => Condition::UrlContains(arg),
            _ => {
                return Err(ScriptError::binding(
                    "wait_till",
                    format!("unknown condition {name:?} (present, absent, url-is, url-contains)"),
                ));
            }
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Present(l) => write!(f, "{l} to be present"),
            Condition::Absent(l) => write!(f, "{l} to be absent"),
            Condition::UrlIs(u) => write!(f, "url to be {u}"),
            Condition::UrlContains(u) => write!(f, "url to contain {u}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

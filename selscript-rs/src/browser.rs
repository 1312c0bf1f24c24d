//! Browser capability interface.
//!
//! The executor never talks to a browser directly; it drives any type that
//! implements [`Browser`].  Two implementations ship with the crate:
//!
//! | Type                                   | Backend                           |
//! |----------------------------------------|-----------------------------------|
//! | [`WebDriver`](crate::webdriver::WebDriver) | W3C WebDriver over HTTP       |
//! | [`Recorder`]                           | In memory; records every call     |

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as Json;
use thiserror::Error;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("no such element: {0}")]
    NoSuchElement(String),
    #[error("stale element reference")]
    StaleElement,
    #[error("webdriver error {error}: {message}")]
    Protocol { error: String, message: String },
    #[error("webdriver transport: {0}")]
    Transport(String),
    #[error("no browser session")]
    NotConnected,
    #[error("{0} is not supported by this backend")]
    Unsupported(String),
}

// ── Locators ──────────────────────────────────────────────────────────────────

/// Opaque handle to an element, valid for the session that returned it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

/// Element location strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum By {
    #[default]
    Css,
    Name,
    XPath,
    LinkText,
    PartialLinkText,
}

impl By {
    /// Accepts `css`, `name`, `xpath`, `link`/`link-text` and
    /// `partial-link`/`partial-link-text`, case-insensitively.
    pub fn parse(raw: &str) -> Option<By> {
        match raw.to_ascii_lowercase().replace('_', "-").as_str() {
            "css" | "css-selector" => Some(By::Css),
            "name" => Some(By::Name),
            "xpath" => Some(By::XPath),
            "link" | "link-text" => Some(By::LinkText),
            "partial-link" | "partial-link-text" => Some(By::PartialLinkText),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            By::Css => "css",
            By::Name => "name",
            By::XPath => "xpath",
            By::LinkText => "link",
            By::PartialLinkText => "partial-link",
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub by: By,
    pub value: String,
}

impl Locator {
    pub fn new(by: By, value: impl Into<String>) -> Self {
        Self { by, value: value.into() }
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(By::Css, value)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.by, self.value)
    }
}

// ── Capability trait ──────────────────────────────────────────────────────────

/// Everything the executor needs from a browser backend.
///
/// `open` receives the browser name (`firefox`, `chrome`, …) and its options
/// rendered as command-line style flags (`--headless`, `--width=800`).
#[async_trait]
pub trait Browser: Send {
    async fn open(&mut self, browser: &str, options: &[String]) -> Result<(), BrowserError>;
    async fn close(&mut self) -> Result<(), BrowserError>;

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;
    async fn back(&mut self) -> Result<(), BrowserError>;
    async fn forward(&mut self) -> Result<(), BrowserError>;
    async fn refresh(&mut self) -> Result<(), BrowserError>;
    async fn current_url(&mut self) -> Result<String, BrowserError>;
    async fn window_handles(&mut self) -> Result<Vec<String>, BrowserError>;

    async fn find(&mut self, locator: &Locator) -> Result<ElementRef, BrowserError>;
    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, BrowserError>;
    async fn active_element(&mut self) -> Result<ElementRef, BrowserError>;
    async fn click(&mut self, element: &ElementRef) -> Result<(), BrowserError>;
    async fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<(), BrowserError>;

    async fn execute(&mut self, script: &str, args: Vec<Json>) -> Result<Json, BrowserError>;
    async fn set_timeouts(
        &mut self,
        page_load: Option<Duration>,
        implicit: Option<Duration>,
    ) -> Result<(), BrowserError>;
}

// ── Recorder ──────────────────────────────────────────────────────────────────

/// In-memory browser that records each call as a line of text.
///
/// By default every lookup succeeds.  [`Recorder::with_elements`] switches to
/// strict mode where only the listed locator values exist.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Vec<String>,
    open: bool,
    close_count: usize,
    history: Vec<String>,
    position: usize,
    elements: Option<HashSet<String>>,
    script_results: HashMap<String, Json>,
    focused: Option<ElementRef>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict mode: only these locator values can be found.
    pub fn with_elements<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            elements: Some(elements.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Make `execute(script)` return `result`.
    pub fn with_script_result(mut self, script: impl Into<String>, result: Json) -> Self {
        self.script_results.insert(script.into(), result);
        self
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close_count(&self) -> usize {
        self.close_count
    }

    fn record(&mut self, call: impl Into<String>) {
        self.calls.push(call.into());
    }

    fn exists(&self, locator: &Locator) -> bool {
        self.elements.as_ref().map_or(true, |set| set.contains(&locator.value))
    }
}

#[async_trait]
impl Browser for Recorder {
    async fn open(&mut self, browser: &str, options: &[String]) -> Result<(), BrowserError> {
        let mut call = format!("open {browser}");
        for opt in options {
            call.push(' ');
            call.push_str(opt);
        }
        self.record(call);
        self.open = true;
        self.history.clear();
        self.position = 0;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.record("close");
        self.open = false;
        self.close_count += 1;
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.record(format!("navigate {url}"));
        if !self.history.is_empty() {
            self.history.truncate(self.position + 1);
        }
        self.history.push(url.to_owned());
        self.position = self.history.len() - 1;
        Ok(())
    }

    async fn back(&mut self) -> Result<(), BrowserError> {
        self.record("back");
        self.position = self.position.saturating_sub(1);
        Ok(())
    }

    async fn forward(&mut self) -> Result<(), BrowserError> {
        self.record("forward");
        if self.position + 1 < self.history.len() {
            self.position += 1;
        }
        Ok(())
    }

    async fn refresh(&mut self) -> Result<(), BrowserError> {
        self.record("refresh");
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        Ok(self
            .history
            .get(self.position)
            .cloned()
            .unwrap_or_else(|| "about:blank".to_owned()))
    }

    async fn window_handles(&mut self) -> Result<Vec<String>, BrowserError> {
        Ok(vec!["window-1".to_owned()])
    }

    async fn find(&mut self, locator: &Locator) -> Result<ElementRef, BrowserError> {
        self.record(format!("find {locator}"));
        if self.exists(locator) {
            Ok(ElementRef(locator.value.clone()))
        } else {
            Err(BrowserError::NoSuchElement(locator.to_string()))
        }
    }

    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, BrowserError> {
        self.record(format!("find_all {locator}"));
        Ok(if self.exists(locator) { vec![ElementRef(locator.value.clone())] } else { vec![] })
    }

    async fn active_element(&mut self) -> Result<ElementRef, BrowserError> {
        Ok(self.focused.clone().unwrap_or_else(|| ElementRef("body".to_owned())))
    }

    async fn click(&mut self, element: &ElementRef) -> Result<(), BrowserError> {
        self.record(format!("click {}", element.0));
        self.focused = Some(element.clone());
        Ok(())
    }

    async fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<(), BrowserError> {
        self.record(format!("send_keys {} {text}", element.0));
        Ok(())
    }

    async fn execute(&mut self, script: &str, _args: Vec<Json>) -> Result<Json, BrowserError> {
        self.record(format!("execute {script}"));
        Ok(self.script_results.get(script).cloned().unwrap_or(Json::Null))
    }

    async fn set_timeouts(
        &mut self,
        page_load: Option<Duration>,
        implicit: Option<Duration>,
    ) -> Result<(), BrowserError> {
        self.record(format!("timeouts page_load={page_load:?} implicit={implicit:?}"));
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

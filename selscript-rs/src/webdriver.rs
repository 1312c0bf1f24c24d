//! W3C WebDriver backend.
//!
//! Talks HTTP+JSON to a driver (geckodriver, chromedriver, a Selenium
//! server, …) at a base URL such as `http://localhost:4444`.  One session at
//! a time.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Map, Value as Json};
use tracing::{debug, trace};

use crate::browser::{Browser, BrowserError, By, ElementRef, Locator};

/// Key under which the protocol wraps element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecc";

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

pub struct WebDriver {
    http: Client,
    base: String,
    session: Option<String>,
}

impl WebDriver {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BrowserError> {
        let http = Client::builder().timeout(HTTP_TIMEOUT).build().map_err(transport)?;
        let base = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, base, session: None })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn session_url(&self, path: &str) -> Result<String, BrowserError> {
        let id = self.session.as_deref().ok_or(BrowserError::NotConnected)?;
        Ok(if path.is_empty() {
            format!("{}/session/{id}", self.base)
        } else {
            format!("{}/session/{id}/{path}", self.base)
        })
    }

    async fn request(&self, method: Method, url: String, body: Option<Json>) -> Result<Json, BrowserError> {
        trace!(%method, %url, "webdriver request");
        let mut req = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            req = req.json(&body);
        } else if method == Method::POST {
            req = req.json(&json!({}));
        }
        let resp = req.send().await.map_err(transport)?;
        let status = resp.status();
        let mut payload: Json = resp.json().await.map_err(transport)?;
        let value = payload.get_mut("value").map(Json::take).unwrap_or(Json::Null);
        if status.is_success() {
            Ok(value)
        } else {
            Err(wire_error(value))
        }
    }

    async fn get(&self, path: &str) -> Result<Json, BrowserError> {
        let url = self.session_url(path)?;
        self.request(Method::GET, url, None).await
    }

    async fn post(&self, path: &str, body: Json) -> Result<Json, BrowserError> {
        let url = self.session_url(path)?;
        self.request(Method::POST, url, Some(body)).await
    }
}

fn transport(e: reqwest::Error) -> BrowserError {
    BrowserError::Transport(e.to_string())
}

/// Map a protocol error object to a [`BrowserError`].
fn wire_error(value: Json) -> BrowserError {
    let Ok(WireError { error, message }) = serde_json::from_value(value) else {
        return BrowserError::Protocol {
            error: "unknown error".into(),
            message: "malformed error response".into(),
        };
    };
    match error.as_str() {
        "no such element" => BrowserError::NoSuchElement(message),
        "stale element reference" => BrowserError::StaleElement,
        "invalid session id" => BrowserError::NotConnected,
        _ => BrowserError::Protocol { error, message },
    }
}

fn element_ref(value: &Json) -> Result<ElementRef, BrowserError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Json::as_str)
        .map(|id| ElementRef(id.to_owned()))
        .ok_or_else(|| BrowserError::Protocol {
            error: "invalid response".into(),
            message: format!("expected an element reference, got {value}"),
        })
}

/// Strategy and value for the `element` endpoints.
fn locator_body(locator: &Locator) -> Json {
    let (using, value) = match locator.by {
        By::Css => ("css selector", locator.value.clone()),
        By::Name => ("css selector", format!("[name=\"{}\"]", locator.value.replace('"', "\\\""))),
        By::XPath => ("xpath", locator.value.clone()),
        By::LinkText => ("link text", locator.value.clone()),
        By::PartialLinkText => ("partial link text", locator.value.clone()),
    };
    json!({ "using": using, "value": value })
}

/// New-session payload for `browser` with command-line style `options`.
pub fn capabilities(browser: &str, options: &[String]) -> Result<Json, BrowserError> {
    let (name, vendor) = match browser.to_ascii_lowercase().as_str() {
        "firefox" | "ff" => ("firefox", Some("moz:firefoxOptions")),
        "chrome" | "chromium" => ("chrome", Some("goog:chromeOptions")),
        "edge" | "msedge" => ("MicrosoftEdge", Some("ms:edgeOptions")),
        "safari" => ("safari", None),
        other => return Err(BrowserError::Unsupported(format!("browser {other:?}"))),
    };
    let mut always = Map::new();
    always.insert("browserName".into(), json!(name));
    if let Some(vendor) = vendor {
        always.insert(vendor.into(), json!({ "args": options }));
    }
    Ok(json!({ "capabilities": { "alwaysMatch": always } }))
}

#[async_trait]
impl Browser for WebDriver {
    async fn open(&mut self, browser: &str, options: &[String]) -> Result<(), BrowserError> {
        let body = capabilities(browser, options)?;
        let url = format!("{}/session", self.base);
        let value = self.request(Method::POST, url, Some(body)).await?;
        let NewSession { session_id } = serde_json::from_value(value).map_err(|e| {
            BrowserError::Protocol { error: "invalid response".into(), message: e.to_string() }
        })?;
        debug!(session = %session_id, browser, "session opened");
        self.session = Some(session_id);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let url = self.session_url("")?;
        self.session = None;
        self.request(Method::DELETE, url, None).await?;
        debug!("session closed");
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.post("url", json!({ "url": url })).await.map(drop)
    }

    async fn back(&mut self) -> Result<(), BrowserError> {
        self.post("back", json!({})).await.map(drop)
    }

    async fn forward(&mut self) -> Result<(), BrowserError> {
        self.post("forward", json!({})).await.map(drop)
    }

    async fn refresh(&mut self) -> Result<(), BrowserError> {
        self.post("refresh", json!({})).await.map(drop)
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        let value = self.get("url").await?;
        Ok(value.as_str().unwrap_or_default().to_owned())
    }

    async fn window_handles(&mut self) -> Result<Vec<String>, BrowserError> {
        let value = self.get("window/handles").await?;
        Ok(value
            .as_array()
            .map(|handles| handles.iter().filter_map(Json::as_str).map(str::to_owned).collect())
            .unwrap_or_default())
    }

    async fn find(&mut self, locator: &Locator) -> Result<ElementRef, BrowserError> {
        let value = self.post("element", locator_body(locator)).await?;
        element_ref(&value)
    }

    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, BrowserError> {
        let value = self.post("elements", locator_body(locator)).await?;
        value
            .as_array()
            .map(|items| items.iter().map(element_ref).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn active_element(&mut self) -> Result<ElementRef, BrowserError> {
        let value = self.get("element/active").await?;
        element_ref(&value)
    }

    async fn click(&mut self, element: &ElementRef) -> Result<(), BrowserError> {
        self.post(&format!("element/{}/click", element.0), json!({})).await.map(drop)
    }

    async fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<(), BrowserError> {
        self.post(&format!("element/{}/value", element.0), json!({ "text": text }))
            .await
            .map(drop)
    }

    async fn execute(&mut self, script: &str, args: Vec<Json>) -> Result<Json, BrowserError> {
        self.post("execute/sync", json!({ "script": script, "args": args })).await
    }

    async fn set_timeouts(
        &mut self,
        page_load: Option<Duration>,
        implicit: Option<Duration>,
    ) -> Result<(), BrowserError> {
        let mut body = Map::new();
        if let Some(d) = page_load {
            body.insert("pageLoad".into(), json!(d.as_millis() as u64));
        }
        if let Some(d) = implicit {
            body.insert("implicit".into(), json!(d.as_millis() as u64));
        }
        if body.is_empty() {
            return Ok(());
        }
        self.post("timeouts", Json::Object(body)).await.map(drop)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firefox_capabilities_carry_args() {
        let caps = capabilities("Firefox", &["--headless".into()]).unwrap();
        let always = &caps["capabilities"]["alwaysMatch"];
        assert_eq!(always["browserName"], "firefox");
        assert_eq!(always["moz:firefoxOptions"]["args"][0], "--headless");
    }

    #[test]
    fn chrome_and_safari_capabilities() {
        let caps = capabilities("chrome", &[]).unwrap();
        assert!(caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"].is_object());
        let caps = capabilities("safari", &[]).unwrap();
        assert_eq!(caps["capabilities"]["alwaysMatch"].as_object().unwrap().len(), 1);
    }

    #[test]
    fn unknown_browser_is_unsupported() {
        assert!(matches!(capabilities("netscape", &[]), Err(BrowserError::Unsupported(_))));
    }

    #[test]
    fn wire_errors_map_to_variants() {
        let e = wire_error(json!({ "error": "no such element", "message": "#x" }));
        assert!(matches!(e, BrowserError::NoSuchElement(m) if m == "#x"));
        let e = wire_error(json!({ "error": "stale element reference", "message": "" }));
        assert!(matches!(e, BrowserError::StaleElement));
        let e = wire_error(json!({ "error": "javascript error", "message": "boom" }));
        assert!(matches!(e, BrowserError::Protocol { error, .. } if error == "javascript error"));
        assert!(matches!(wire_error(json!("garbage")), BrowserError::Protocol { .. }));
    }

    #[test]
    fn locator_strategies() {
        assert_eq!(locator_body(&Locator::css("#q"))["using"], "css selector");
        let by_name = locator_body(&Locator::new(By::Name, "q"));
        assert_eq!(by_name["value"], "[name=\"q\"]");
        assert_eq!(locator_body(&Locator::new(By::PartialLinkText, "Next"))["using"], "partial link text");
    }

    #[test]
    fn element_refs_unwrap_the_protocol_key() {
        let el = element_ref(&json!({ ELEMENT_KEY: "abc" })).unwrap();
        assert_eq!(el, ElementRef("abc".into()));
        assert!(element_ref(&json!({})).is_err());
    }

    #[tokio::test]
    async fn commands_without_session_fail() {
        let mut wd = WebDriver::new("http://127.0.0.1:1/").unwrap();
        assert_eq!(wd.base_url(), "http://127.0.0.1:1");
        assert!(matches!(wd.navigate("x").await, Err(BrowserError::NotConnected)));
    }
}

/// End-to-end tests: compile script trees from disk and run them against the
/// in-memory recorder.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use selscript::browser::{Browser, BrowserError, ElementRef, Locator, Recorder};
use selscript::context::Context;
use selscript::error::{CompileErrorKind, ScriptError};
use selscript::pacing::{DelayPolicy, Interrupt};
use selscript::script::{Compiler, Executor, Registry, Settings, Token};
use serde_json::Value as Json;
use tokio::time::Instant;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn compile_file(path: &Path) -> Result<Vec<Token>, ScriptError> {
    Compiler::new(&Registry::standard()).compile_file(path)
}

fn compile(text: &str) -> Vec<Token> {
    Compiler::new(&Registry::standard())
        .compile_str("inline.ss", text, Path::new("."))
        .unwrap()
}

fn executor(recorder: Recorder) -> Executor<Recorder> {
    Executor::new(Arc::new(Registry::standard()), Context::with_constants(), recorder)
        .with_settings(Settings { headless: false, ..Settings::default() })
}

async fn run(text: &str) -> (Result<(), ScriptError>, Executor<Recorder>) {
    let mut exec = executor(Recorder::new());
    let outcome = exec.run(&compile(text)).await;
    (outcome, exec)
}

/// Recorder that notes when each call arrives.  With `sigint_on_navigate`
/// set, `navigate` sends SIGINT to this process and waits until the Ctrl-C
/// listener has raised the interrupt.
#[derive(Default)]
struct Stamped {
    inner: Recorder,
    stamps: Vec<(String, Instant)>,
    sigint_on_navigate: Option<Interrupt>,
}

impl Stamped {
    fn stamp(&mut self, call: &str) {
        self.stamps.push((call.to_owned(), Instant::now()));
    }

    fn at(&self, call: &str) -> Instant {
        self.stamps.iter().find(|(c, _)| c == call).map(|(_, t)| *t).unwrap()
    }
}

#[async_trait]
impl Browser for Stamped {
    async fn open(&mut self, browser: &str, options: &[String]) -> Result<(), BrowserError> {
        self.stamp("open");
        self.inner.open(browser, options).await
    }
    async fn close(&mut self) -> Result<(), BrowserError> {
        self.stamp("close");
        self.inner.close().await
    }
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.stamp("navigate");
        if let Some(interrupt) = &self.sigint_on_navigate {
            #[cfg(unix)]
            {
                let status = std::process::Command::new("kill")
                    .args(["-INT", &std::process::id().to_string()])
                    .status()
                    .unwrap();
                assert!(status.success());
            }
            tokio::time::timeout(Duration::from_secs(10), interrupt.raised()).await.unwrap();
        }
        self.inner.navigate(url).await
    }
    async fn back(&mut self) -> Result<(), BrowserError> {
        self.inner.back().await
    }
    async fn forward(&mut self) -> Result<(), BrowserError> {
        self.inner.forward().await
    }
    async fn refresh(&mut self) -> Result<(), BrowserError> {
        self.inner.refresh().await
    }
    async fn current_url(&mut self) -> Result<String, BrowserError> {
        self.inner.current_url().await
    }
    async fn window_handles(&mut self) -> Result<Vec<String>, BrowserError> {
        self.inner.window_handles().await
    }
    async fn find(&mut self, locator: &Locator) -> Result<ElementRef, BrowserError> {
        self.stamp("find");
        self.inner.find(locator).await
    }
    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, BrowserError> {
        self.inner.find_all(locator).await
    }
    async fn active_element(&mut self) -> Result<ElementRef, BrowserError> {
        self.inner.active_element().await
    }
    async fn click(&mut self, element: &ElementRef) -> Result<(), BrowserError> {
        self.inner.click(element).await
    }
    async fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<(), BrowserError> {
        self.inner.send_keys(element, text).await
    }
    async fn execute(&mut self, script: &str, args: Vec<Json>) -> Result<Json, BrowserError> {
        self.inner.execute(script, args).await
    }
    async fn set_timeouts(
        &mut self,
        page_load: Option<Duration>,
        implicit: Option<Duration>,
    ) -> Result<(), BrowserError> {
        self.inner.set_timeouts(page_load, implicit).await
    }
}

fn stamped_executor(browser: Stamped) -> Executor<Stamped> {
    Executor::new(Arc::new(Registry::standard()), Context::with_constants(), browser)
        .with_settings(Settings { headless: false, ..Settings::default() })
}

// ── Compilation ───────────────────────────────────────────────────────────────

#[test]
fn nested_includes_keep_order_and_origin() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("steps/shared")).unwrap();
    fs::write(dir.path().join("steps/login.ss"), "visit $BASE/login\n@include shared/submit.ss\n")
        .unwrap();
    fs::write(dir.path().join("steps/shared/submit.ss"), "\n\npress @RETURN\n").unwrap();
    let main = dir.path().join("main.ss");
    fs::write(&main, "browser firefox\n@include steps/login.ss\nclose\n").unwrap();

    let tokens = compile_file(&main).unwrap();
    let actions: Vec<&str> = tokens.iter().map(|t| t.action.as_str()).collect();
    assert_eq!(actions, vec!["browser", "visit", "press", "close"]);

    let press = &tokens[2];
    assert!(press.source.ends_with("submit.ss"));
    assert_eq!(press.line, 3);
    assert_eq!(tokens[3].line, 3);
    assert!(tokens[3].source.ends_with("main.ss"));
}

#[test]
fn include_accepts_several_paths() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.ss"), "info a").unwrap();
    fs::write(dir.path().join("b.ss"), "info b").unwrap();
    let main = dir.path().join("main.ss");
    fs::write(&main, "@include a.ss b.ss").unwrap();
    let tokens = compile_file(&main).unwrap();
    assert_eq!(tokens.iter().map(|t| t.args[0].as_str()).collect::<Vec<_>>(), ["a", "b"]);
}

#[test]
fn compile_reports_every_problem_across_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lib.ss"), "info fine\nclikc '#x'\n").unwrap();
    let main = dir.path().join("main.ss");
    fs::write(&main, "VIIST x\n@include lib.ss\n@include missing.ss\nvisit a b\n").unwrap();

    let Err(ScriptError::Compile(errors)) = compile_file(&main) else {
        panic!("expected compile errors");
    };
    assert_eq!(errors.len(), 4);
    let kinds: Vec<&CompileErrorKind> = errors.iter().map(|e| &e.kind).collect();
    assert!(matches!(kinds[0], CompileErrorKind::UnknownAction(a) if a == "VIIST"));
    assert!(matches!(kinds[1], CompileErrorKind::UnknownAction(a) if a == "clikc"));
    assert!(matches!(kinds[2], CompileErrorKind::MissingInclude { .. }));
    assert!(matches!(kinds[3], CompileErrorKind::TooManyArguments { given: 2, .. }));
    assert!(errors.iter().nth(1).unwrap().source.ends_with("lib.ss"));
}

#[test]
fn self_include_is_a_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("loop.ss");
    fs::write(&main, "info once\n@include loop.ss\n").unwrap();
    let Err(ScriptError::Compile(errors)) = compile_file(&main) else {
        panic!("expected compile errors");
    };
    assert!(matches!(errors.iter().next().unwrap().kind, CompileErrorKind::RecursiveInclude(_)));
}

#[test]
fn arity_failure_yields_no_tokens() {
    let result = Compiler::new(&Registry::standard()).compile_str(
        "bad.ss",
        "browser firefox\nvisit a b c\n",
        Path::new("."),
    );
    let Err(ScriptError::Compile(errors)) = result else {
        panic!("expected compile errors");
    };
    assert_eq!(errors.iter().next().unwrap().line, 2);
}

// ── Execution ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn variables_set_default_and_interpolate() {
    let (outcome, exec) = run(
        "set HOST example.org\n\
         default HOST ignored.org\n\
         default SCHEME https\n\
         browser firefox\n\
         visit ${SCHEME}://$HOST/a\n",
    )
    .await;
    outcome.unwrap();
    assert_eq!(exec.context().get("HOST").unwrap().to_string(), "example.org");
    assert!(exec.browser().calls().contains(&"navigate https://example.org/a".to_owned()));
}

#[tokio::test]
async fn set_is_visible_to_later_lines_only() {
    let (outcome, _) = run("info $LATER\nset LATER x").await;
    assert!(matches!(outcome, Err(ScriptError::MissingVariable(name)) if name == "LATER"));
}

#[test]
fn overrides_beat_environment() {
    let ctx = Context::for_run([("PATH", "overridden")]);
    assert_eq!(ctx.get("PATH").unwrap().to_string(), "overridden");
}

#[tokio::test]
async fn session_closed_once_after_failure() {
    let mut exec = executor(Recorder::with_elements(["#present"]));
    let outcome = exec
        .run(&compile("browser firefox\nselect '#absent' --timeout 0s\ninfo never"))
        .await;
    assert!(matches!(outcome, Err(ScriptError::Browser(_))));
    let recorder = exec.into_browser();
    assert_eq!(recorder.close_count(), 1);
    assert!(!recorder.is_open());
    assert_eq!(recorder.calls().last().unwrap(), "close");
}

#[tokio::test]
async fn session_closed_once_after_success() {
    let (outcome, exec) = run("browser chrome\nvisit a\n").await;
    outcome.unwrap();
    assert_eq!(exec.browser().close_count(), 1);
}

#[tokio::test]
async fn binding_errors_abort_the_run() {
    let (outcome, exec) = run("browser firefox\nselect '#q' --frobnicate 1\nvisit never").await;
    assert!(matches!(outcome, Err(ScriptError::Binding { .. })));
    assert!(!exec.browser().calls().iter().any(|c| c.contains("never")));
}

#[tokio::test]
async fn bad_duration_is_a_value_error() {
    let (outcome, _) = run("sleep soon").await;
    assert!(matches!(outcome, Err(ScriptError::Value { .. })));
}

#[tokio::test]
async fn navigation_and_windows() {
    let (outcome, exec) = run(
        "browser ff\nvisit one\nvisit two\nback\nurl --into HERE\nforward\nrefresh\nwindows\n\
         timeouts --page-load 30s --implicit 0s",
    )
    .await;
    outcome.unwrap();
    assert_eq!(exec.context().get("HERE").unwrap().to_string(), "one");
    let calls = exec.browser().calls();
    assert!(calls.contains(&"refresh".to_owned()));
    assert!(calls
        .iter()
        .any(|c| c.starts_with("timeouts page_load=Some(30s)") && c.contains("implicit=Some(0ns)")));
}

#[tokio::test]
async fn click_selects_then_clicks() {
    let (outcome, exec) = run("browser ff\nclick 'Sign in' --by link\nfocused\nwrite x").await;
    outcome.unwrap();
    let calls = exec.browser().calls();
    assert!(calls.contains(&"find link=Sign in".to_owned()));
    assert!(calls.contains(&"click Sign in".to_owned()));
    assert!(calls.contains(&"send_keys Sign in x".to_owned()));
}

// ── Pacing ────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn delay_applies_after_each_action() {
    let start = Instant::now();
    let (outcome, _) = run("delay 200ms\ninfo one\ninfo two").await;
    outcome.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn delay_also_follows_a_failing_action() {
    let mut exec = executor(Recorder::new()).with_delay(DelayPolicy::Fixed(Duration::from_millis(200)));
    let start = Instant::now();
    let outcome = exec.run(&compile("info $MISSING")).await;
    assert!(outcome.is_err());
    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn delay_off_disables_pauses() {
    let mut exec = executor(Recorder::new()).with_delay(DelayPolicy::Fixed(Duration::from_secs(5)));
    let start = Instant::now();
    exec.run(&compile("delay off\ninfo a\ninfo b")).await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn delay_pause_sits_between_delay_line_and_next_action() {
    let mut exec = stamped_executor(Stamped::default());
    let start = Instant::now();
    exec.run(&compile("browser ff\ndelay 200ms\nvisit https://example.org")).await.unwrap();
    let browser = exec.into_browser();
    assert_eq!(browser.at("open"), start);
    let gap = browser.at("navigate") - browser.at("open");
    assert!(gap >= Duration::from_millis(200) && gap < Duration::from_millis(400), "{gap:?}");
}

// ── Interrupts ────────────────────────────────────────────────────────────────

#[cfg(unix)]
#[tokio::test]
async fn sigint_outside_a_wait_closes_the_session_and_stops() {
    let interrupt = Interrupt::new();
    let _listener = interrupt.listen_for_ctrl_c();
    // Let the listener install its handler before the signal is sent.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let browser = Stamped { sigint_on_navigate: Some(interrupt.clone()), ..Stamped::default() };
    let mut exec = stamped_executor(browser).with_interrupt(interrupt);
    let outcome = exec.run(&compile("browser ff\nvisit https://example.org\nselect '#never'")).await;

    assert!(matches!(outcome, Err(ScriptError::Exit(1))));
    let browser = exec.into_browser();
    assert_eq!(browser.inner.close_count(), 1);
    assert!(!browser.stamps.iter().any(|(call, _)| call == "find"));
}

#[tokio::test(start_paused = true)]
async fn sleep_range_stays_in_bounds() {
    let start = Instant::now();
    let (outcome, _) = run("sleep 1s-2s").await;
    outcome.unwrap();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(3));
}

pub mod browser;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod keys;
pub mod pacing;
pub mod script;
pub mod webdriver;

pub use browser::{Browser, BrowserError, Recorder};
pub use context::Context;
pub use error::{Result, ScriptError};

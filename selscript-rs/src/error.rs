//! Error taxonomy for compiling and running scripts.
//!
//! Three layers, all carried by [`ScriptError`]:
//!
//! - compile errors, collected for a whole pass and surfaced once as
//!   [`ScriptError::Compile`];
//! - domain run-time errors (bad values, missing variables, browser
//!   failures), which abort the run after being logged;
//! - internal errors, which abort the same way but are logged with their
//!   full debug form.
//!
//! [`ScriptError::Exit`] is the quiet-exit signal used to unwind back to
//! `main` once the failure has already been reported.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::browser::BrowserError;

pub type Result<T, E = ScriptError> = std::result::Result<T, E>;

// ── Compile errors ────────────────────────────────────────────────────────────

/// What went wrong on one script line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error("unknown action {0:?}")]
    UnknownAction(String),
    #[error("unknown macro {0:?}")]
    UnknownMacro(String),
    #[error("too many parameters ({given} given) for `{signature}`")]
    TooManyArguments { given: usize, signature: String },
    #[error("cannot include {path}: {reason}")]
    MissingInclude { path: String, reason: String },
    #[error("recursive include of {0}")]
    RecursiveInclude(String),
    #[error("{0}")]
    Syntax(String),
}

/// A compile error pinned to its source file and line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub source: Arc<str>,
    pub line: usize,
    pub kind: CompileErrorKind,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.source, self.line, self.kind)
    }
}

/// Every error found during one compile pass, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompileErrors(pub Vec<CompileError>);

impl CompileErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompileError> {
        self.0.iter()
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0.len();
        write!(f, "{n} error{}", if n == 1 { "" } else { "s" })?;
        for err in &self.0 {
            write!(f, "\n  {err}")?;
        }
        Ok(())
    }
}

// ── Script errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script failed during compilation: {0}")]
    Compile(CompileErrors),

    #[error("can't parse {text:?} as {expected}")]
    Value { text: String, expected: &'static str },

    #[error("missing variable {0:?}")]
    MissingVariable(String),

    #[error("unclosed '${{' in {0:?}")]
    UnclosedBrace(String),

    #[error("bad parameters for {action}: {message}")]
    Binding { action: String, message: String },

    #[error("no browser session (open one with BROWSER first)")]
    NoSession,

    #[error("no active element (pick one with SELECT first)")]
    NoElement,

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("exit status {0}")]
    Exit(i32),
}

impl ScriptError {
    pub fn value(text: impl Into<String>, expected: &'static str) -> Self {
        ScriptError::Value { text: text.into(), expected }
    }

    pub fn binding(action: impl Into<String>, message: impl Into<String>) -> Self {
        ScriptError::Binding { action: action.into(), message: message.into() }
    }

    /// Errors meaningful to script authors.  Everything except internal
    /// failures and the quiet-exit signal.
    pub fn is_domain(&self) -> bool {
        !matches!(self, ScriptError::Internal(_) | ScriptError::Exit(_))
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ScriptError::Exit(code) => *code,
            _ => 1,
        }
    }

    /// Short label used in log records.
    pub fn kind(&self) -> &'static str {
        match self {
            ScriptError::Compile(_) => "CompileError",
            ScriptError::Value { .. } => "ValueError",
            ScriptError::MissingVariable(_) => "MissingVariable",
            ScriptError::UnclosedBrace(_) => "SyntaxError",
            ScriptError::Binding { .. } => "BindingError",
            ScriptError::NoSession | ScriptError::NoElement => "PreconditionError",
            ScriptError::Browser(_) => "BrowserError",
            ScriptError::Timeout { .. } => "TimeoutError",
            ScriptError::Io { .. } => "IoError",
            ScriptError::Internal(_) => "InternalError",
            ScriptError::Exit(_) => "Exit",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

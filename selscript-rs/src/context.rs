//! Variable context.
//!
//! One [`Context`] lives for a whole run.  It is seeded from the key
//! constants (`@RETURN`, `@TAB`, …), then the process environment, then any
//! caller overrides, and afterwards only changes through the `set` and
//! `default` actions.

use std::collections::HashMap;
use std::fmt;

use crate::keys::Key;

/// A context entry: plain text or an opaque key constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    Text(String),
    Key(Key),
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Text(s) => write!(f, "{s}"),
            Variable::Key(k) => write!(f, "{k}"),
        }
    }
}

impl From<String> for Variable {
    fn from(s: String) -> Self {
        Variable::Text(s)
    }
}

impl From<&str> for Variable {
    fn from(s: &str) -> Self {
        Variable::Text(s.to_owned())
    }
}

impl From<Key> for Variable {
    fn from(k: Key) -> Self {
        Variable::Key(k)
    }
}

/// Name → value store used for interpolation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    vars: HashMap<String, Variable>,
}

impl Context {
    /// An empty context (no constants, no environment).
    pub fn new() -> Self {
        Self::default()
    }

    /// A context holding only the key constants.
    pub fn with_constants() -> Self {
        let mut ctx = Self::new();
        for (name, key) in Key::constants() {
            ctx.set(name, key);
        }
        ctx
    }

    /// The context for a script run: constants, then the process environment,
    /// then `overrides`.  Later sources win.
    pub fn for_run<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut ctx = Self::with_constants();
        // Environment entries that are not valid UTF-8 cannot be interpolated.
        for (name, value) in std::env::vars_os() {
            if let (Ok(name), Ok(value)) = (name.into_string(), value.into_string()) {
                ctx.set(name, value);
            }
        }
        for (name, value) in overrides {
            ctx.set(name.into(), value.into());
        }
        ctx
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Variable>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Set a variable only if it is absent.  Returns `true` if it was set.
    pub fn set_default(&mut self, name: impl Into<String>, value: impl Into<Variable>) -> bool {
        let mut inserted = false;
        self.vars.entry(name.into()).or_insert_with(|| {
            inserted = true;
            value.into()
        });
        inserted
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    /// The key constant stored under `name`, if that entry is a key.
    pub fn get_key(&self, name: &str) -> Option<Key> {
        match self.vars.get(name)? {
            Variable::Key(k) => Some(*k),
            Variable::Text(_) => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Compiled script instructions.

use std::sync::Arc;

/// One compiled action invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Script file the line came from.
    pub source: Arc<str>,
    /// 1-based line number within `source`.
    pub line: usize,
    /// Normalized action name (see [`normalize_action`]).
    pub action: String,
    /// Escape-decoded arguments, not yet interpolated.
    pub args: Vec<String>,
}

/// Case-fold an action name and map `-` to `_`.
pub fn normalize_action(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

//! Positional / `--name [value]` argument splitting.

use std::collections::BTreeMap;

/// The value of a named argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Named {
    Text(String),
    /// `--name` with no value.
    Flag,
}

/// Split `args` into positional values and named values.
///
/// `--key value` binds `value` to `key`.  A `--key` followed by another
/// `--` token, or by nothing, is a [`Named::Flag`].  Everything else is
/// positional, in order.  A repeated key keeps its last value.
pub fn split<S: AsRef<str>>(args: &[S]) -> (Vec<String>, BTreeMap<String, Named>) {
    let mut positional = Vec::new();
    let mut named = BTreeMap::new();
    let mut open: Option<String> = None;

    for arg in args {
        let arg = arg.as_ref();
        if let Some(key) = arg.strip_prefix("--") {
            if let Some(prev) = open.replace(key.to_owned()) {
                named.insert(prev, Named::Flag);
            }
        } else if let Some(key) = open.take() {
            named.insert(key, Named::Text(arg.to_owned()));
        } else {
            positional.push(arg.to_owned());
        }
    }
    if let Some(key) = open {
        named.insert(key, Named::Flag);
    }

    (positional, named)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

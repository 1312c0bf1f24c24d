//! Variable interpolation.
//!
//! | Sequence   | Meaning                                             |
//! |------------|-----------------------------------------------------|
//! | `$NAME`    | Value of `NAME` (`[A-Za-z_@][A-Za-z0-9_]*`)         |
//! | `${NAME}`  | Value of `NAME`, where `NAME` is anything up to `}` |
//! | `$$`       | Literal `$`                                         |
//!
//! A `$` followed by anything else is kept as is.  Referencing a name the
//! context does not hold is an error.

use std::iter::Peekable;
use std::str::Chars;

use crate::context::Context;
use crate::error::{Result, ScriptError};

/// Expand every variable reference in `src`.
pub fn expand(src: &str, ctx: &Context) -> Result<String> {
    if !src.contains('$') {
        return Ok(src.to_owned());
    }

    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }
        match chars.peek().copied() {
            Some('{') => {
                chars.next(); // consume '{'
                let name = read_brace_name(&mut chars).ok_or_else(|| {
                    ScriptError::UnclosedBrace(src.to_owned())
                })?;
                out.push_str(&lookup(&name, ctx)?);
            }
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some(c) if is_ident_start(c) => {
                chars.next();
                let mut name = String::from(c);
                while let Some(c) = chars.next_if(|c| is_ident_continue(*c)) {
                    name.push(c);
                }
                out.push_str(&lookup(&name, ctx)?);
            }
            _ => out.push('$'),
        }
    }

    Ok(out)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '@'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Everything up to the closing `}`; `None` if there is none.
fn read_brace_name(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut name = String::new();
    for c in chars.by_ref() {
        if c == '}' {
            return Some(name);
        }
        name.push(c);
    }
    None
}

fn lookup(name: &str, ctx: &Context) -> Result<String> {
    ctx.get(name)
        .map(ToString::to_string)
        .ok_or_else(|| ScriptError::MissingVariable(name.to_owned()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        let mut ctx = Context::with_constants();
        ctx.set("NAME", "world");
        ctx.set("n", "3");
        ctx
    }

    #[test]
    fn bare_name() {
        assert_eq!(expand("hello $NAME", &ctx()).unwrap(), "hello world");
    }

    #[test]
    fn braced_name() {
        assert_eq!(expand("${NAME}wide", &ctx()).unwrap(), "worldwide");
    }

    #[test]
    fn bare_name_stops_at_punctuation() {
        assert_eq!(expand("hi $NAME!", &ctx()).unwrap(), "hi world!");
        assert_eq!(expand("$n.5", &ctx()).unwrap(), "3.5");
    }

    #[test]
    fn missing_variable_is_named() {
        match expand("hello $MISSING", &ctx()) {
            Err(ScriptError::MissingVariable(name)) => assert_eq!(name, "MISSING"),
            other => panic!("expected missing variable, got {other:?}"),
        }
    }

    #[test]
    fn key_constants_expand_to_code_points() {
        assert_eq!(expand("a${@TAB}b", &ctx()).unwrap(), "a\u{E004}b");
        assert_eq!(expand("$@RETURN", &ctx()).unwrap(), "\u{E006}");
    }

    #[test]
    fn dollar_escapes_and_literals() {
        assert_eq!(expand("cost: $$5", &ctx()).unwrap(), "cost: $5");
        assert_eq!(expand("5 $ each", &ctx()).unwrap(), "5 $ each");
        assert_eq!(expand("end$", &ctx()).unwrap(), "end$");
    }

    #[test]
    fn unclosed_brace() {
        assert!(matches!(
            expand("${NAME", &ctx()),
            Err(ScriptError::UnclosedBrace(_))
        ));
    }

    #[test]
    fn expands_exactly_once() {
        let mut c = ctx();
        c.set("A", "$NAME");
        assert_eq!(expand("$A", &c).unwrap(), "$NAME");
    }

    #[test]
    fn text_without_dollar_is_unchanged() {
        assert_eq!(expand("plain text", &Context::new()).unwrap(), "plain text");
    }
}

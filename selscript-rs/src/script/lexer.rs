//! Line tokenizer and escape decoding.
//!
//! Words follow POSIX shell quoting:
//!
//! - whitespace separates words;
//! - `'…'` is literal;
//! - `"…"` is literal except that `\"` and `\\` escape;
//! - outside quotes a backslash escapes the next character;
//! - an unquoted `#` ends the line (comment).
//!
//! Escape sequences such as `\n` survive tokenization when quoted and are
//! turned into real characters afterwards by [`decode_escapes`].

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("no closing quotation")]
    UnclosedQuote,
    #[error("no escaped character")]
    TrailingEscape,
}

/// Split one script line into words.
pub fn split_line(line: &str) -> Result<Vec<String>, LexError> {
    let mut words = Vec::new();
    let mut cur = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut cur));
                    in_word = false;
                }
            }
            '#' => break,
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => cur.push(c),
                        None => return Err(LexError::UnclosedQuote),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => cur.push(c),
                            Some(c) => {
                                cur.push('\\');
                                cur.push(c);
                            }
                            None => return Err(LexError::UnclosedQuote),
                        },
                        Some(c) => cur.push(c),
                        None => return Err(LexError::UnclosedQuote),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => cur.push(c),
                    None => return Err(LexError::TrailingEscape),
                }
            }
            c => {
                in_word = true;
                cur.push(c);
            }
        }
    }
    if in_word {
        words.push(cur);
    }

    Ok(words)
}

/// Turn backslash escape sequences into the characters they name.
///
/// Recognised: `\n \t \r \0 \\ \' \"`, `\xHH` and `\u{H…}`.  Anything else
/// (including malformed hex forms) is kept verbatim.
pub fn decode_escapes(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_owned();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let (decoded, used) = decode_one(tail);
        match decoded {
            Some(c) => out.push(c),
            None => out.push('\\'),
        }
        rest = &tail[used..];
    }
    out.push_str(rest);
    out
}

/// Decode the sequence after a backslash.  Returns the character (if the
/// sequence is valid) and how many bytes of `tail` it consumed.
fn decode_one(tail: &str) -> (Option<char>, usize) {
    let Some(first) = tail.chars().next() else {
        return (None, 0);
    };
    let simple = match first {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '0' => Some('\0'),
        '\\' => Some('\\'),
        '\'' => Some('\''),
        '"' => Some('"'),
        _ => None,
    };
    if simple.is_some() {
        return (simple, 1);
    }
    match first {
        'x' => {
            let hex = tail.get(1..3).filter(|h| h.chars().all(|c| c.is_ascii_hexdigit()));
            match hex.and_then(|h| u32::from_str_radix(h, 16).ok()).and_then(char::from_u32) {
                Some(c) => (Some(c), 3),
                None => (None, 0),
            }
        }
        'u' if tail[1..].starts_with('{') => {
            let Some(close) = tail.find('}') else {
                return (None, 0);
            };
            let digits = &tail[2..close];
            let valid = !digits.is_empty()
                && digits.len() <= 6
                && digits.chars().all(|c| c.is_ascii_hexdigit());
            let decoded = valid
                .then(|| u32::from_str_radix(digits, 16).ok())
                .flatten()
                .and_then(char::from_u32);
            match decoded {
                Some(c) => (Some(c), close + 1),
                None => (None, 0),
            }
        }
        _ => (None, 0),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

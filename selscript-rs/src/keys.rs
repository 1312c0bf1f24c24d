//! Symbolic keyboard keys.
//!
//! Each key maps to the private-use code point the WebDriver protocol uses
//! for it, so a key can be sent inside ordinary text.  Every key is also
//! exposed as a context constant named `@NAME` (e.g. `@RETURN`).

use std::fmt;

/// A named non-printable key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    name: &'static str,
    code: char,
}

macro_rules! keys {
    ($($name:literal => $code:literal),* $(,)?) => {
        &[$(Key { name: $name, code: $code }),*]
    };
}

const KEYS: &[Key] = keys![
    "NULL" => '\u{E000}',
    "CANCEL" => '\u{E001}',
    "HELP" => '\u{E002}',
    "BACKSPACE" => '\u{E003}',
    "TAB" => '\u{E004}',
    "CLEAR" => '\u{E005}',
    "RETURN" => '\u{E006}',
    "ENTER" => '\u{E007}',
    "SHIFT" => '\u{E008}',
    "CONTROL" => '\u{E009}',
    "ALT" => '\u{E00A}',
    "PAUSE" => '\u{E00B}',
    "ESCAPE" => '\u{E00C}',
    "SPACE" => '\u{E00D}',
    "PAGE_UP" => '\u{E00E}',
    "PAGE_DOWN" => '\u{E00F}',
    "END" => '\u{E010}',
    "HOME" => '\u{E011}',
    "LEFT" => '\u{E012}',
    "UP" => '\u{E013}',
    "RIGHT" => '\u{E014}',
    "DOWN" => '\u{E015}',
    "INSERT" => '\u{E016}',
    "DELETE" => '\u{E017}',
    "SEMICOLON" => '\u{E018}',
    "EQUALS" => '\u{E019}',
    "NUMPAD0" => '\u{E01A}',
    "NUMPAD1" => '\u{E01B}',
    "NUMPAD2" => '\u{E01C}',
    "NUMPAD3" => '\u{E01D}',
    "NUMPAD4" => '\u{E01E}',
    "NUMPAD5" => '\u{E01F}',
    "NUMPAD6" => '\u{E020}',
    "NUMPAD7" => '\u{E021}',
    "NUMPAD8" => '\u{E022}',
    "NUMPAD9" => '\u{E023}',
    "MULTIPLY" => '\u{E024}',
    "ADD" => '\u{E025}',
    "SEPARATOR" => '\u{E026}',
    "SUBTRACT" => '\u{E027}',
    "DECIMAL" => '\u{E028}',
    "DIVIDE" => '\u{E029}',
    "F1" => '\u{E031}',
    "F2" => '\u{E032}',
    "F3" => '\u{E033}',
    "F4" => '\u{E034}',
    "F5" => '\u{E035}',
    "F6" => '\u{E036}',
    "F7" => '\u{E037}',
    "F8" => '\u{E038}',
    "F9" => '\u{E039}',
    "F10" => '\u{E03A}',
    "F11" => '\u{E03B}',
    "F12" => '\u{E03C}',
    "META" => '\u{E03D}',
];

/// Alternate spellings accepted by [`Key::lookup`].
const ALIASES: &[(&str, &str)] = &[
    ("ESC", "ESCAPE"),
    ("CTRL", "CONTROL"),
    ("COMMAND", "META"),
    ("ARROW_LEFT", "LEFT"),
    ("ARROW_UP", "UP"),
    ("ARROW_RIGHT", "RIGHT"),
    ("ARROW_DOWN", "DOWN"),
    ("BACK_SPACE", "BACKSPACE"),
    ("DEL", "DELETE"),
];

impl Key {
    /// Canonical upper-case name, without the `@` prefix.
    pub fn name(self) -> &'static str {
        self.name
    }

    /// The code point sent over the wire for this key.
    pub fn code(self) -> char {
        self.code
    }

    /// Resolve a key by name: case-insensitive, optional leading `@`, and
    /// `-` interchangeable with `_`.
    pub fn lookup(name: &str) -> Option<Key> {
        let wanted = name
            .strip_prefix('@')
            .unwrap_or(name)
            .to_ascii_uppercase()
            .replace('-', "_");
        let wanted = ALIASES
            .iter()
            .find(|(alias, _)| *alias == wanted)
            .map(|(_, target)| (*target).to_owned())
            .unwrap_or(wanted);
        KEYS.iter().copied().find(|k| k.name == wanted)
    }

    /// Resolve a key from its wire code point.
    pub fn from_code(code: char) -> Option<Key> {
        KEYS.iter().copied().find(|k| k.code == code)
    }

    /// All keys as `(@NAME, key)` pairs, for seeding a context.
    pub fn constants() -> impl Iterator<Item = (String, Key)> {
        KEYS.iter().map(|k| (format!("@{}", k.name), *k))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! String → [`Value`] conversion.
//!
//! Every pattern is a full match.  With [`ValueType::Auto`] the candidates
//! are tried in a fixed order (integer, number, boolean, duration) and the
//! first one that matches the whole string wins; anything else stays a
//! string.  So `"1"` is an integer, `"1.5"` a number, `"on"` a boolean and
//! `"200ms"` a duration.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::value::{Value, ValueType};
use crate::error::{Result, ScriptError};
use crate::keys::Key;

static INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("integer pattern"));

/// Auto-detected numbers need a decimal point; plain digits are integers.
static AUTO_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]*\.[0-9]+$").expect("number pattern"));

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)$").expect("decimal pattern")
});

static AUTO_BOOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(true|yes|on|false|no|off)$").expect("boolean pattern"));

static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:[0-9]+|[0-9]*\.[0-9]+)(?:ms|s|m|h))+$").expect("duration pattern")
});

static DURATION_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+|[0-9]*\.[0-9]+)(ms|s|m|h)").expect("duration part pattern")
});

/// Parse `raw` as `ty`.
pub fn parse(raw: &str, ty: ValueType) -> Result<Value> {
    match ty {
        ValueType::Auto => Ok(parse_auto(raw)),
        ValueType::Str => Ok(Value::Str(raw.to_owned())),
        ValueType::Int => parse_int(raw).map(Value::Int),
        ValueType::Number => parse_number(raw).map(Value::Number),
        ValueType::Bool => parse_bool(raw).map(Value::Bool),
        ValueType::Duration => parse_duration(raw).map(Value::Duration),
        ValueType::Key => parse_key(raw).map(Value::Key),
    }
}

/// Infer the type of `raw`.  Never fails: unmatched text is a string.
pub fn parse_auto(raw: &str) -> Value {
    if INT.is_match(raw) {
        if let Ok(n) = raw.parse::<i64>() {
            return Value::Int(n);
        }
    }
    if AUTO_NUMBER.is_match(raw) {
        if let Ok(x) = raw.parse::<f64>() {
            return Value::Number(x);
        }
    }
    if AUTO_BOOL.is_match(raw) {
        if let Ok(b) = parse_bool(raw) {
            return Value::Bool(b);
        }
    }
    if DURATION.is_match(raw) {
        if let Ok(d) = parse_duration(raw) {
            return Value::Duration(d);
        }
    }
    Value::Str(raw.to_owned())
}

pub fn parse_int(raw: &str) -> Result<i64> {
    if !INT.is_match(raw) {
        return Err(ScriptError::value(raw, "integer"));
    }
    raw.parse().map_err(|_| ScriptError::value(raw, "integer"))
}

pub fn parse_number(raw: &str) -> Result<f64> {
    if !NUMBER.is_match(raw) {
        return Err(ScriptError::value(raw, "number"));
    }
    raw.parse().map_err(|_| ScriptError::value(raw, "number"))
}

pub fn parse_bool(raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ScriptError::value(raw, "boolean")),
    }
}

/// Parse concatenated `<amount><unit>` groups (`1m30s`, `100ms30ms`) into
/// their sum.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    if !DURATION.is_match(raw) {
        return Err(ScriptError::value(raw, "duration"));
    }
    let invalid = || ScriptError::value(raw, "duration");
    let mut nanos = 0u64;
    for caps in DURATION_PART.captures_iter(raw) {
        let amount: f64 = caps[1].parse().map_err(|_| invalid())?;
        let factor = match &caps[2] {
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        let part = (amount * factor).round();
        // `u64::MAX as f64` rounds up to 2^64, so `<` keeps the cast exact.
        if !part.is_finite() || part >= u64::MAX as f64 {
            return Err(invalid());
        }
        nanos = nanos.checked_add(part as u64).ok_or_else(invalid)?;
    }
    Ok(Duration::from_nanos(nanos))
}

/// Parse `A` or `A-B` into a `[min, max)` pair.  A single duration gives
/// `min == max`.
pub fn parse_duration_range(raw: &str) -> Result<(Duration, Duration)> {
    match raw.split_once('-') {
        None => {
            let d = parse_duration(raw)?;
            Ok((d, d))
        }
        Some((lo, hi)) => {
            let min = parse_duration(lo.trim())?;
            let max = parse_duration(hi.trim())?;
            if max < min {
                return Err(ScriptError::value(raw, "duration range (min-max)"));
            }
            Ok((min, max))
        }
    }
}

/// A key name (`RETURN`, `@tab`) or a raw key code point.
pub fn parse_key(raw: &str) -> Result<Key> {
    let mut chars = raw.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if let Some(key) = Key::from_code(c) {
            return Ok(key);
        }
    }
    Key::lookup(raw).ok_or_else(|| ScriptError::value(raw, "key"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

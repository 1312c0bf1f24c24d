//! Binding interpolated arguments to an action's parameters.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::parse::parse;
use super::registry::{ActionSpec, ParamKind};
use super::split::{split, Named};
use super::value::{Value, ValueType};
use crate::context::Context;
use crate::error::{Result, ScriptError};

/// Arguments bound to one action's parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bound {
    action: String,
    values: HashMap<&'static str, Value>,
    rest: Vec<Value>,
    extra: BTreeMap<String, Value>,
}

impl Bound {
    /// Value bound to a fixed or keyword-only parameter, if supplied.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Text form of an optional parameter.
    pub fn text_opt(&self, name: &str) -> Option<String> {
        self.get(name).map(ToString::to_string)
    }

    /// Text form of a parameter the binder guarantees is present.
    pub fn text(&self, name: &str) -> Result<String> {
        self.text_opt(name).ok_or_else(|| {
            ScriptError::Internal(format!("{}: parameter {name:?} was not bound", self.action))
        })
    }

    pub fn duration(&self, name: &str) -> Option<Duration> {
        self.get(name).and_then(Value::as_duration)
    }

    /// Values taken by the variadic parameter.
    pub fn rest(&self) -> &[Value] {
        &self.rest
    }

    /// Variadic values joined with single spaces.
    pub fn joined_rest(&self) -> String {
        self.rest.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
    }

    /// Named arguments collected by the variadic-keyword parameter.
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }
}

/// Bind `args` (already interpolated) to `spec`'s parameters.
pub fn bind(spec: &ActionSpec, args: &[String], ctx: &Context) -> Result<Bound> {
    let (positional, mut named) = split(args);
    let mut positional = positional.into_iter();
    let mut bound = Bound { action: spec.name.clone(), ..Bound::default() };

    for param in &spec.params {
        match param.kind {
            ParamKind::Fixed => match positional.next() {
                Some(raw) => {
                    bound.values.insert(param.name, convert(&raw, param.ty, ctx)?);
                }
                None if param.has_default => {}
                None => {
                    return Err(ScriptError::binding(
                        &spec.name,
                        format!("missing argument {:?} (usage: {})", param.name, spec.signature()),
                    ));
                }
            },
            ParamKind::Variadic => {
                for raw in positional.by_ref() {
                    bound.rest.push(convert(&raw, param.ty, ctx)?);
                }
            }
            ParamKind::KeywordOnly => {
                let dashed = param.name.replace('_', "-");
                let found = named.remove(param.name).or_else(|| named.remove(&dashed));
                match found {
                    Some(value) => {
                        let value = convert_named(spec, param.name, value, param.ty, ctx)?;
                        bound.values.insert(param.name, value);
                    }
                    None if param.has_default => {}
                    None => {
                        return Err(ScriptError::binding(
                            &spec.name,
                            format!("missing option --{dashed}"),
                        ));
                    }
                }
            }
            ParamKind::VariadicKeyword => {
                for (key, value) in std::mem::take(&mut named) {
                    let value = convert_named(spec, &key, value, param.ty, ctx)?;
                    bound.extra.insert(key, value);
                }
            }
        }
    }

    let leftover: Vec<String> = positional.collect();
    if !leftover.is_empty() {
        return Err(ScriptError::binding(
            &spec.name,
            format!("unexpected argument(s) {leftover:?} (usage: {})", spec.signature()),
        ));
    }
    if let Some(key) = named.keys().next() {
        return Err(ScriptError::binding(
            &spec.name,
            format!("unknown option --{key} (usage: {})", spec.signature()),
        ));
    }

    Ok(bound)
}

/// Parse one argument.  A key-typed parameter first looks the text up as a
/// key constant in the context.
fn convert(raw: &str, ty: ValueType, ctx: &Context) -> Result<Value> {
    if ty == ValueType::Key {
        if let Some(key) = ctx.get_key(raw) {
            return Ok(Value::Key(key));
        }
    }
    parse(raw, ty)
}

fn convert_named(
    spec: &ActionSpec,
    key: &str,
    value: Named,
    ty: ValueType,
    ctx: &Context,
) -> Result<Value> {
    match value {
        Named::Text(raw) => convert(&raw, ty, ctx),
        Named::Flag if matches!(ty, ValueType::Auto | ValueType::Bool) => Ok(Value::Bool(true)),
        Named::Flag => Err(ScriptError::binding(
            &spec.name,
            format!("option --{key} expects a {} value", ty.name()),
        )),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

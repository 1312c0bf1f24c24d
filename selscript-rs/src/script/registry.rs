//! Action registry.
//!
//! Maps normalized action names to an [`ActionKind`] (the handler the
//! executor dispatches to) and the parameter list the binder uses.  The
//! table is built once with [`RegistryBuilder`]; [`Registry::standard`]
//! holds every built-in action.

use std::collections::HashMap;

use super::split::split;
use super::token::normalize_action;
use super::value::ValueType;

// ── Parameters ────────────────────────────────────────────────────────────────

/// How a parameter consumes arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Consumes one positional argument.
    Fixed,
    /// Consumes all remaining positional arguments.
    Variadic,
    /// Looked up by name among `--name value` arguments.
    KeywordOnly,
    /// Collects every named argument no other parameter claimed.
    VariadicKeyword,
}

/// A declared handler parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub ty: ValueType,
    pub has_default: bool,
}

impl ParamSpec {
    fn new(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind, ty: ValueType::Auto, has_default: false }
    }

    pub fn fixed(name: &'static str) -> Self {
        Self::new(name, ParamKind::Fixed)
    }

    pub fn variadic(name: &'static str) -> Self {
        Self::new(name, ParamKind::Variadic)
    }

    /// Keyword-only parameters are optional unless [`ParamSpec::required`]
    /// is applied.
    pub fn keyword(name: &'static str) -> Self {
        Self { has_default: true, ..Self::new(name, ParamKind::KeywordOnly) }
    }

    pub fn variadic_keyword(name: &'static str) -> Self {
        Self::new(name, ParamKind::VariadicKeyword)
    }

    pub fn typed(mut self, ty: ValueType) -> Self {
        self.ty = ty;
        self
    }

    pub fn optional(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.has_default = false;
        self
    }
}

// ── Actions ───────────────────────────────────────────────────────────────────

/// The handler an action dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Debug,
    Info,
    Warning,
    Error,
    Set,
    Default,
    Delay,
    Sleep,
    Browser,
    Close,
    Visit,
    Back,
    Forward,
    Refresh,
    Select,
    Focused,
    Click,
    Write,
    Press,
    WaitTill,
    Script,
    Url,
    Windows,
    Timeouts,
}

/// A registered action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: String,
    pub kind: ActionKind,
    pub params: Vec<ParamSpec>,
}

impl ActionSpec {
    /// Number of `Fixed` parameters.
    pub fn fixed_count(&self) -> usize {
        self.params.iter().filter(|p| p.kind == ParamKind::Fixed).count()
    }

    pub fn has_variadic(&self) -> bool {
        self.params.iter().any(|p| p.kind == ParamKind::Variadic)
    }

    /// Compile-time arity check: only rejects more positional arguments
    /// than there are fixed slots when nothing absorbs the rest.  Returns
    /// the offending positional count.
    pub fn check_arity<S: AsRef<str>>(&self, args: &[S]) -> Result<(), usize> {
        if self.has_variadic() {
            return Ok(());
        }
        let (positional, _) = split(args);
        if positional.len() > self.fixed_count() {
            return Err(positional.len());
        }
        Ok(())
    }

    /// Human-readable signature, e.g. `select query [--by] [--timeout]`.
    pub fn signature(&self) -> String {
        let mut parts = vec![self.name.clone()];
        for p in &self.params {
            parts.push(match (p.kind, p.has_default) {
                (ParamKind::Fixed, false) => p.name.to_owned(),
                (ParamKind::Fixed, true) => format!("[{}]", p.name),
                (ParamKind::Variadic, _) => format!("{}...", p.name),
                (ParamKind::KeywordOnly, false) => format!("--{}", p.name),
                (ParamKind::KeywordOnly, true) => format!("[--{}]", p.name),
                (ParamKind::VariadicKeyword, _) => format!("[--{}...]", p.name),
            });
        }
        parts.join(" ")
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Registry {
    actions: HashMap<String, ActionSpec>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up a normalized action name.
    pub fn get(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Every built-in action.
    pub fn standard() -> Self {
        use ActionKind as A;
        use ParamSpec as P;
        use ValueType as T;

        let message = || [P::variadic("message").typed(T::Str)];
        let by = || P::keyword("by").typed(T::Str);
        let timeout = || P::keyword("timeout").typed(T::Duration);
        let into_var = || P::keyword("into").typed(T::Str);

        Registry::builder()
            // logging
            .action("debug", A::Debug, message())
            .action("info", A::Info, message())
            .action("warning", A::Warning, message())
            .alias("warn", "warning")
            .action("error", A::Error, message())
            // variables
            .action("set", A::Set, [P::fixed("name").typed(T::Str), P::fixed("value").typed(T::Str)])
            .action("default", A::Default, [P::fixed("name").typed(T::Str), P::fixed("value").typed(T::Str)])
            // pacing
            .action("delay", A::Delay, [P::fixed("policy").typed(T::Str)])
            .action("sleep", A::Sleep, [P::fixed("duration").typed(T::Str)])
            // session
            .action("browser", A::Browser, [P::fixed("name").typed(T::Str), P::variadic_keyword("options")])
            .action("close", A::Close, [])
            .action("timeouts", A::Timeouts, [
                P::keyword("page_load").typed(T::Duration),
                P::keyword("implicit").typed(T::Duration),
            ])
            // navigation
            .action("visit", A::Visit, [P::fixed("url").typed(T::Str)])
            .action("back", A::Back, [])
            .action("forward", A::Forward, [])
            .action("refresh", A::Refresh, [])
            .action("url", A::Url, [into_var()])
            .action("windows", A::Windows, [])
            // elements
            .action("select", A::Select, [P::fixed("query").typed(T::Str), by(), timeout()])
            .action("focused", A::Focused, [])
            .action("click", A::Click, [P::fixed("query").typed(T::Str).optional(), by()])
            .action("write", A::Write, [P::variadic("text").typed(T::Str)])
            .alias("type", "write")
            .action("press", A::Press, [P::variadic("keys").typed(T::Key)])
            .action("wait_till", A::WaitTill, [
                P::fixed("condition").typed(T::Str),
                P::variadic("args").typed(T::Str),
                timeout(),
                by(),
            ])
            .action("script", A::Script, [P::variadic("code").typed(T::Str), into_var()])
            .build()
    }
}

/// Collects action definitions for a [`Registry`].
///
/// Signatures are checked as they are added: at most one `Variadic` and one
/// `VariadicKeyword` parameter, and parameters ordered fixed, variadic,
/// keyword-only, variadic-keyword.  A violation is a bug in the table, so
/// it panics.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    actions: HashMap<String, ActionSpec>,
}

impl RegistryBuilder {
    pub fn action(
        mut self,
        name: &str,
        kind: ActionKind,
        params: impl IntoIterator<Item = ParamSpec>,
    ) -> Self {
        let name = normalize_action(name);
        let params: Vec<ParamSpec> = params.into_iter().collect();
        validate_signature(&name, &params);
        self.actions.insert(name.clone(), ActionSpec { name, kind, params });
        self
    }

    /// Register `alias` as another name for the already-registered `target`.
    pub fn alias(mut self, alias: &str, target: &str) -> Self {
        let target = normalize_action(target);
        let spec = self
            .actions
            .get(&target)
            .unwrap_or_else(|| panic!("alias {alias:?} refers to unregistered action {target:?}"))
            .clone();
        let alias = normalize_action(alias);
        self.actions.insert(alias.clone(), ActionSpec { name: alias, ..spec });
        self
    }

    pub fn build(self) -> Registry {
        Registry { actions: self.actions }
    }
}

fn rank(kind: ParamKind) -> u8 {
    match kind {
        ParamKind::Fixed => 0,
        ParamKind::Variadic => 1,
        ParamKind::KeywordOnly => 2,
        ParamKind::VariadicKeyword => 3,
    }
}

fn validate_signature(name: &str, params: &[ParamSpec]) {
    let count = |kind| params.iter().filter(|p| p.kind == kind).count();
    assert!(count(ParamKind::Variadic) <= 1, "{name}: more than one variadic parameter");
    assert!(
        count(ParamKind::VariadicKeyword) <= 1,
        "{name}: more than one variadic keyword parameter"
    );
    assert!(
        params.windows(2).all(|w| rank(w[0].kind) <= rank(w[1].kind)),
        "{name}: parameters out of order"
    );
    let mut seen = std::collections::HashSet::new();
    assert!(params.iter().all(|p| seen.insert(p.name)), "{name}: duplicate parameter name");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_resolves_aliases() {
        let reg = Registry::standard();
        assert_eq!(reg.get("warn").unwrap().kind, ActionKind::Warning);
        assert_eq!(reg.get("type").unwrap().kind, ActionKind::Write);
        assert_eq!(reg.get("wait_till").unwrap().kind, ActionKind::WaitTill);
        assert!(reg.get("WAIT-TILL").is_none());
    }

    #[test]
    fn every_standard_signature_is_well_formed() {
        let reg = Registry::standard();
        for name in reg.names() {
            validate_signature(name, &reg.get(name).unwrap().params);
        }
        assert!(reg.len() >= 24);
    }

    #[test]
    fn arity_rejects_excess_positionals() {
        let reg = Registry::standard();
        let set = reg.get("set").unwrap();
        assert_eq!(set.fixed_count(), 2);
        assert!(set.check_arity(&["a", "b"]).is_ok());
        assert_eq!(set.check_arity(&["a", "b", "c"]), Err(3));
    }

    #[test]
    fn arity_ignores_named_arguments() {
        let reg = Registry::standard();
        let select = reg.get("select").unwrap();
        assert!(select.check_arity(&["#q", "--by", "css", "--timeout", "2s"]).is_ok());
        assert!(select.check_arity(&["#q", "#r"]).is_err());
    }

    #[test]
    fn arity_allows_anything_with_variadic() {
        let reg = Registry::standard();
        assert!(reg.get("info").unwrap().check_arity(&["a", "b", "c", "d"]).is_ok());
    }

    #[test]
    fn arity_does_not_require_arguments() {
        let reg = Registry::standard();
        assert!(reg.get("visit").unwrap().check_arity::<&str>(&[]).is_ok());
    }

    #[test]
    fn signature_text() {
        let reg = Registry::standard();
        assert_eq!(reg.get("select").unwrap().signature(), "select query [--by] [--timeout]");
        assert_eq!(reg.get("click").unwrap().signature(), "click [query] [--by]");
        assert_eq!(reg.get("browser").unwrap().signature(), "browser name [--options...]");
    }

    #[test]
    fn builder_normalizes_names() {
        let reg = Registry::builder().action("Go-Home", ActionKind::Back, []).build();
        assert!(reg.get("go_home").is_some());
    }

    #[test]
    #[should_panic(expected = "more than one variadic")]
    fn two_variadics_panic() {
        Registry::builder().action(
            "bad",
            ActionKind::Info,
            [ParamSpec::variadic("a"), ParamSpec::variadic("b")],
        );
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn fixed_after_variadic_panics() {
        Registry::builder().action(
            "bad",
            ActionKind::Info,
            [ParamSpec::variadic("a"), ParamSpec::fixed("b")],
        );
    }
}

//! Script compiler: source text → flat [`Token`] list.
//!
//! Lines are processed in order.  Blank lines and lines starting with `#`
//! are skipped; everything else is split into words by the [lexer] and the
//! first word names either a macro (`@include`) or a registered action.
//!
//! Errors do not stop the scan.  Each one is logged with its file and line
//! as soon as it is found and collected; once the top-level source (with all
//! of its includes) has been read, any collected error fails the whole
//! compilation with [`ScriptError::Compile`].
//!
//! [lexer]: super::lexer

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, debug_span, error, trace_span};

use super::lexer::{decode_escapes, split_line};
use super::registry::Registry;
use super::token::{normalize_action, Token};
use crate::error::{CompileError, CompileErrorKind, CompileErrors, Result, ScriptError};

/// State shared by one compile pass across nested includes.
#[derive(Debug, Default)]
struct Pass {
    errors: Vec<CompileError>,
    /// Canonical paths of the files currently being compiled, outermost
    /// first.  Used to detect include cycles.
    stack: Vec<PathBuf>,
}

impl Pass {
    fn report(&mut self, source: &Arc<str>, line: usize, kind: CompileErrorKind) {
        let err = CompileError { source: Arc::clone(source), line, kind };
        error!("{err}");
        self.errors.push(err);
    }

    fn finish(self, tokens: Vec<Token>) -> Result<Vec<Token>> {
        if self.errors.is_empty() {
            debug!(tokens = tokens.len(), "compiled");
            return Ok(tokens);
        }
        error!("script failed during compilation");
        Err(ScriptError::Compile(CompileErrors(self.errors)))
    }
}

/// Compiles scripts against a fixed action registry.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'r> {
    registry: &'r Registry,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Compile a script file.  Includes resolve relative to its directory.
    pub fn compile_file(&self, path: &Path) -> Result<Vec<Token>> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ScriptError::Io { path: path.to_path_buf(), source })?;
        let mut pass = Pass::default();
        if let Ok(canonical) = path.canonicalize() {
            pass.stack.push(canonical);
        }
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let source: Arc<str> = Arc::from(path.display().to_string());
        let mut tokens = Vec::new();
        self.compile_source(&mut pass, &source, &text, base_dir, &mut tokens);
        pass.finish(tokens)
    }

    /// Compile in-memory text.  `name` labels diagnostics and includes
    /// resolve relative to `base_dir`.
    pub fn compile_str(&self, name: &str, text: &str, base_dir: &Path) -> Result<Vec<Token>> {
        let mut pass = Pass::default();
        let source: Arc<str> = Arc::from(name);
        let mut tokens = Vec::new();
        self.compile_source(&mut pass, &source, text, base_dir, &mut tokens);
        pass.finish(tokens)
    }

    fn compile_source(
        &self,
        pass: &mut Pass,
        source: &Arc<str>,
        text: &str,
        base_dir: &Path,
        out: &mut Vec<Token>,
    ) {
        let _span = debug_span!("compile", source = %source).entered();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let _line = trace_span!("line", line).entered();

            let words = match split_line(trimmed) {
                Ok(words) => words,
                Err(e) => {
                    pass.report(source, line, CompileErrorKind::Syntax(e.to_string()));
                    continue;
                }
            };
            let Some((head, args)) = words.split_first() else {
                continue;
            };
            let name = normalize_action(head);

            if name.starts_with('@') {
                self.expand_macro(pass, source, line, &name, args, base_dir, out);
                continue;
            }

            let Some(spec) = self.registry.get(&name) else {
                pass.report(source, line, CompileErrorKind::UnknownAction(head.clone()));
                continue;
            };
            if let Err(given) = spec.check_arity(args) {
                let kind =
                    CompileErrorKind::TooManyArguments { given, signature: spec.signature() };
                pass.report(source, line, kind);
                continue;
            }

            out.push(Token {
                source: Arc::clone(source),
                line,
                action: name,
                args: args.iter().map(|a| decode_escapes(a)).collect(),
            });
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_macro(
        &self,
        pass: &mut Pass,
        source: &Arc<str>,
        line: usize,
        name: &str,
        args: &[String],
        base_dir: &Path,
        out: &mut Vec<Token>,
    ) {
        if name != "@include" {
            pass.report(source, line, CompileErrorKind::UnknownMacro(name.to_owned()));
            return;
        }
        if args.is_empty() {
            let kind = CompileErrorKind::Syntax("@include expects at least one path".into());
            pass.report(source, line, kind);
            return;
        }
        for arg in args {
            self.include(pass, source, line, &decode_escapes(arg), base_dir, out);
        }
    }

    fn include(
        &self,
        pass: &mut Pass,
        source: &Arc<str>,
        line: usize,
        arg: &str,
        base_dir: &Path,
        out: &mut Vec<Token>,
    ) {
        let path = base_dir.join(arg);
        let missing = |reason: std::io::Error| CompileErrorKind::MissingInclude {
            path: path.display().to_string(),
            reason: reason.to_string(),
        };

        let canonical = match path.canonicalize() {
            Ok(p) => p,
            Err(e) => return pass.report(source, line, missing(e)),
        };
        if pass.stack.contains(&canonical) {
            let kind = CompileErrorKind::RecursiveInclude(path.display().to_string());
            return pass.report(source, line, kind);
        }
        let text = match std::fs::read_to_string(&canonical) {
            Ok(t) => t,
            Err(e) => return pass.report(source, line, missing(e)),
        };

        let child: Arc<str> = Arc::from(path.display().to_string());
        let child_base = canonical.parent().unwrap_or(base_dir).to_path_buf();
        pass.stack.push(canonical);
        self.compile_source(pass, &child, &text, &child_base, out);
        pass.stack.pop();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

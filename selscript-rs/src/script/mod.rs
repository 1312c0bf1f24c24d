//! Script language: compiling and executing action scripts.
//!
//! A script is a sequence of lines, each naming an action followed by
//! shell-quoted arguments:
//!
//! ```text
//! # log in
//! browser firefox
//! visit $BASE_URL/login
//! select '#user' --timeout 5s
//! write "$USER"
//! press @RETURN
//! @include common/logout.ss
//! ```
//!
//! | Stage              | Module      | Output                         |
//! |--------------------|-------------|--------------------------------|
//! | Line tokenizing    | [`lexer`]   | words                          |
//! | Compiling          | [`compile`] | `Vec<`[`Token`]`>`             |
//! | Interpolation      | [`expand`]  | argument text                  |
//! | Splitting          | [`split`]   | positional + `--name` args     |
//! | Binding            | [`bind`]    | typed [`Value`]s per parameter |
//! | Execution          | [`exec`]    | browser calls                  |
//!
//! # Quick start
//!
//! ```rust
//! use std::path::Path;
//! use selscript::script::{Compiler, Registry};
//!
//! let registry = Registry::standard();
//! let tokens = Compiler::new(&registry)
//!     .compile_str("demo.ss", "set NAME world\ninfo hello $NAME", Path::new("."))
//!     .unwrap();
//! assert_eq!(tokens.len(), 2);
//! assert_eq!(tokens[1].args, vec!["hello", "$NAME"]);
//! ```

pub mod bind;
pub mod compile;
pub mod exec;
pub mod expand;
pub mod lexer;
pub mod parse;
pub mod registry;
pub mod split;
pub mod token;
pub mod value;

// Re-exports for convenience.
pub use compile::Compiler;
pub use exec::{Executor, Settings};
pub use registry::{ActionKind, ActionSpec, ParamKind, ParamSpec, Registry};
pub use token::Token;
pub use value::{Value, ValueType};

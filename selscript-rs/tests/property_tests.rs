use std::path::Path;

use proptest::prelude::*;
use selscript::context::Context;
use selscript::script::expand::expand;
use selscript::script::lexer::{decode_escapes, split_line};
use selscript::script::parse::{parse, parse_duration};
use selscript::script::split::{split, Named};
use selscript::script::{Compiler, Registry, Value, ValueType};

proptest! {
    /// The tokenizer returns Ok or Err but never panics.
    #[test]
    fn lexer_does_not_panic(s in "\\PC*") {
        let _ = split_line(&s);
        let _ = decode_escapes(&s);
    }

    /// Compiling the same text twice gives the same tokens (or errors).
    #[test]
    fn compile_is_deterministic(lines in prop::collection::vec("[a-z@$# '\"-]{0,20}", 0..12)) {
        let text = lines.join("\n");
        let reg = Registry::standard();
        let compiler = Compiler::new(&reg);
        let a = compiler.compile_str("p.ss", &text, Path::new("."));
        let b = compiler.compile_str("p.ss", &text, Path::new("."));
        match (a, b) {
            (Ok(x), Ok(y)) => prop_assert_eq!(x, y),
            (Err(x), Err(y)) => prop_assert_eq!(x.to_string(), y.to_string()),
            _ => prop_assert!(false, "compile results differ"),
        }
    }

    /// Plain (non `--`) arguments come back as positionals, in order.
    #[test]
    fn splitter_preserves_positional_order(args in prop::collection::vec("[a-z0-9]{1,8}", 0..10)) {
        let (positional, named) = split(&args);
        prop_assert_eq!(positional, args);
        prop_assert!(named.is_empty());
    }

    /// A trailing `--name` with nothing after it is a flag.
    #[test]
    fn trailing_option_is_flag(name in "[a-z]{1,8}") {
        let (_, named) = split(&[format!("--{name}")]);
        prop_assert_eq!(named.get(&name), Some(&Named::Flag));
    }

    /// Integers survive auto parsing as integers.
    #[test]
    fn auto_parses_integers(n in any::<i64>()) {
        prop_assert_eq!(parse(&n.to_string(), ValueType::Auto).unwrap(), Value::Int(n));
    }

    /// Millisecond durations parse exactly.
    #[test]
    fn millisecond_durations(ms in 0u64..10_000_000) {
        let d = parse_duration(&format!("{ms}ms")).unwrap();
        prop_assert_eq!(d.as_millis() as u64, ms);
    }

    /// Text without `$` is never changed by interpolation.
    #[test]
    fn expand_without_dollar_is_identity(s in "[^$]*") {
        prop_assert_eq!(expand(&s, &Context::new()).unwrap(), s);
    }
}

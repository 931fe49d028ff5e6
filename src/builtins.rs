//! Global built-in functions (§4.7 inventory: `print`, `println`, `Str`,
//! `Typeof`, `input`, `Number`).
//!
//! Each entry is a plain `(&[Value]) -> RunResult<Value>` function wrapped as
//! a `FunctionObj::Builtin` by [`lookup`]; `LOAD_VAR` (§4.3.2) falls back to
//! this table when a name isn't bound in any enclosing frame. Arity is
//! declared alongside each entry and enforced by the VM before the handler
//! ever runs (§4.7 "a call with the wrong number of arguments raises an
//! exception before the built-in body runs"), so the bodies here trust
//! `args.len()` matches except where the entry is variadic (`arity == -1`).

use std::io::Write as _;

use crate::error::{ExceptionValue, RunError, RunResult};
use crate::operators::to_display_string;
use crate::value::{FunctionObj, Value};

/// One row of the global built-in table.
struct Entry {
    name: &'static str,
    arity: i32,
    func: crate::value::BuiltinFn,
}

const TABLE: &[Entry] = &[
    Entry { name: "print", arity: -1, func: builtin_print },
    Entry { name: "println", arity: -1, func: builtin_println },
    Entry { name: "Str", arity: -1, func: builtin_str },
    Entry { name: "Typeof", arity: 1, func: builtin_typeof },
    Entry { name: "input", arity: 1, func: builtin_input },
    Entry { name: "Number", arity: 1, func: builtin_number },
];

fn find(name: &str) -> Option<&'static Entry> {
    TABLE.iter().find(|e| e.name == name)
}

/// Whether `name` names a global built-in (used by `freevars.rs` so a
/// built-in's name is never treated as a free variable to capture).
pub fn is_builtin(name: &str) -> bool {
    find(name).is_some()
}

/// Resolves a built-in name to its callable value, for `LOAD_VAR`'s fallback
/// path. Returns `None` for anything not in the table.
pub fn lookup(name: &str) -> Option<Value> {
    let entry = find(name)?;
    Some(Value::Function(std::rc::Rc::new(FunctionObj::Builtin {
        name: entry.name,
        arity: entry.arity,
        func: entry.func,
    })))
}

fn builtin_print(args: &[Value]) -> RunResult<Value> {
    let mut out = std::io::stdout();
    for arg in args {
        let _ = write!(out, "{} ", to_display_string(arg));
    }
    let _ = out.flush();
    Ok(Value::Undefined)
}

fn builtin_println(args: &[Value]) -> RunResult<Value> {
    let mut out = std::io::stdout();
    for arg in args {
        let _ = write!(out, "{} ", to_display_string(arg));
    }
    let _ = writeln!(out);
    Ok(Value::Undefined)
}

fn builtin_str(args: &[Value]) -> RunResult<Value> {
    let mut s = String::new();
    for arg in args {
        s.push_str(&to_display_string(arg));
    }
    Ok(Value::string(s))
}

fn builtin_typeof(args: &[Value]) -> RunResult<Value> {
    let v = args.first().unwrap_or(&Value::Undefined);
    Ok(Value::string(v.type_name()))
}

fn builtin_input(args: &[Value]) -> RunResult<Value> {
    let prompt = args.first().unwrap_or(&Value::Undefined);
    print!("{}", to_display_string(prompt));
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| RunError::Fatal(format!("failed to read stdin: {e}")))?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(Value::string(line))
}

fn builtin_number(args: &[Value]) -> RunResult<Value> {
    match args.first().unwrap_or(&Value::Undefined) {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::String(s) => s.trim().parse::<f64>().map(Value::Number).map_err(|_| {
            RunError::Exception(ExceptionValue::with_message(
                "InvalidNumberFormat",
                format!("cannot convert '{s}' to a number"),
            ))
        }),
        other => Err(RunError::Exception(ExceptionValue::with_message(
            "InvalidNumberFormat",
            format!("cannot convert {} to a number", other.type_name()),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_builtin_recognizes_table_entries() {
        assert!(is_builtin("print"));
        assert!(is_builtin("Number"));
        assert!(!is_builtin("not_a_builtin"));
    }

    #[test]
    fn str_concatenates_string_forms() {
        let r = builtin_str(&[Value::Number(1.0), Value::string("x")]).unwrap();
        match r {
            Value::String(s) => assert_eq!(&*s, "1x"),
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn typeof_reports_type_name() {
        let r = builtin_typeof(&[Value::Number(1.0)]).unwrap();
        match r {
            Value::String(s) => assert_eq!(&*s, "number"),
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn number_parses_numeric_strings() {
        let r = builtin_number(&[Value::string("42")]).unwrap();
        assert!(matches!(r, Value::Number(n) if n == 42.0));
    }

    #[test]
    fn number_rejects_garbage_strings() {
        let r = builtin_number(&[Value::string("not a number")]);
        assert!(r.is_err());
    }
}

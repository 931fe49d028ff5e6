//! Binary arithmetic/bitwise/compare/logical operators (§3.1, §4.3.1).
//!
//! Each operator is a pure `(Value, Value) -> Value` function; `vm.rs` is
//! the only caller and owns popping/pushing the operand stack around it.
//! Type mismatches never fail the whole program (§4.3.1, §7 "type mismatches
//! in arithmetic ... yield a best-effort result") — they print a diagnostic
//! to stderr and produce `Value::Undefined`, the same best-effort behaviour
//! the source's `evaluate_operator.c` falls back to.

use crate::bytecode::BinOp;
use crate::value::{format_number, value_cmp, value_eq, Value};

/// Truncates an IEEE-754 double to a signed 32-bit integer the way the
/// source's integer-only operators do (§1 "truncate operands to signed
/// 32-bit", §3.1 "Non-goals").
fn truncate_i32(n: f64) -> i32 {
    if n.is_nan() || n.is_infinite() {
        0
    } else {
        n as i64 as i32
    }
}

fn bad_operand(op: &str, lhs: &Value, rhs: &Value) -> Value {
    eprintln!(
        "type mismatch: cannot apply '{op}' to {} and {}",
        lhs.type_name(),
        rhs.type_name()
    );
    Value::Undefined
}

fn num(b: bool) -> Value {
    Value::Number(if b { 1.0 } else { 0.0 })
}

/// Applies a binary operator per §3.1/§4.3.1. `DivisionByZero` is the one
/// arithmetic failure mode that *does* raise (§7 "runtime exceptions"
/// explicitly lists it) rather than falling back to a best-effort value, so
/// division returns a `Result` while every other operator cannot fail.
pub fn apply_binop(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, crate::error::RunError> {
    use BinOp::*;
    Ok(match op {
        Add => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::String(a), Value::String(b)) => Value::string(format!("{a}{b}")),
            _ => bad_operand("+", &lhs, &rhs),
        },
        Sub => numeric(&lhs, &rhs, "-", |a, b| a - b),
        Mul => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a * b),
            (Value::List(l), Value::Number(n)) | (Value::Number(n), Value::List(l)) => {
                let times = (*n as i64).max(0) as usize;
                let src = l.borrow();
                let mut out = Vec::with_capacity(src.len() * times);
                for _ in 0..times {
                    out.extend(src.iter().cloned());
                }
                Value::list(out)
            }
            _ => bad_operand("*", &lhs, &rhs),
        },
        Div => match (&lhs, &rhs) {
            (Value::Number(_), Value::Number(b)) if *b == 0.0 => {
                return Err(crate::error::RunError::division_by_zero())
            }
            (Value::Number(a), Value::Number(b)) => Value::Number(a / b),
            _ => bad_operand("/", &lhs, &rhs),
        },
        Mod => match (&lhs, &rhs) {
            (Value::Number(_), Value::Number(b)) if truncate_i32(*b) == 0 => {
                return Err(crate::error::RunError::division_by_zero())
            }
            (Value::Number(a), Value::Number(b)) => {
                Value::Number(truncate_i32(*a).wrapping_rem(truncate_i32(*b)) as f64)
            }
            _ => bad_operand("%", &lhs, &rhs),
        },
        Pow => numeric(&lhs, &rhs, "**", |a, b| a.powf(b)),
        BitAnd => int_op(&lhs, &rhs, "&", |a, b| a & b),
        BitOr => int_op(&lhs, &rhs, "|", |a, b| a | b),
        BitXor => int_op(&lhs, &rhs, "^", |a, b| a ^ b),
        Shl => int_op(&lhs, &rhs, "<<", |a, b| a.wrapping_shl(b as u32 & 31)),
        Shr => int_op(&lhs, &rhs, ">>", |a, b| a.wrapping_shr(b as u32 & 31)),
        Gt => num(value_cmp(&lhs, &rhs) == std::cmp::Ordering::Greater),
        Ge => num(value_cmp(&lhs, &rhs) != std::cmp::Ordering::Less),
        Lt => num(value_cmp(&lhs, &rhs) == std::cmp::Ordering::Less),
        Le => num(value_cmp(&lhs, &rhs) != std::cmp::Ordering::Greater),
        Eq => num(value_eq(&lhs, &rhs)),
        // §4.2.1: LogicalAnd/LogicalOr lower to these same primitive ops
        // rather than to short-circuit jumps; both operands are always
        // evaluated when the compiler emits a bare BinaryOp for them.
        LogicalAnd => num(lhs.truthy() && rhs.truthy()),
        LogicalOr => num(lhs.truthy() || rhs.truthy()),
    })
}

fn numeric(lhs: &Value, rhs: &Value, op: &str, f: impl Fn(f64, f64) -> f64) -> Value {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Value::Number(f(*a, *b)),
        _ => bad_operand(op, lhs, rhs),
    }
}

fn int_op(lhs: &Value, rhs: &Value, op: &str, f: impl Fn(i32, i32) -> i32) -> Value {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => {
            Value::Number(f(truncate_i32(*a), truncate_i32(*b)) as f64)
        }
        _ => bad_operand(op, lhs, rhs),
    }
}

/// Renders a value for string-concatenation/builtin purposes; kept here
/// (rather than only on `Value`) since operators are the main caller that
/// needs a plain string out of an arbitrary operand.
pub fn to_display_string(v: &Value) -> String {
    match v {
        Value::Number(n) => format_number(*n),
        other => other.to_print_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_numbers() {
        let r = apply_binop(BinOp::Add, Value::Number(1.0), Value::Number(2.0)).unwrap();
        assert!(matches!(r, Value::Number(n) if n == 3.0));
    }

    #[test]
    fn add_strings_concatenates() {
        let r = apply_binop(BinOp::Add, Value::string("a"), Value::string("b")).unwrap();
        match r {
            Value::String(s) => assert_eq!(&*s, "ab"),
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn div_by_zero_raises() {
        let r = apply_binop(BinOp::Div, Value::Number(1.0), Value::Number(0.0));
        assert!(r.is_err());
    }

    #[test]
    fn mod_truncates_to_i32() {
        // 5 % 3 == 2, matching ordinary integer modulus once truncated.
        let r = apply_binop(BinOp::Mod, Value::Number(5.0), Value::Number(3.0)).unwrap();
        assert!(matches!(r, Value::Number(n) if n == 2.0));
    }

    #[test]
    fn shift_wraps_at_32_bits() {
        let r = apply_binop(BinOp::Shl, Value::Number(1.0), Value::Number(31.0)).unwrap();
        assert!(matches!(r, Value::Number(n) if n == (1i32 << 31) as f64));
    }

    #[test]
    fn type_mismatch_yields_undefined_not_error() {
        let r = apply_binop(BinOp::Add, Value::Number(1.0), Value::string("x")).unwrap();
        assert!(matches!(r, Value::Undefined));
    }
}

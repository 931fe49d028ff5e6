//! Attribute built-ins: methods bound to `List`/`Map`/`Set`/`String` values
//! (§4.7, SPEC_FULL §4.7 inventory).
//!
//! `LOAD_ATTRIBUTE` (§4.3.2) on one of these types looks up `(type, name)`
//! in [`lookup`] and, when found, wraps the handler as a
//! `FunctionObj::AttributeBuiltin` bound to the receiver (§3.2) rather than
//! calling it immediately — the call only happens when the VM later executes
//! `FUNCTION_CALL` against that bound value, matching §4.7's two-registry
//! design ("if the handler is a method, wraps it as an attribute-built-in
//! function bound to the target").
//!
//! Every method here mutates its receiver in place where the inventory says
//! so (list/map/set are reference types, §3.1) and must not mutate the
//! `args` slice it's given, since built-ins "must not mutate arguments they
//! do not own" (§4.7).

use crate::error::{RunError, RunResult};
use crate::value::{MapObj, Value};

/// Native signature for an attribute built-in, once bound to its target
/// (§3.2 "Attribute built-in: a method bound to a target value").
pub type AttrFn = fn(&Value, &[Value]) -> RunResult<Value>;

/// Looks up the `(type, attribute-name)` registry (§4.7). Returns `None` for
/// an attribute this type doesn't define, which `vm.rs` turns into an
/// `AttributeError` (§9 "spec'ing it as a raisable exception is cleaner").
pub fn lookup(target: &Value, name: &str) -> Option<AttrFn> {
    match target {
        Value::List(_) => list_method(name),
        Value::Map(_) => map_method(name),
        Value::Set(_) => set_method(name),
        Value::String(_) => string_method(name),
        _ => None,
    }
}

fn bool_num(b: bool) -> Value {
    Value::Number(if b { 1.0 } else { 0.0 })
}

fn as_index(v: &Value, len: usize) -> RunResult<usize> {
    match v {
        Value::Number(n) => {
            let i = *n as i64;
            if i < 0 || i as usize >= len {
                Err(RunError::index_out_of_bounds(*n, len))
            } else {
                Ok(i as usize)
            }
        }
        other => Err(RunError::invalid_index_type(other)),
    }
}

// --- List ----------------------------------------------------------------

fn list_method(name: &str) -> Option<AttrFn> {
    match name {
        "append" => Some(list_append),
        "pop" => Some(list_pop),
        "popFirst" => Some(list_pop_first),
        "removeAt" => Some(list_remove_at),
        "remove" => Some(list_remove),
        "contains" => Some(list_contains),
        "length" => Some(list_length),
        _ => None,
    }
}

fn list_append(target: &Value, args: &[Value]) -> RunResult<Value> {
    let Value::List(l) = target else { unreachable!() };
    l.borrow_mut().push(args.first().cloned().unwrap_or(Value::Undefined));
    Ok(target.clone())
}

fn list_pop(target: &Value, _args: &[Value]) -> RunResult<Value> {
    let Value::List(l) = target else { unreachable!() };
    let mut l = l.borrow_mut();
    let len = l.len();
    l.pop()
        .ok_or_else(|| RunError::index_out_of_bounds(0.0, len))
}

fn list_pop_first(target: &Value, _args: &[Value]) -> RunResult<Value> {
    let Value::List(l) = target else { unreachable!() };
    let mut l = l.borrow_mut();
    if l.is_empty() {
        return Err(RunError::index_out_of_bounds(0.0, 0));
    }
    Ok(l.remove(0))
}

fn list_remove_at(target: &Value, args: &[Value]) -> RunResult<Value> {
    let Value::List(l) = target else { unreachable!() };
    let mut l = l.borrow_mut();
    let idx = as_index(args.first().unwrap_or(&Value::Undefined), l.len())?;
    Ok(l.remove(idx))
}

fn list_remove(target: &Value, args: &[Value]) -> RunResult<Value> {
    let Value::List(l) = target else { unreachable!() };
    let needle = args.first().unwrap_or(&Value::Undefined);
    let mut l = l.borrow_mut();
    if let Some(idx) = l.iter().position(|v| crate::value::value_eq(v, needle)) {
        l.remove(idx);
        Ok(bool_num(true))
    } else {
        Ok(bool_num(false))
    }
}

fn list_contains(target: &Value, args: &[Value]) -> RunResult<Value> {
    let Value::List(l) = target else { unreachable!() };
    let needle = args.first().unwrap_or(&Value::Undefined);
    Ok(bool_num(l.borrow().iter().any(|v| crate::value::value_eq(v, needle))))
}

fn list_length(target: &Value, _args: &[Value]) -> RunResult<Value> {
    let Value::List(l) = target else { unreachable!() };
    Ok(Value::Number(l.borrow().len() as f64))
}

// --- Map -------------------------------------------------------------------

fn map_method(name: &str) -> Option<AttrFn> {
    match name {
        "insert" => Some(map_insert),
        "remove" => Some(map_remove),
        "contains" => Some(map_contains),
        "keys" => Some(map_keys),
        "values" => Some(map_values),
        "length" => Some(map_length),
        _ => None,
    }
}

fn map_insert(target: &Value, args: &[Value]) -> RunResult<Value> {
    let Value::Map(m) = target else { unreachable!() };
    let key = args.first().cloned().unwrap_or(Value::Undefined);
    let value = args.get(1).cloned().unwrap_or(Value::Undefined);
    m.borrow_mut().insert(key, value);
    Ok(target.clone())
}

fn map_remove(target: &Value, args: &[Value]) -> RunResult<Value> {
    let Value::Map(m) = target else { unreachable!() };
    let key = args.first().unwrap_or(&Value::Undefined);
    Ok(m.borrow_mut().remove(key).unwrap_or(Value::Undefined))
}

fn map_contains(target: &Value, args: &[Value]) -> RunResult<Value> {
    let Value::Map(m) = target else { unreachable!() };
    let key = args.first().unwrap_or(&Value::Undefined);
    Ok(bool_num(m.borrow().get(key).is_some()))
}

fn map_keys(target: &Value, _args: &[Value]) -> RunResult<Value> {
    let Value::Map(m) = target else { unreachable!() };
    Ok(Value::list(m.borrow().entries.iter().map(|(k, _)| k.clone()).collect()))
}

fn map_values(target: &Value, _args: &[Value]) -> RunResult<Value> {
    let Value::Map(m) = target else { unreachable!() };
    Ok(Value::list(m.borrow().entries.iter().map(|(_, v)| v.clone()).collect()))
}

fn map_length(target: &Value, _args: &[Value]) -> RunResult<Value> {
    let Value::Map(m) = target else { unreachable!() };
    Ok(Value::Number(m.borrow().entries.len() as f64))
}

// --- Set -------------------------------------------------------------------

fn set_method(name: &str) -> Option<AttrFn> {
    match name {
        "add" => Some(set_add),
        "remove" => Some(set_remove),
        "contains" => Some(set_contains),
        "length" => Some(set_length),
        _ => None,
    }
}

fn set_add(target: &Value, args: &[Value]) -> RunResult<Value> {
    let Value::Set(s) = target else { unreachable!() };
    s.borrow_mut().insert(args.first().cloned().unwrap_or(Value::Undefined));
    Ok(target.clone())
}

fn set_remove(target: &Value, args: &[Value]) -> RunResult<Value> {
    let Value::Set(s) = target else { unreachable!() };
    let v = args.first().unwrap_or(&Value::Undefined);
    Ok(bool_num(s.borrow_mut().remove(v)))
}

fn set_contains(target: &Value, args: &[Value]) -> RunResult<Value> {
    let Value::Set(s) = target else { unreachable!() };
    let v = args.first().unwrap_or(&Value::Undefined);
    Ok(bool_num(s.borrow().contains(v)))
}

fn set_length(target: &Value, _args: &[Value]) -> RunResult<Value> {
    let Value::Set(s) = target else { unreachable!() };
    Ok(Value::Number(s.borrow().entries.len() as f64))
}

// --- String ------------------------------------------------------------

fn string_method(name: &str) -> Option<AttrFn> {
    match name {
        "length" => Some(string_length),
        _ => None,
    }
}

fn string_length(target: &Value, _args: &[Value]) -> RunResult<Value> {
    let Value::String(s) = target else { unreachable!() };
    Ok(Value::Number(s.chars().count() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_receiver_for_chaining() {
        let list = Value::list(vec![Value::Number(1.0)]);
        let f = lookup(&list, "append").unwrap();
        let out = f(&list, &[Value::Number(2.0)]).unwrap();
        let Value::List(l) = &out else { panic!() };
        assert_eq!(l.borrow().len(), 2);
    }

    #[test]
    fn map_insert_then_contains() {
        let map = Value::map(MapObj::default());
        let f = lookup(&map, "insert").unwrap();
        f(&map, &[Value::Number(1.0), Value::string("a")]).unwrap();
        let f = lookup(&map, "contains").unwrap();
        let r = f(&map, &[Value::Number(1.0)]).unwrap();
        assert!(matches!(r, Value::Number(n) if n == 1.0));
    }

    #[test]
    fn list_pop_empty_raises() {
        let list = Value::list(vec![]);
        let f = lookup(&list, "pop").unwrap();
        assert!(f(&list, &[]).is_err());
    }
}

use embervm::{Error, Limits, RunError, Sandbox, Value};

fn num(sandbox: &mut Sandbox, src: &str) -> f64 {
    match sandbox.run(src).unwrap() {
        Value::Number(n) => n,
        other => panic!("expected a number, got {}", other.to_print_string()),
    }
}

fn text(sandbox: &mut Sandbox, src: &str) -> String {
    match sandbox.run(src).unwrap() {
        Value::String(s) => s.to_string(),
        other => panic!("expected a string, got {}", other.to_print_string()),
    }
}

#[test]
fn recursive_function() {
    let mut sandbox = Sandbox::new();
    let result = num(
        &mut sandbox,
        "func fib(n) { if (n < 2) { return n; } return fib(n-1) + fib(n-2); } return fib(10);",
    );
    assert_eq!(result, 55.0);
}

#[test]
fn closure_over_loop_variable() {
    let mut sandbox = Sandbox::new();
    let result = num(
        &mut sandbox,
        r#"
        let fns = [];
        let i = 0;
        while (i < 3) {
            let j = i;
            fns = fns -> append(func () { return j; });
            i = i + 1;
        }
        return fns[0]() * 100 + fns[1]() * 10 + fns[2]();
        "#,
    );
    assert_eq!(result, 12.0);
}

#[test]
fn try_catch_selects_matching_exception() {
    let mut sandbox = Sandbox::new();
    let result = text(
        &mut sandbox,
        r#"
        exception E1;
        exception E2;
        let result = "none";
        try {
            raise E1;
        } catch (E2) {
            result = "no";
        } catch (E1) {
            result = "yes";
        }
        return result;
        "#,
    );
    assert_eq!(result, "yes");
}

#[test]
fn map_assignment_is_visible_through_an_alias() {
    let mut sandbox = Sandbox::new();
    let result = text(
        &mut sandbox,
        r#"let m = map { 1: "a" }; let n = m; n[1] = "b"; return m[1];"#,
    );
    assert_eq!(result, "b");
}

#[test]
fn break_and_continue_fix_up_correctly() {
    let mut sandbox = Sandbox::new();
    let result = num(
        &mut sandbox,
        r#"
        let s = 0;
        let i = 0;
        while (i < 10) {
            i = i + 1;
            if (i == 5) { continue; }
            if (i == 8) { break; }
            s = s + i;
        }
        return s;
        "#,
    );
    assert_eq!(result, 23.0);
}

#[test]
fn class_attribute_visibility() {
    let mut sandbox = Sandbox::new();
    let result = num(
        &mut sandbox,
        "class C(x) { let y = x + 1; private let z = 99; } let c = C(4); return c->y;",
    );
    assert_eq!(result, 5.0);

    let err = sandbox
        .run("class C(x) { let y = x + 1; private let z = 99; } let c = C(4); return c->z;")
        .unwrap_err();
    match err {
        Error::Run(RunError::Exception(e)) => assert_eq!(e.name, "AttributeError"),
        other => panic!("expected an AttributeError, got {other:?}"),
    }
}

#[test]
fn list_literal_and_indexing() {
    let mut sandbox = Sandbox::new();
    let result = num(&mut sandbox, "let xs = [10, 20, 30]; return xs[1];");
    assert_eq!(result, 20.0);
}

#[test]
fn list_index_out_of_bounds_raises() {
    let mut sandbox = Sandbox::new();
    let err = sandbox.run("let xs = [1, 2]; return xs[5];").unwrap_err();
    match err {
        Error::Run(RunError::Exception(e)) => assert_eq!(e.name, "IndexOutOfBounds"),
        other => panic!("expected IndexOutOfBounds, got {other:?}"),
    }
}

#[test]
fn set_index_is_membership_lookup() {
    let mut sandbox = Sandbox::new();
    assert_eq!(num(&mut sandbox, "let s = set { 1, 2, 3 }; return s[2];"), 2.0);

    let err = sandbox.run("let s = set { 1, 2, 3 }; return s[9];").unwrap_err();
    match err {
        Error::Run(RunError::Exception(e)) => assert_eq!(e.name, "KeyError"),
        other => panic!("expected KeyError, got {other:?}"),
    }
}

#[test]
fn division_by_zero_is_catchable() {
    let mut sandbox = Sandbox::new();
    let result = num(
        &mut sandbox,
        "let result = 0; try { result = 1 / 0; } catch { result = -1; } return result;",
    );
    assert_eq!(result, -1.0);
}

#[test]
fn exception_constructor_carries_a_custom_message() {
    let mut sandbox = Sandbox::new();
    let result = sandbox
        .run(
            r#"
            exception Oops;
            let caught = null;
            try {
                raise Oops("bad input");
            } catch (Oops, e) {
                caught = e;
            }
            return caught;
            "#,
        )
        .unwrap();
    match result {
        Value::Exception(e) => {
            assert_eq!(e.name, "Oops");
            assert_eq!(e.message.as_deref(), Some("bad input"));
        }
        other => panic!("expected an exception value, got {}", other.to_print_string()),
    }
}

#[test]
fn uncaught_exception_propagates_out_of_run() {
    let mut sandbox = Sandbox::new();
    let err = sandbox.run("exception Boom; raise Boom;").unwrap_err();
    match err {
        Error::Run(RunError::Exception(e)) => assert_eq!(e.name, "Boom"),
        other => panic!("expected Boom, got {other:?}"),
    }
}

#[test]
fn undefined_variable_raises_name_error() {
    let mut sandbox = Sandbox::new();
    let err = sandbox.run("return missing_thing;").unwrap_err();
    assert!(err.to_string().contains("not defined"));
}

#[test]
fn compile_errors_report_a_line_number() {
    let mut sandbox = Sandbox::new();
    let err = sandbox.run("break;").unwrap_err();
    assert!(matches!(err, Error::Compile(_)));
}

#[test]
fn instruction_limit_is_enforced() {
    let mut sandbox = Sandbox::new();
    sandbox.limit(Limits {
        instruction_limit: Some(100),
        recursion_limit: None,
    });

    let err = sandbox
        .run("let i = 0; while (i < 1000000) { i = i + 1; } return i;")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Run(RunError::InstructionLimitExceeded(100))
    ));
}

#[test]
fn recursion_limit_is_enforced() {
    let mut sandbox = Sandbox::new();
    sandbox.limit(Limits {
        instruction_limit: None,
        recursion_limit: Some(10),
    });

    let err = sandbox
        .run("func recurse(n) { return recurse(n + 1); } return recurse(0);")
        .unwrap_err();
    assert!(matches!(err, Error::Run(RunError::StackOverflow(10))));
}

#[test]
fn resource_limit_is_not_catchable() {
    let mut sandbox = Sandbox::new();
    sandbox.limit(Limits {
        instruction_limit: Some(50),
        recursion_limit: None,
    });

    let err = sandbox
        .run("try { let i = 0; while (1) { i = i + 1; } } catch { return -1; }")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Run(RunError::InstructionLimitExceeded(50))
    ));
}

#[test]
fn state_resets_between_runs() {
    let mut sandbox = Sandbox::new();
    assert_eq!(num(&mut sandbox, "return 1;"), 1.0);
    assert_eq!(num(&mut sandbox, "return 2;"), 2.0);
}

#[test]
fn break_from_try_does_not_leak_its_handler() {
    let mut sandbox = Sandbox::new();
    let err = sandbox
        .run(
            r#"
            exception E;
            let i = 0;
            while (i < 3) {
                try {
                    if (i == 1) { break; }
                } catch (E) { }
                i = i + 1;
            }
            raise E;
            "#,
        )
        .unwrap_err();
    // The `break` must leave no stale handler behind — this `raise` has no
    // enclosing `try` left at the point it runs, so it should escape `run`
    // rather than being caught by the dead loop's handler.
    match err {
        Error::Run(RunError::Exception(e)) => assert_eq!(e.name, "E"),
        other => panic!("expected E to escape uncaught, got {other:?}"),
    }
}

#[test]
fn continue_from_try_does_not_leak_its_handler() {
    let mut sandbox = Sandbox::new();
    let err = sandbox
        .run(
            r#"
            exception E;
            let i = 0;
            while (i < 3) {
                i = i + 1;
                try {
                    if (i == 1) { continue; }
                } catch (E) { }
            }
            raise E;
            "#,
        )
        .unwrap_err();
    match err {
        Error::Run(RunError::Exception(e)) => assert_eq!(e.name, "E"),
        other => panic!("expected E to escape uncaught, got {other:?}"),
    }
}

#[test]
fn logical_and_eagerly_evaluates_its_right_operand() {
    let mut sandbox = Sandbox::new();
    let result = num(
        &mut sandbox,
        r#"
        let calls = 0;
        func f() { calls = calls + 1; return 1; }
        let x = 0 && f();
        return calls;
        "#,
    );
    // `&&` lowers to an eager primitive op, not a short-circuit jump, so
    // `f()` must run even though the left operand is already falsy.
    assert_eq!(result, 1.0);
}

#[test]
fn logical_or_eagerly_evaluates_its_right_operand() {
    let mut sandbox = Sandbox::new();
    let result = num(
        &mut sandbox,
        r#"
        let calls = 0;
        func f() { calls = calls + 1; return 1; }
        let x = 1 || f();
        return calls;
        "#,
    );
    assert_eq!(result, 1.0);
}

#[test]
fn map_lookup_uses_deep_equality_not_identity() {
    let mut sandbox = Sandbox::new();
    let result = text(
        &mut sandbox,
        r#"let m = map { "a": "first" }; m["a"] = "second"; return m["a"];"#,
    );
    assert_eq!(result, "second");
}

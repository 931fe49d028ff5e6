//! The stack-based bytecode virtual machine (§4.3–§4.6).
//!
//! [`Vm::run`] is a single fetch-decode-execute loop over one frame stack: it
//! fetches the current frame's next `Op`, dispatches it in [`Vm::dispatch`],
//! and either continues, pushes/pops a frame, or unwinds into the
//! exception-handler stack. Everything the VM needs to execute an opcode
//! — the operand stack, the frame stack, the handler stack, the "raised"
//! slot, and the GC's heap registry — lives on `Vm` itself; `compiler.rs`,
//! `bytecode.rs` and `value.rs` only describe *what* to execute, never *how*.

use std::rc::Rc;

use crate::builtins;
use crate::bytecode::{Access, CodeObject, FunctionTemplate, Op};
use crate::error::{ExceptionValue, RunError, RunResult};
use crate::gc::GarbageCollector;
use crate::methods;
use crate::operators::{apply_binop, to_display_string};
use crate::value::{ClassObj, FunctionObj, MapObj, SetObj, UserFunction, Value};

/// Resource bounds for one [`Vm::run`] call (§4.5, §4.6, §9 "a target-language
/// port should generalise the sandbox's instruction/recursion limits to bound
/// the VM directly").
#[derive(Debug, Clone, Default)]
pub struct Limits {
    pub instruction_limit: Option<u64>,
    pub recursion_limit: Option<usize>,
}

/// An installed `try` handler (§4.3.6): where to resume, and how much of the
/// frame/operand stacks to discard on the way there.
struct Handler {
    frame_depth: usize,
    stack_depth: usize,
    target: usize,
}

/// One call frame's local state: its code, instruction pointer, and a
/// shadow-capable variable table.
///
/// `variables` is a stack, not a map, on purpose: `CreateVar` always pushes a
/// fresh entry even when a name is already bound, so a nested scope (a `let`
/// inside a block, a catch-clause bind, the compiler's `$assign` hidden temp)
/// can shadow an outer binding of the same name without disturbing it.
/// `LoadVar`/`StoreVar`/`DerefVar` all search from the end — innermost wins.
struct Frame {
    code: Rc<CodeObject>,
    ip: usize,
    variables: Vec<(String, Access, Value)>,
    /// The function/class name this frame is executing, used by
    /// `CreateObjectReturn` to name the resulting `ClassObj`.
    name: Option<String>,
}

impl Frame {
    fn new(code: Rc<CodeObject>, name: Option<String>) -> Self {
        Self { code, ip: 0, variables: Vec::new(), name }
    }

    fn find(&self, name: &str) -> Option<&Value> {
        self.variables.iter().rev().find(|(n, _, _)| n == name).map(|(_, _, v)| v)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.variables.iter_mut().rev().find(|(n, _, _)| n == name).map(|(_, _, v)| v)
    }

    fn bind(&mut self, name: String, access: Access, value: Value) {
        self.variables.push((name, access, value));
    }

    /// Unbinds the most recently bound entry named `name`; a no-op if absent
    /// (`DerefVar` on an already-cleared slot is a documented no-op, §8.1).
    fn unbind_last(&mut self, name: &str) {
        if let Some(pos) = self.variables.iter().rposition(|(n, _, _)| n == name) {
            self.variables.remove(pos);
        }
    }
}

/// The virtual machine (§4.3). Holds no source-level state at all — only
/// `Vm::run`'s caller decides what `CodeObject` to execute.
pub struct Vm {
    stack: Vec<Value>,
    frames: Vec<Frame>,
    handlers: Vec<Handler>,
    raised: Option<Value>,
    gc: GarbageCollector,
    instruction_count: u64,
    limits: Limits,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            frames: Vec::new(),
            handlers: Vec::new(),
            raised: None,
            gc: GarbageCollector::new(),
            instruction_count: 0,
            limits: Limits::default(),
        }
    }

    pub fn set_limits(&mut self, limits: Limits) {
        self.limits = limits;
    }

    pub fn collections_run(&self) -> u64 {
        self.gc.collections_run
    }

    /// Executes `code` from a clean operand/frame/handler state, returning the
    /// value `ExitProgram` (or an empty top-level `Return`) produced (§4.3.3,
    /// §6.2 "exit code = the value consumed by EXIT_PROGRAM").
    pub fn run(&mut self, code: Rc<CodeObject>) -> RunResult<Value> {
        self.instruction_count = 0;
        self.stack.clear();
        self.frames.clear();
        self.handlers.clear();
        self.raised = None;
        self.frames.push(Frame::new(code, None));

        let result = self.drive();
        self.gc.sweep_all();
        result
    }

    fn drive(&mut self) -> RunResult<Value> {
        loop {
            let Some(frame) = self.frames.last() else {
                return Ok(self.stack.pop().unwrap_or(Value::Undefined));
            };
            if frame.ip >= frame.code.len() {
                // A function body compiled without a terminal return only
                // happens for the top-level program, which always ends in
                // ExitProgram; reaching this defensively treats it as an
                // implicit `return undefined;`.
                if let Some(v) = self.pop_frame_with(Value::Undefined) {
                    return Ok(v);
                }
                continue;
            }

            let code = frame.code.clone();
            let ip = frame.ip;
            self.frames.last_mut().unwrap().ip += 1;

            self.instruction_count += 1;
            if let Some(limit) = self.limits.instruction_limit {
                if self.instruction_count > limit {
                    return Err(RunError::InstructionLimitExceeded(limit));
                }
            }
            if self.instruction_count % 64 == 0 {
                self.collect_garbage();
            }

            let op = code.instructions[ip].clone();
            match self.dispatch(&code, op) {
                Ok(Some(final_value)) => return Ok(final_value),
                Ok(None) => {}
                Err(err) => {
                    if !err.is_catchable() {
                        return Err(err);
                    }
                    let RunError::Exception(ev) = err else { unreachable!() };
                    if let Some(fatal) = self.raise(Value::Exception(ev)) {
                        return Err(fatal);
                    }
                }
            }
        }
    }

    fn collect_garbage(&mut self) {
        let stack = &self.stack;
        let frames = &self.frames;
        let raised = &self.raised;
        let roots = stack
            .iter()
            .chain(frames.iter().flat_map(|f| f.variables.iter().map(|(_, _, v)| v)))
            .chain(raised.iter());
        self.gc.maybe_collect(roots);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::Undefined)
    }

    fn pop_n(&mut self, n: usize) -> Vec<Value> {
        let at = self.stack.len().saturating_sub(n);
        self.stack.split_off(at)
    }

    /// Relative jump against the current frame's *already-advanced* `ip`
    /// (§3.3 "offsets are relative to the instruction following the jump").
    fn jump(&mut self, k: i32) {
        let frame = self.frames.last_mut().unwrap();
        frame.ip = (frame.ip as i32 + k) as usize;
    }

    /// Pops the current frame and hands `v` to whoever's below it: the
    /// caller's operand stack, or — if this was the last frame — the overall
    /// result of `run`. Also drops any exception handler that belonged to a
    /// frame deeper than what remains, so a stale handler never gets matched
    /// against a later, unrelated raise.
    fn pop_frame_with(&mut self, v: Value) -> Option<Value> {
        self.frames.pop();
        self.handlers.retain(|h| h.frame_depth <= self.frames.len());
        if self.frames.is_empty() {
            Some(v)
        } else {
            self.stack.push(v);
            None
        }
    }

    /// Dispatches one instruction against `code`'s constant/name/function
    /// pools. Returns `Ok(Some(v))` only when the whole program is finished
    /// (`ExitProgram`, or the outermost frame's `FunctionReturn*`/
    /// `CreateObjectReturn`).
    fn dispatch(&mut self, code: &CodeObject, op: Op) -> RunResult<Option<Value>> {
        match op {
            Op::LoadConst(i) => self.stack.push(code.constants[i as usize].clone()),
            Op::LoadVar(i) => {
                let name = &code.names[i as usize];
                let value = self
                    .frames
                    .last()
                    .unwrap()
                    .find(name)
                    .cloned()
                    .or_else(|| builtins::lookup(name));
                match value {
                    Some(v) => self.stack.push(v),
                    None => return Err(RunError::NameError(name.clone())),
                }
            }
            Op::StoreVar(i) => {
                let name = code.names[i as usize].clone();
                let v = self.pop();
                match self.frames.last_mut().unwrap().find_mut(&name) {
                    Some(slot) => *slot = v,
                    None => return Err(RunError::NameError(name)),
                }
            }
            Op::CreateVar(i, access) => {
                let name = code.names[i as usize].clone();
                let v = self.pop();
                self.frames.last_mut().unwrap().bind(name, access, v);
            }
            Op::DerefVar(i) => {
                let name = code.names[i as usize].clone();
                self.frames.last_mut().unwrap().unbind_last(&name);
            }
            Op::LoadAttribute(i) => {
                let name = code.names[i as usize].clone();
                let target = self.pop();
                let v = self.load_attribute(&target, &name)?;
                self.stack.push(v);
            }
            Op::LoadIndex => {
                let index = self.pop();
                let target = self.pop();
                let v = self.load_index(&target, &index)?;
                self.stack.push(v);
            }
            Op::StoreAttribute(i) => {
                let name = code.names[i as usize].clone();
                let value = self.pop();
                let target = self.pop();
                self.store_attribute(&target, &name, value)?;
            }
            Op::StoreIndex => {
                let value = self.pop();
                let index = self.pop();
                let target = self.pop();
                self.store_index(&target, &index, value)?;
            }
            Op::CreateList(n) => {
                let items = self.pop_n(n as usize);
                let v = Value::list(items);
                if let Value::List(rc) = &v {
                    self.gc.register_list(rc);
                }
                self.stack.push(v);
            }
            Op::CreateSet(n) => {
                let items = self.pop_n(n as usize);
                let mut set = SetObj::default();
                for item in items {
                    set.insert(item);
                }
                let v = Value::set(set);
                if let Value::Set(rc) = &v {
                    self.gc.register_set(rc);
                }
                self.stack.push(v);
            }
            Op::CreateMap(n) => {
                let pairs = self.pop_n(n as usize * 2);
                let mut map = MapObj::default();
                let mut iter = pairs.into_iter();
                while let Some(k) = iter.next() {
                    let v = iter.next().unwrap_or(Value::Undefined);
                    map.insert(k, v);
                }
                let v = Value::map(map);
                if let Value::Map(rc) = &v {
                    self.gc.register_map(rc);
                }
                self.stack.push(v);
            }
            Op::CreateFunction(i) => {
                let template = code.functions[i as usize].clone();
                let closure_slots = self.resolve_closure(&template)?;
                let user = UserFunction {
                    name: template.name.clone(),
                    params: template.params.clone(),
                    closure_names: template.closure_names.clone(),
                    body: template.body.clone(),
                    file: template.file.clone(),
                    closure_slots,
                };
                self.stack.push(Value::Function(Rc::new(FunctionObj::User(user))));
            }
            Op::FunctionCall(n) => {
                let args = self.pop_n(n as usize);
                let callee = self.pop();
                self.call(callee, args)?;
            }
            Op::FunctionReturn => {
                let v = self.pop();
                if let Some(v) = self.pop_frame_with(v) {
                    return Ok(Some(v));
                }
            }
            Op::FunctionReturnUndefined => {
                if let Some(v) = self.pop_frame_with(Value::Undefined) {
                    return Ok(Some(v));
                }
            }
            Op::CreateObjectReturn => {
                let frame = self.frames.last().unwrap();
                let attrs = frame
                    .variables
                    .iter()
                    .filter(|(_, access, _)| *access == Access::Public)
                    .map(|(n, _, v)| (n.clone(), v.clone()))
                    .collect();
                let name = frame.name.clone().unwrap_or_default();
                let v = Value::class(ClassObj { name, attrs });
                if let Value::Class(rc) = &v {
                    self.gc.register_class(rc);
                }
                if let Some(v) = self.pop_frame_with(v) {
                    return Ok(Some(v));
                }
            }
            Op::ExitProgram => return Ok(Some(self.pop())),
            Op::OffsetJump(k) => self.jump(k),
            Op::OffsetJumpIfTruePop(k) => {
                let v = self.pop();
                if v.truthy() {
                    self.jump(k);
                }
            }
            Op::OffsetJumpIfFalsePop(k) => {
                let v = self.pop();
                if !v.truthy() {
                    self.jump(k);
                }
            }
            Op::OffsetJumpIfTrueNoPop(k) => {
                if self.stack.last().is_some_and(Value::truthy) {
                    self.jump(k);
                }
            }
            Op::OffsetJumpIfFalseNoPop(k) => {
                if !self.stack.last().is_some_and(Value::truthy) {
                    self.jump(k);
                }
            }
            Op::AbsoluteJump(p) => self.frames.last_mut().unwrap().ip = p as usize,
            Op::PopStack => {
                self.pop();
            }
            Op::BinaryOp(op) => {
                let rhs = self.pop();
                let lhs = self.pop();
                self.stack.push(apply_binop(op, lhs, rhs)?);
            }
            Op::LogicalNot => {
                let v = self.pop();
                self.stack.push(Value::Number(if v.truthy() { 0.0 } else { 1.0 }));
            }
            Op::CreateException(i, access) => {
                let name = code.names[i as usize].clone();
                let v = self.raised.clone().unwrap_or(Value::Undefined);
                self.frames.last_mut().unwrap().bind(name, access, v);
            }
            Op::PushExceptionHandler(k) => {
                let target = (self.frames.last().unwrap().ip as i32 + k) as usize;
                self.handlers.push(Handler {
                    frame_depth: self.frames.len(),
                    stack_depth: self.stack.len(),
                    target,
                });
            }
            Op::PopExceptionHandler => {
                self.handlers.pop();
            }
            // Both of these hand their exception back as a plain `Err` rather
            // than calling `self.raise` directly — `drive`'s catch-all error
            // handling is the single place that walks the handler stack, so
            // every path that can fail (an explicit raise, a re-raise here,
            // or an ordinary `?` from `operators`/`methods`) unwinds exactly
            // the same way.
            Op::RaiseException => {
                let v = self.pop();
                return Err(RunError::Exception(as_exception(v)));
            }
            Op::RaiseExceptionIfCompareExceptionFalse => {
                let selector = self.pop();
                if !self.matches_raised(&selector) {
                    let current = self
                        .raised
                        .clone()
                        .expect("RaiseExceptionIfCompareExceptionFalse runs only while dispatching a catch chain");
                    let Value::Exception(ev) = current else {
                        unreachable!("the raised slot only ever holds Value::Exception")
                    };
                    return Err(RunError::Exception(ev));
                }
            }
            Op::OffsetJumpIfCompareExceptionFalse(k) => {
                let selector = self.pop();
                if !self.matches_raised(&selector) {
                    self.jump(k);
                }
            }
            Op::ResolveRaisedException => self.raised = None,
        }
        Ok(None)
    }

    /// Whether `selector` names the exception currently in the "raised" slot
    /// (§4.3.6 "compare-then-fall-through"). Selectors compare by exception
    /// name only — the source's `catch (E)` matches any message.
    fn matches_raised(&self, selector: &Value) -> bool {
        match (&self.raised, selector) {
            (Some(Value::Exception(raised)), Value::Exception(sel)) => raised.name == sel.name,
            _ => false,
        }
    }

    /// Raises `v` (already known to be a `Value::Exception`): unwinds frames
    /// and the operand stack to the innermost handler whose recorded depths
    /// it can discard down to, and resumes there with the value parked in
    /// `self.raised`. Returns `Some(err)` only when no handler remains —
    /// i.e. the exception escapes `run` entirely (§4.3.6 "if the handler
    /// stack empties, abort with the exception").
    fn raise(&mut self, v: Value) -> Option<RunError> {
        let Value::Exception(ev) = &v else {
            unreachable!("raise is only ever called with Value::Exception")
        };
        let Some(handler) = self.handlers.pop() else {
            return Some(RunError::Exception(ev.clone()));
        };
        self.frames.truncate(handler.frame_depth);
        self.stack.truncate(handler.stack_depth);
        self.frames.last_mut().unwrap().ip = handler.target;
        self.raised = Some(v);
        None
    }

    fn resolve_closure(&self, template: &FunctionTemplate) -> RunResult<Vec<Value>> {
        let frame = self.frames.last().unwrap();
        template
            .closure_names
            .iter()
            .map(|name| {
                frame
                    .find(name)
                    .cloned()
                    .or_else(|| builtins::lookup(name))
                    .ok_or_else(|| RunError::NameError(name.clone()))
            })
            .collect()
    }

    fn load_attribute(&self, target: &Value, name: &str) -> RunResult<Value> {
        if let Value::Class(c) = target {
            if let Some(v) = c.borrow().get(name) {
                return Ok(v);
            }
            return Err(RunError::attribute_error(name));
        }
        if let Some(func) = methods::lookup(target, name) {
            return Ok(Value::Function(Rc::new(FunctionObj::AttributeBuiltin {
                name: name.to_string(),
                target: target.clone(),
                func,
            })));
        }
        Err(RunError::attribute_error(name))
    }

    fn store_attribute(&self, target: &Value, name: &str, value: Value) -> RunResult<()> {
        match target {
            Value::Class(c) => {
                c.borrow_mut().set(name, value);
                Ok(())
            }
            other => Err(RunError::attribute_error_on(name, other)),
        }
    }

    /// `LOAD_INDEX` (§4.3.4): list indexing is bounds-checked numeric access,
    /// map indexing is a key lookup, and set indexing is membership — the
    /// pushed value is the tested element itself once it's confirmed present,
    /// so `set[x]` reads naturally as "the `x` that's in here".
    fn load_index(&self, target: &Value, index: &Value) -> RunResult<Value> {
        match target {
            Value::List(l) => {
                let l = l.borrow();
                let i = list_index(index, l.len())?;
                Ok(l[i].clone())
            }
            Value::Map(m) => m.borrow().get(index).cloned().ok_or_else(|| RunError::key_error(index)),
            Value::Set(s) => {
                if s.borrow().contains(index) {
                    Ok(index.clone())
                } else {
                    Err(RunError::key_error(index))
                }
            }
            other => Err(RunError::non_indexible(other)),
        }
    }

    /// `STORE_INDEX` (§4.3.4): list/map only — sets have no positional slot
    /// to assign into, so indexing one for a store raises the same
    /// `NonIndexibleObject` a non-container target would.
    fn store_index(&self, target: &Value, index: &Value, value: Value) -> RunResult<()> {
        match target {
            Value::List(l) => {
                let mut l = l.borrow_mut();
                let i = list_index(index, l.len())?;
                l[i] = value;
                Ok(())
            }
            Value::Map(m) => {
                m.borrow_mut().insert(index.clone(), value);
                Ok(())
            }
            other => Err(RunError::non_indexible(other)),
        }
    }

    fn call(&mut self, callee: Value, args: Vec<Value>) -> RunResult<()> {
        match callee {
            Value::Function(f) => match f.as_ref() {
                FunctionObj::User(u) => self.call_user(u, args),
                FunctionObj::Builtin { name, arity, func } => {
                    check_arity(name, *arity, args.len())?;
                    let v = func(&args)?;
                    self.stack.push(v);
                    Ok(())
                }
                FunctionObj::AttributeBuiltin { target, func, .. } => {
                    let v = func(target, &args)?;
                    self.stack.push(v);
                    Ok(())
                }
            },
            // `raise Oops("message");` calls a bare exception value as a
            // constructor rather than an ordinary function (§4.2.3): the
            // first argument becomes the message on a fresh exception of the
            // same name.
            Value::Exception(ev) => {
                let result = match args.first() {
                    Some(arg) => ExceptionValue::with_message(ev.name.clone(), to_display_string(arg)),
                    None => ev,
                };
                self.stack.push(Value::Exception(result));
                Ok(())
            }
            other => Err(RunError::Exception(ExceptionValue::with_message(
                "NotCallable",
                format!("{} is not callable", other.type_name()),
            ))),
        }
    }

    /// Invokes a user function (§4.3.3): a fresh frame binds the closure
    /// slots, then the parameters, then — last, so it wins any name clash —
    /// the function's own name to a shallow copy of itself, so a named
    /// function can call itself by name without relying on an outer binding
    /// ("the function's own name to a shallow copy of itself", §4.3.3).
    fn call_user(&mut self, u: &UserFunction, args: Vec<Value>) -> RunResult<()> {
        if args.len() != u.params.len() {
            return Err(RunError::Exception(ExceptionValue::with_message(
                "ArityError",
                format!(
                    "'{}' expects {} argument(s), got {}",
                    u.name.as_deref().unwrap_or("<anonymous>"),
                    u.params.len(),
                    args.len(),
                ),
            )));
        }
        if let Some(limit) = self.limits.recursion_limit {
            if self.frames.len() >= limit {
                return Err(RunError::StackOverflow(limit));
            }
        }

        let mut frame = Frame::new(u.body.clone(), u.name.clone());
        for (name, value) in u.closure_names.iter().zip(u.closure_slots.iter()) {
            frame.bind(name.clone(), Access::Private, value.clone());
        }
        for (name, value) in u.params.iter().zip(args) {
            frame.bind(name.clone(), Access::Private, value);
        }
        if let Some(name) = &u.name {
            frame.bind(
                name.clone(),
                Access::Private,
                Value::Function(Rc::new(FunctionObj::User(UserFunction {
                    name: u.name.clone(),
                    params: u.params.clone(),
                    closure_names: u.closure_names.clone(),
                    body: u.body.clone(),
                    file: u.file.clone(),
                    closure_slots: u.closure_slots.clone(),
                }))),
            );
        }
        self.frames.push(frame);
        Ok(())
    }
}

fn list_index(index: &Value, len: usize) -> RunResult<usize> {
    match index {
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

fn check_arity(name: &str, arity: i32, got: usize) -> RunResult<()> {
    if arity >= 0 && got != arity as usize {
        return Err(RunError::Exception(ExceptionValue::with_message(
            "ArityError",
            format!("'{name}' expects {arity} argument(s), got {got}"),
        )));
    }
    Ok(())
}

/// Converts whatever a `raise` statement evaluated to into the exception
/// value that gets parked in the "raised" slot. A bare exception identifier
/// (`raise Oops;`, no constructor call) is already a `Value::Exception`; any
/// other value is wrapped as a generic runtime exception carrying its printed
/// form as the message, rather than refusing to raise at all.
fn as_exception(v: Value) -> ExceptionValue {
    match v {
        Value::Exception(ev) => ev,
        other => ExceptionValue::with_message("RuntimeError", to_display_string(&other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_program;
    use crate::parser::parse;

    fn run_source(src: &str) -> Value {
        let program = parse(src).expect("parse");
        let code = compile_program(&program, Rc::from("test")).expect("compile");
        let mut vm = Vm::new();
        vm.run(Rc::new(code)).expect("run")
    }

    fn run_source_err(src: &str) -> RunError {
        let program = parse(src).expect("parse");
        let code = compile_program(&program, Rc::from("test")).expect("compile");
        let mut vm = Vm::new();
        vm.run(Rc::new(code)).expect_err("expected a run error")
    }

    #[test]
    fn recursive_function_computes_fibonacci() {
        let v = run_source(
            "func fib(n) { if (n < 2) { return n; } return fib(n - 1) + fib(n - 2); } return fib(10);",
        );
        assert!(matches!(v, Value::Number(n) if n == 55.0));
    }

    #[test]
    fn closures_capture_distinct_loop_bindings() {
        let v = run_source(
            "let fns = []; let i = 0; \
             while (i < 3) { let j = i; fns = fns->append(func () { return j; }); i = i + 1; } \
             return fns[0]() * 100 + fns[1]() * 10 + fns[2]();",
        );
        assert!(matches!(v, Value::Number(n) if n == 12.0));
    }

    #[test]
    fn try_catch_selects_matching_exception() {
        let v = run_source(
            "exception E1; exception E2; \
             let result = 0; \
             try { raise E1; } catch (E2) { result = 1; } catch (E1) { result = 2; } \
             return result;",
        );
        assert!(matches!(v, Value::Number(n) if n == 2.0));
    }

    #[test]
    fn uncaught_exception_propagates_out_of_run() {
        let err = run_source_err("exception Boom; raise Boom;");
        assert!(matches!(err, RunError::Exception(ev) if ev.name == "Boom"));
    }

    #[test]
    fn reference_types_alias_through_assignment() {
        let v = run_source("let m = map { 1: \"a\" }; let n = m; n[1] = \"b\"; return m[1];");
        match v {
            Value::String(s) => assert_eq!(&*s, "b"),
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn class_constructor_hides_params_and_private_attrs() {
        let v = run_source(
            "class C(x) { let y = x + 1; private let z = 99; } let c = C(4); return c->y;",
        );
        assert!(matches!(v, Value::Number(n) if n == 5.0));
    }

    #[test]
    fn class_constructor_does_not_expose_private_attrs() {
        let err = run_source_err(
            "class C(x) { let y = x + 1; private let z = 99; } let c = C(4); return c->z;",
        );
        assert!(matches!(err, RunError::Exception(ev) if ev.name == "AttributeError"));
    }

    #[test]
    fn set_index_is_membership_lookup() {
        let v = run_source("let s = set { 1, 2, 3 }; return s[2];");
        assert!(matches!(v, Value::Number(n) if n == 2.0));
    }

    #[test]
    fn set_index_miss_raises_key_error() {
        let err = run_source_err("let s = set { 1, 2, 3 }; return s[9];");
        assert!(matches!(err, RunError::Exception(ev) if ev.name == "KeyError"));
    }

    #[test]
    fn division_by_zero_is_catchable() {
        let v = run_source(
            "let result = 0; try { result = 1 / 0; } catch { result = -1; } return result;",
        );
        assert!(matches!(v, Value::Number(n) if n == -1.0));
    }

    #[test]
    fn exception_constructor_carries_custom_message() {
        let v = run_source(
            "exception Oops; let caught = \"\"; \
             try { raise Oops(\"bad input\"); } catch (Oops, e) { caught = e; } \
             return caught;",
        );
        match v {
            Value::Exception(ev) => assert_eq!(ev.message.as_deref(), Some("bad input")),
            other => panic!("expected exception, got {other:?}"),
        }
    }

    #[test]
    fn break_and_continue_accumulate_expected_sum() {
        let v = run_source(
            "let sum = 0; let i = 0; \
             while (1) { \
                 i = i + 1; \
                 if (i > 10) { break; } \
                 if (i % 2 == 0) { continue; } \
                 sum = sum + i; \
             } \
             return sum;",
        );
        // Odd numbers 1..=9: 1+3+5+7+9 = 25.
        assert!(matches!(v, Value::Number(n) if n == 25.0));
    }
}

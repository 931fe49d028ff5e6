//! An embeddable wrapper around compile+run (§1c, §4.5).
//!
//! Mirrors the teacher's `Sandbox` in shape — own a `Vm`, expose `run`, let
//! the caller configure resource limits before executing — but scoped to
//! what this language actually has: no tool/module registration and no
//! virtual file mounting, since this crate has no host-callback or module
//! system (§1 Non-goals). See `DESIGN.md` for why `print`/`println` write
//! straight to stdout here rather than through a capturable buffer.

use std::rc::Rc;

use crate::compiler::compile;
use crate::error::{CompileError, RunError};
use crate::value::Value;
use crate::vm::{Limits, Vm};

/// Everything that can go wrong running a script through a [`Sandbox`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
    #[error("runtime error: {0}")]
    Run(#[from] RunError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A reusable script-execution sandbox (§4.5).
///
/// Each [`Sandbox::run`] call resets the VM's operand/frame/handler stacks
/// and GC registry, but resource limits configured via [`Sandbox::limit`]
/// persist across calls.
pub struct Sandbox {
    vm: Vm,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    pub fn new() -> Self {
        Self { vm: Vm::new() }
    }

    /// Configures the instruction/recursion bounds applied to every
    /// subsequent `run` call (§4.5, §4.6).
    pub fn limit(&mut self, limits: Limits) -> &mut Self {
        self.vm.set_limits(limits);
        self
    }

    /// Compiles and executes `source`, returning the value consumed by
    /// `EXIT_PROGRAM` (or the value of an unguarded top-level `return`).
    pub fn run(&mut self, source: &str) -> Result<Value> {
        let code = compile(source, "<sandbox>")?;
        let value = self.vm.run(Rc::new(code))?;
        Ok(value)
    }

    /// Number of mark-and-sweep GC passes run across this sandbox's
    /// lifetime, exposed for embedders that want to watch collection
    /// pressure (§4.6).
    pub fn collections_run(&self) -> u64 {
        self.vm.collections_run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_a_simple_script() {
        let mut sandbox = Sandbox::new();
        let v = sandbox.run("return 2 + 2;").unwrap();
        assert!(matches!(v, Value::Number(n) if n == 4.0));
    }

    #[test]
    fn reports_compile_errors_line_anchored() {
        let mut sandbox = Sandbox::new();
        let err = sandbox.run("break;").unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
    }

    #[test]
    fn instruction_limit_is_enforced() {
        let mut sandbox = Sandbox::new();
        sandbox.limit(Limits { instruction_limit: Some(5), recursion_limit: None });
        let err = sandbox.run("let i = 0; while (i < 1000000) { i = i + 1; } return i;").unwrap_err();
        assert!(matches!(err, Error::Run(RunError::InstructionLimitExceeded(5))));
    }

    #[test]
    fn state_resets_between_runs() {
        let mut sandbox = Sandbox::new();
        assert!(matches!(sandbox.run("return 1;").unwrap(), Value::Number(n) if n == 1.0));
        assert!(matches!(sandbox.run("return 2;").unwrap(), Value::Number(n) if n == 2.0));
    }
}

//! Error taxonomy: front-end (compile-time) failures and runtime outcomes.
//!
//! `CompileError` covers everything that aborts the pipeline before the VM
//! starts (§7 "front-end errors"). `RunError` covers what can happen once the
//! VM is executing: a `RunError::Exception` is catchable by `try`/`catch`
//! (§4.3.6); the other variants are fatal per §7 and unwind straight out of
//! `Vm::run`.

use thiserror::Error;

use crate::value::Value;

pub type CompileResult<T> = std::result::Result<T, CompileError>;
pub type RunResult<T> = std::result::Result<T, RunError>;

/// A front-end failure: lexing, parsing, or the minimal structural check.
///
/// These are reported line-anchored per §6.3/§7 and abort before the
/// compiler or VM ever run.
#[derive(Debug, Clone, Error)]
#[error("{line}: {message}")]
pub struct CompileError {
    pub line: u32,
    pub message: String,
}

impl CompileError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A runtime exception value, raisable and catchable by `try`/`catch`.
///
/// Carries the exception name (built-in or user-declared via `exception
/// Name`) and an optional message, matching the `Exception` variant of
/// [`Value`] (§3.1).
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionValue {
    pub name: String,
    pub message: Option<String>,
}

impl ExceptionValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: None,
        }
    }

    pub fn with_message(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: Some(message.into()),
        }
    }
}

/// Everything that can come out of the VM's fetch-decode-execute loop.
///
/// `Exception` is the only catchable variant (§4.3.6, §7 "runtime
/// exceptions"). Everything else is a fatal error: it is never handed to a
/// `catch` block and always unwinds all the way out of [`crate::vm::Vm::run`].
#[derive(Debug, Clone, Error)]
pub enum RunError {
    /// A raisable, catchable exception (§7 "runtime exceptions").
    #[error("uncaught exception {0:?}")]
    Exception(ExceptionValue),

    /// Call-stack depth exceeded the configured limit (§4.5, §7 fatal).
    #[error("stack overflow: call depth exceeded {0}")]
    StackOverflow(usize),

    /// The configured instruction budget was exhausted.
    #[error("instruction limit exceeded: {0}")]
    InstructionLimitExceeded(u64),

    /// A name was looked up (`LOAD_VAR`, `DEREF_VAR`) and not found, and no
    /// built-in of that name exists either.
    #[error("name '{0}' is not defined")]
    NameError(String),

    /// Heap or native allocation failed (§7 fatal "allocation failure").
    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    /// A host-visible fatal condition with no more specific variant.
    #[error("{0}")]
    Fatal(String),
}

impl RunError {
    pub fn index_out_of_bounds(index: f64, len: usize) -> Self {
        RunError::Exception(ExceptionValue::with_message(
            "IndexOutOfBounds",
            format!("index {index} out of bounds for length {len}"),
        ))
    }

    pub fn invalid_index_type(got: &Value) -> Self {
        RunError::Exception(ExceptionValue::with_message(
            "InvalidIndexType",
            format!("index must be a number, got {}", got.type_name()),
        ))
    }

    pub fn non_indexible(got: &Value) -> Self {
        RunError::Exception(ExceptionValue::with_message(
            "NonIndexibleObject",
            format!("{} is not indexible", got.type_name()),
        ))
    }

    pub fn key_error(key: &Value) -> Self {
        RunError::Exception(ExceptionValue::with_message(
            "KeyError",
            format!("key {} not found", key.to_print_string()),
        ))
    }

    pub fn division_by_zero() -> Self {
        RunError::Exception(ExceptionValue::new("DivisionByZero"))
    }

    pub fn attribute_error(name: &str) -> Self {
        RunError::Exception(ExceptionValue::with_message(
            "AttributeError",
            format!("no attribute '{name}'"),
        ))
    }

    /// A `STORE_ATTRIBUTE` against a value that isn't a class instance
    /// (§4.3.2 — only class instances have a settable attribute map).
    pub fn attribute_error_on(name: &str, target: &Value) -> Self {
        RunError::Exception(ExceptionValue::with_message(
            "AttributeError",
            format!("{} has no settable attribute '{name}'", target.type_name()),
        ))
    }

    /// True for exceptions a `catch` clause may claim; false for fatal
    /// conditions that unwind past any handler stack (§7).
    pub fn is_catchable(&self) -> bool {
        matches!(self, RunError::Exception(_))
    }
}

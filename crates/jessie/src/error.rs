//! Error types for parsing and evaluation.
//!
//! Runtime failures are threaded through the evaluator as
//! `Result<_, RunError>`; there is no global error state. The public
//! [`RuntimeError`] and [`ParseError`] types are the library-boundary
//! wrappers.

use std::fmt;

use strum::{Display, IntoStaticStr};

/// Every runtime error kind the evaluator can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeErrorKind {
    /// Identifier not declared (as a read).
    VariableNotFound,
    /// Named function call target missing.
    FunctionNotFound,
    /// Call target is present but not a function.
    NotAFunction,
    /// Object read of a missing field.
    FieldNotDefined,
    /// Array index not an int, or object key not a string.
    IndexHasWrongType,
    /// Array index outside `[0, length)`.
    IndexOutRange,
    /// Attempt to index a non-array, non-object.
    CannotIndexThisType,
    /// Method call on a non-object, non-array.
    IsNotAnObject,
    /// Unknown method on an array.
    MethodNotFound,
    /// `new Foo()` where `Foo` is not `Object` or `Array`.
    UnknownNewType,
    /// Writing to a non-assignable expression.
    CanNotUseThisAsLeftValue,
    /// `continue`/`break` leaking from a function body, or any of the three
    /// appearing at top level.
    ContinueReturnBreakCanNotBeInThisScope,
}

/// A runtime error with its kind, an optional message, and the source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    pub line: u32,
}

impl RunError {
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{} (line {})", self.kind, self.line)
        } else {
            write!(f, "{}: {} (line {})", self.kind, self.message, self.line)
        }
    }
}

/// Result alias used throughout the evaluator and statement executor.
pub(crate) type EvalResult<T> = Result<T, RunError>;

/// A runtime error surfaced through the public API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError(pub(crate) RunError);

impl RuntimeError {
    /// The error kind.
    #[must_use]
    pub fn kind(&self) -> RuntimeErrorKind {
        self.0.kind
    }

    /// The optional detail message (may be empty).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0.message
    }

    /// The 1-based source line the error was reported at.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.0.line
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for RuntimeError {}

/// A lexer or parser failure with the line it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub(crate) message: String,
    pub(crate) line: u32,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }

    /// The 1-based source line the error was reported at.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error: {} (line {})", self.message, self.line)
    }
}

impl std::error::Error for ParseError {}

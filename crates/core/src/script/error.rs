//! Script errors

use std::{fmt, time::Duration};

use thiserror::Error;

use crate::{effects::EffectError, script::host::HostState};

/// Line and column in script source, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Line number
    pub line: usize,

    /// Column number
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Script could not be tokenised or parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("syntax error at {position}: {message}")]
pub struct ParseError {
    /// Where the error was found
    pub position: Position,

    /// What went wrong
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// A fault raised while a script is running.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    /// Read of a variable that was never declared.
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    /// Assignment to `cart`, `Input` or another host binding.
    #[error("`{0}` is read-only")]
    ReadOnlyBinding(String),

    /// Property not exposed on a value.
    #[error("{ty} has no property `{name}`")]
    UnknownProperty {
        /// Receiver type
        ty: &'static str,

        /// Property name
        name: String,
    },

    /// Method not exposed on a value.
    #[error("{ty} has no method `{name}`")]
    UnknownMethod {
        /// Receiver type
        ty: &'static str,

        /// Method name
        name: String,
    },

    /// Call to a function that does not exist.
    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    /// Operand of the wrong type.
    #[error("`{op}` expects {expected}, found {found}")]
    TypeMismatch {
        /// Operation
        op: &'static str,

        /// Expected type
        expected: &'static str,

        /// Actual type
        found: &'static str,
    },

    /// Bad call arguments.
    #[error("invalid arguments to `{name}`: {reason}")]
    InvalidArguments {
        /// Callee
        name: String,

        /// What was wrong
        reason: String,
    },

    /// Division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Decimal arithmetic overflowed.
    #[error("arithmetic overflow")]
    Overflow,

    /// Index outside the line item list.
    #[error("index {index} out of bounds for {len} line items")]
    IndexOutOfBounds {
        /// Requested index
        index: String,

        /// Number of lines
        len: usize,
    },

    /// A string grew past the configured limit.
    #[error("string exceeds {0} bytes")]
    StringTooLong(usize),

    /// `break` or `continue` outside a loop.
    #[error("`{0}` outside of a loop")]
    StrayControl(&'static str),

    /// The script raised explicitly.
    #[error("raised: {0}")]
    Raised(String),

    /// A price proposal was rejected.
    #[error(transparent)]
    Effect(#[from] EffectError),
}

/// Errors from loading or running a script.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    /// Source exceeds the configured size.
    #[error("script is {len} bytes, limit is {limit}")]
    SourceTooLarge {
        /// Source length
        len: usize,

        /// Configured limit
        limit: usize,
    },

    /// Source did not parse.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Fault while running.
    #[error("runtime error at {position}: {error}")]
    Runtime {
        /// The fault
        error: RuntimeError,

        /// Where it happened
        position: Position,
    },

    /// Step budget exhausted.
    #[error("script exceeded its budget of {limit} steps")]
    StepLimitExceeded {
        /// Configured limit
        limit: u64,
    },

    /// Wall-clock budget exhausted.
    #[error("script exceeded its time budget of {limit:?}")]
    Timeout {
        /// Configured limit
        limit: Duration,
    },

    /// Operation not valid in the host's current state.
    #[error("script host is {found}, expected {expected}")]
    InvalidState {
        /// Required state
        expected: HostState,

        /// Actual state
        found: HostState,
    },
}

impl ScriptError {
    /// Whether the error came from exhausting the execution budget.
    pub fn is_budget_exhausted(&self) -> bool {
        matches!(
            self,
            ScriptError::StepLimitExceeded { .. } | ScriptError::Timeout { .. }
        )
    }
}

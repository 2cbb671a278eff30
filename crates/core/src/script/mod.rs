//! Script sandbox
//!
//! A small interpreter for the cart discount language. Scripts can read the
//! cart, compute with exact decimals, and propose new line prices; nothing
//! else is reachable from inside the sandbox.

mod ast;
mod error;
mod host;
mod interpreter;
mod lexer;
mod limits;
mod parser;
mod value;

pub use ast::Program;
pub use error::{ParseError, Position, RuntimeError, ScriptError};
pub use host::{ExecutionOutcome, HostState, ScriptHost};
pub use limits::ExecutionLimits;

/// Parse `source` into a program, enforcing the size and nesting limits.
///
/// # Errors
///
/// Returns `SourceTooLarge` for oversized input, otherwise any syntax error.
pub fn parse(source: &str, limits: &ExecutionLimits) -> Result<Program, ScriptError> {
    if source.len() > limits.max_source_bytes {
        return Err(ScriptError::SourceTooLarge {
            len: source.len(),
            limit: limits.max_source_bytes,
        });
    }

    Ok(parser::parse(source, limits.max_nesting_depth)?)
}

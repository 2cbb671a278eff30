//! Compilation
//!
//! Merchant source is compiled once, when the discount is configured. The
//! compiler may be an external service, so its output is parsed again with
//! the sandbox's own parser before it is stored.

use thiserror::Error;
use tracing::debug;

use crate::{
    configuration::Configuration,
    script::{self, ExecutionLimits, ScriptError},
};

/// Compilation errors, surfaced at configuration time only.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// Nothing to compile.
    #[error("Script source is empty")]
    EmptySource,

    /// The source is not a valid script.
    #[error("Script is invalid: {0}")]
    Invalid(#[source] ScriptError),

    /// The compiler refused the source.
    #[error("Compiler rejected the script: {0}")]
    Rejected(String),

    /// The compiler produced something the sandbox cannot load.
    #[error("Compiled script is not loadable: {0}")]
    InvalidOutput(#[source] ScriptError),
}

/// Turns merchant-authored source into executable script text.
pub trait ScriptCompiler {
    /// Compile `source`.
    ///
    /// # Errors
    ///
    /// Returns a `CompilationError` if the source cannot be compiled.
    fn compile(&self, source: &str) -> Result<String, CompilationError>;
}

/// In-process compiler: the source language is the script language, so
/// compiling is validating.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatingCompiler {
    limits: ExecutionLimits,
}

impl ValidatingCompiler {
    /// Validate against `limits`.
    pub fn new(limits: ExecutionLimits) -> Self {
        Self { limits }
    }
}

impl ScriptCompiler for ValidatingCompiler {
    fn compile(&self, source: &str) -> Result<String, CompilationError> {
        script::parse(source, &self.limits).map_err(CompilationError::Invalid)?;

        Ok(source.to_string())
    }
}

/// Compile `source` and wrap the result as a stored configuration.
///
/// # Errors
///
/// Returns a `CompilationError` if the source is blank, the compiler fails, or
/// the compiled output does not load within `limits`.
pub fn configure<C: ScriptCompiler + ?Sized>(
    compiler: &C,
    source: &str,
    limits: &ExecutionLimits,
) -> Result<Configuration, CompilationError> {
    if source.trim().is_empty() {
        return Err(CompilationError::EmptySource);
    }

    let code = compiler.compile(source)?;

    let program = script::parse(&code, limits).map_err(CompilationError::InvalidOutput)?;

    debug!(
        source_bytes = source.len(),
        code_bytes = code.len(),
        statements = program.len(),
        "script configured"
    );

    Ok(Configuration::new(code))
}

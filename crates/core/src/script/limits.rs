//! Execution limits and the step budget that enforces them.

use std::time::{Duration, Instant};

use crate::script::error::ScriptError;

/// How often, in steps, the wall clock is consulted.
const CLOCK_CHECK_INTERVAL: u64 = 256;

/// Resource limits for loading and running one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Maximum interpreter steps per run
    pub max_steps: u64,

    /// Optional wall-clock ceiling per run.
    ///
    /// Off by default. When set, a run that would stay within `max_steps` can
    /// still time out on a slow host, so results are no longer reproducible
    /// across machines.
    pub timeout: Option<Duration>,

    /// Maximum script size in bytes
    pub max_source_bytes: usize,

    /// Maximum nesting of blocks and expressions
    pub max_nesting_depth: usize,

    /// Maximum price proposals per run
    pub max_proposals: usize,

    /// Maximum length of any string value in bytes
    pub max_string_bytes: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_steps: 100_000,
            timeout: None,
            max_source_bytes: 64 * 1024,
            max_nesting_depth: 64,
            max_proposals: 1_000,
            max_string_bytes: 4 * 1024,
        }
    }
}

/// Step counter for a single run.
///
/// The step ceiling is the primary, deterministic bound; the wall clock is only
/// sampled every [`CLOCK_CHECK_INTERVAL`] steps.
#[derive(Debug)]
pub(crate) struct StepBudget {
    used: u64,
    max_steps: u64,
    timeout: Option<Duration>,
    started: Instant,
}

impl StepBudget {
    pub(crate) fn start(limits: &ExecutionLimits) -> Self {
        Self {
            used: 0,
            max_steps: limits.max_steps,
            timeout: limits.timeout,
            started: Instant::now(),
        }
    }

    /// Consume one step.
    pub(crate) fn charge(&mut self) -> Result<(), ScriptError> {
        self.used += 1;

        if self.used > self.max_steps {
            return Err(ScriptError::StepLimitExceeded {
                limit: self.max_steps,
            });
        }

        if self.used % CLOCK_CHECK_INTERVAL == 0
            && let Some(timeout) = self.timeout
            && self.started.elapsed() > timeout
        {
            return Err(ScriptError::Timeout { limit: timeout });
        }

        Ok(())
    }

    pub(crate) fn used(&self) -> u64 {
        self.used
    }
}

//! Script host
//!
//! Owns one program for one evaluation and walks it through
//! `Idle → Loaded → Running → {Completed, Faulted, TimedOut}`.

use std::fmt;

use tracing::{debug, trace};

use crate::{
    cart::CartSnapshot,
    effects::MutationEvent,
    script::{
        ast::Program,
        error::ScriptError,
        interpreter::{self, Execution},
        limits::ExecutionLimits,
        parse,
    },
};

/// Lifecycle of a [`ScriptHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    /// Nothing loaded yet.
    Idle,

    /// A program is loaded and ready to run.
    Loaded,

    /// The program is executing.
    Running,

    /// The program ran to the end.
    Completed,

    /// Loading or running failed.
    Faulted,

    /// The execution budget ran out.
    TimedOut,
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostState::Idle => "idle",
            HostState::Loaded => "loaded",
            HostState::Running => "running",
            HostState::Completed => "completed",
            HostState::Faulted => "faulted",
            HostState::TimedOut => "timed out",
        };

        f.write_str(name)
    }
}

/// How a run ended. Only a completed run yields events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The script finished.
    Completed {
        /// Proposals in call order
        events: Vec<MutationEvent>,

        /// Steps consumed
        steps: u64,
    },

    /// The script faulted. Partial events are discarded.
    Faulted(ScriptError),

    /// The step or time budget ran out. Partial events are discarded.
    TimedOut(ScriptError),
}

impl ExecutionOutcome {
    /// Host state this outcome leaves behind.
    pub fn state(&self) -> HostState {
        match self {
            ExecutionOutcome::Completed { .. } => HostState::Completed,
            ExecutionOutcome::Faulted(_) => HostState::Faulted,
            ExecutionOutcome::TimedOut(_) => HostState::TimedOut,
        }
    }
}

/// Sandbox for a single evaluation.
///
/// A host is never reused: create one per evaluation, load once, run once.
#[derive(Debug)]
pub struct ScriptHost {
    limits: ExecutionLimits,
    state: HostState,
    program: Option<Program>,
}

impl ScriptHost {
    /// Create an idle host.
    pub fn new(limits: ExecutionLimits) -> Self {
        Self {
            limits,
            state: HostState::Idle,
            program: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> HostState {
        self.state
    }

    /// Parse `code` and keep it for [`ScriptHost::run`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the host is idle, or the parse error; a
    /// failed load leaves the host faulted.
    pub fn load(&mut self, code: &str) -> Result<(), ScriptError> {
        self.expect_state(HostState::Idle)?;

        match parse(code, &self.limits) {
            Ok(program) => {
                trace!(statements = program.len(), "script loaded");

                self.program = Some(program);
                self.state = HostState::Loaded;

                Ok(())
            }
            Err(error) => {
                self.state = HostState::Faulted;

                Err(error)
            }
        }
    }

    /// Run the loaded program against `cart` with a fresh accumulator.
    pub fn run(&mut self, cart: &CartSnapshot) -> ExecutionOutcome {
        if let Err(error) = self.expect_state(HostState::Loaded) {
            return ExecutionOutcome::Faulted(error);
        }

        let Some(program) = self.program.take() else {
            self.state = HostState::Faulted;

            return ExecutionOutcome::Faulted(ScriptError::InvalidState {
                expected: HostState::Loaded,
                found: HostState::Idle,
            });
        };

        self.state = HostState::Running;

        let outcome = match interpreter::execute(&program, cart, &self.limits) {
            Ok(Execution { events, steps }) => {
                debug!(steps, events = events.len(), "script completed");

                ExecutionOutcome::Completed { events, steps }
            }
            Err(error) if error.is_budget_exhausted() => ExecutionOutcome::TimedOut(error),
            Err(error) => ExecutionOutcome::Faulted(error),
        };

        self.state = outcome.state();

        outcome
    }

    fn expect_state(&self, expected: HostState) -> Result<(), ScriptError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ScriptError::InvalidState {
                expected,
                found: self.state,
            })
        }
    }
}

//! Command line configuration

use std::time::Duration;

use cartscript::script::ExecutionLimits;
use clap::{Args, Parser};

use crate::commands::Commands;

/// Cartscript command line
#[derive(Debug, Parser)]
#[command(name = "cartscript", about = "Cart discount script evaluator", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) logging: LoggingConfig,

    #[command(flatten)]
    pub(crate) limits: LimitsConfig,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

impl Cli {
    /// Load configuration from `.env`, the environment and arguments
    pub(crate) fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub(crate) struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "RUST_LOG", default_value = "warn")]
    pub(crate) log_level: String,

    /// Log format (compact, json)
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub(crate) log_format: LogFormat,
}

/// Sandbox limits.
#[derive(Debug, Args)]
pub(crate) struct LimitsConfig {
    /// Maximum interpreter steps per evaluation
    #[arg(long, global = true, env = "CARTSCRIPT_MAX_STEPS", default_value_t = 100_000)]
    pub(crate) max_steps: u64,

    /// Wall-clock limit per evaluation in milliseconds, 0 to disable
    #[arg(long, global = true, env = "CARTSCRIPT_TIMEOUT_MS", default_value_t = 100)]
    pub(crate) timeout_ms: u64,

    /// Maximum price proposals per evaluation
    #[arg(long, global = true, env = "CARTSCRIPT_MAX_PROPOSALS", default_value_t = 1_000)]
    pub(crate) max_proposals: usize,
}

impl LimitsConfig {
    pub(crate) fn execution_limits(&self) -> ExecutionLimits {
        ExecutionLimits {
            max_steps: self.max_steps,
            timeout: (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms)),
            max_proposals: self.max_proposals,
            ..ExecutionLimits::default()
        }
    }
}

//! Cartscript CLI
//!
//! Runs discount scripts against cart documents, validates scripts before
//! they are stored, and explains what a script did.

use std::{io, process::ExitCode};

use tracing::error;

mod commands;
mod config;
mod logging;
mod report;

#[expect(clippy::print_stderr, reason = "Reporting failures to the terminal")]
fn main() -> ExitCode {
    let cli = match config::Cli::load() {
        Ok(cli) => cli,
        Err(error) => error.exit(),
    };

    if let Err(error) = logging::init_subscriber(&cli.logging) {
        eprintln!("failed to initialise logging: {error}");

        return ExitCode::FAILURE;
    }

    let limits = cli.limits.execution_limits();

    match commands::run(cli.command, &limits, &mut io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "command failed");
            eprintln!("{error:#}");

            ExitCode::FAILURE
        }
    }
}

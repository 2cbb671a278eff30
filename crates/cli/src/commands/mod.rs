use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use cartscript::{
    configuration::Configuration,
    evaluation::{Evaluation, Evaluator},
    input::FunctionInput,
    script::ExecutionLimits,
};
use clap::{Args, Subcommand};

mod compile;
mod explain;
mod run;

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Evaluate a cart and print the discount result
    Run(EvaluateArgs),

    /// Validate a script and print its stored configuration
    Compile(compile::CompileArgs),

    /// Evaluate a cart and show every price proposal
    Explain(EvaluateArgs),
}

/// Input selection shared by `run` and `explain`.
#[derive(Debug, Args)]
pub(crate) struct EvaluateArgs {
    /// Input document path, `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Script file to use instead of the document's stored configuration
    #[arg(short, long)]
    script: Option<PathBuf>,
}

pub(crate) fn run(
    command: Commands,
    limits: &ExecutionLimits,
    out: &mut impl io::Write,
) -> Result<()> {
    match command {
        Commands::Run(args) => run::run(&args, limits, out),
        Commands::Compile(args) => compile::run(&args, limits, out),
        Commands::Explain(args) => explain::run(&args, limits, out),
    }
}

fn evaluate(args: &EvaluateArgs, limits: &ExecutionLimits) -> Result<Evaluation> {
    let evaluator = Evaluator::new(*limits);
    let document = read_source(&args.input)?;

    let Some(script) = &args.script else {
        return Ok(evaluator.evaluate_json(&document));
    };

    let input = FunctionInput::from_json(&document)
        .with_context(|| format!("{} is not an input document", args.input.display()))?;
    let configuration = Configuration::new(read_source(script)?);

    Ok(evaluator.evaluate_cart(&input.cart, Some(&configuration)))
}

/// Read a file, or stdin for `-`.
fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;

        return Ok(text);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

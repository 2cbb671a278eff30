use std::{io, path::PathBuf};

use anyhow::{Context, Result};
use cartscript::{
    compile::{ValidatingCompiler, configure},
    script::ExecutionLimits,
};
use clap::Args;

use super::read_source;

#[derive(Debug, Args)]
pub(crate) struct CompileArgs {
    /// Script source path, `-` for stdin
    #[arg(short, long)]
    script: PathBuf,
}

pub(super) fn run(
    args: &CompileArgs,
    limits: &ExecutionLimits,
    out: &mut impl io::Write,
) -> Result<()> {
    let source = read_source(&args.script)?;

    let configuration = configure(&ValidatingCompiler::new(*limits), &source, limits)
        .with_context(|| format!("{} did not compile", args.script.display()))?;

    writeln!(out, "{}", configuration.to_metafield_value())?;

    Ok(())
}

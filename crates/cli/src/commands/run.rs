use std::io;

use anyhow::Result;
use cartscript::script::ExecutionLimits;

use super::{EvaluateArgs, evaluate};

pub(super) fn run(
    args: &EvaluateArgs,
    limits: &ExecutionLimits,
    out: &mut impl io::Write,
) -> Result<()> {
    let evaluation = evaluate(args, limits)?;

    serde_json::to_writer_pretty(&mut *out, &evaluation.result)?;
    writeln!(out)?;

    Ok(())
}

use std::io;

use anyhow::Result;
use cartscript::script::ExecutionLimits;

use super::{EvaluateArgs, evaluate};
use crate::report::write_report;

pub(super) fn run(
    args: &EvaluateArgs,
    limits: &ExecutionLimits,
    out: &mut impl io::Write,
) -> Result<()> {
    let evaluation = evaluate(args, limits)?;

    write_report(out, &evaluation)?;
    writeln!(out)?;
    serde_json::to_writer_pretty(&mut *out, &evaluation.result)?;
    writeln!(out)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use testresult::TestResult;

    use super::*;
    use crate::commands::tests::INPUT;

    #[test]
    fn shows_proposals_then_result() -> TestResult {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.json");
        fs::write(&input, INPUT)?;

        let mut out = Vec::new();
        run(
            &EvaluateArgs {
                input,
                script: None,
            },
            &ExecutionLimits::default(),
            &mut out,
        )?;

        let printed = String::from_utf8(out)?;
        let table_end = printed.find("Outcome:").ok_or("missing outcome")?;
        let result_start = printed.find("\"discountApplicationStrategy\"").ok_or("missing result")?;

        assert!(printed.contains("gid://A"));
        assert!(table_end < result_start);

        Ok(())
    }
}

//! Evaluation report

use std::io;

use cartscript::{
    effects::MutationEvent,
    evaluation::{Diagnostic, Evaluation},
};
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};

const HEADER: [&str; 8] = [
    "#", "Line", "Variant", "Original", "Proposed", "Ratio", "Eligible", "Message",
];

/// Write the proposals table followed by the outcome.
pub(crate) fn write_report(out: &mut impl io::Write, evaluation: &Evaluation) -> io::Result<()> {
    if evaluation.events.is_empty() {
        writeln!(out, "No price proposals recorded")?;
    } else {
        writeln!(out, "{}", events_table(&evaluation.events))?;
    }

    writeln!(out, "Outcome: {}", outcome(evaluation))
}

fn events_table(events: &[MutationEvent]) -> String {
    let mut builder = Builder::default();
    builder.push_record(HEADER);

    for (idx, event) in events.iter().enumerate() {
        builder.push_record([
            format!("{}", idx + 1),
            event.line.to_string(),
            event.product_variant_id.clone().unwrap_or_default(),
            event.original_price.to_string(),
            event.new_price.to_string(),
            event.percentage.to_string(),
            if event.eligible { "yes" } else { "no" }.to_string(),
            event.message.clone().unwrap_or_default(),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(3..6), Alignment::right());

    table.to_string()
}

fn outcome(evaluation: &Evaluation) -> String {
    match &evaluation.diagnostic {
        None => format!("discounted {} line(s)", discounted_lines(evaluation)),
        Some(Diagnostic::NoQualifyingLines) => "no qualifying lines".to_string(),
        Some(Diagnostic::Failed(error)) => format!("empty discount ({error})"),
    }
}

fn discounted_lines(evaluation: &Evaluation) -> usize {
    evaluation
        .result
        .discounts
        .iter()
        .map(|discount| discount.targets.len())
        .sum()
}

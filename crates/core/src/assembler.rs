//! Result assembly
//!
//! Folds the events of a completed run into the output document.

use rustc_hash::FxHashSet;

use crate::{
    discounts::{
        Discount, DiscountApplicationStrategy, DiscountResult, DiscountTarget, DiscountValue,
    },
    effects::MutationEvent,
};

/// Message used when no proposal supplied one.
pub const DEFAULT_MESSAGE: &str = "Applying script discounts";

/// Outcome of folding a run's events.
#[derive(Debug, Clone, PartialEq)]
pub enum Assembly {
    /// At least one eligible line was targeted.
    Discounted(DiscountResult),

    /// No eligible line was targeted; the result is the canonical empty discount.
    NoQualifyingLines,
}

impl Assembly {
    /// The result document for this assembly.
    pub fn into_result(self) -> DiscountResult {
        match self {
            Assembly::Discounted(result) => result,
            Assembly::NoQualifyingLines => DiscountResult::empty(),
        }
    }
}

/// Fold events into a single discount entry.
///
/// - `targets` are the eligible lines, deduplicated by variant id and kept in
///   first-registration order.
/// - `value` is the ratio of the *last* event, eligible or not.
/// - `message` is the last supplied message, or [`DEFAULT_MESSAGE`].
///
/// Every target therefore shares one value, even if the script proposed
/// different ratios for different lines.
pub fn assemble(events: &[MutationEvent]) -> Assembly {
    let mut seen = FxHashSet::default();
    let mut targets = Vec::new();
    let mut value = None;
    let mut message = None;

    for event in events {
        value = Some(DiscountValue::from_ratio(event.percentage));

        if let Some(text) = &event.message {
            message = Some(text.as_str());
        }

        if !event.eligible {
            continue;
        }

        if let Some(id) = &event.product_variant_id
            && seen.insert(id.as_str())
        {
            targets.push(DiscountTarget {
                product_variant_id: id.clone(),
            });
        }
    }

    let Some(value) = value.filter(|_| !targets.is_empty()) else {
        return Assembly::NoQualifyingLines;
    };

    Assembly::Discounted(DiscountResult {
        discount_application_strategy: DiscountApplicationStrategy::Maximum,
        discounts: vec![Discount {
            targets,
            value,
            message: message.unwrap_or(DEFAULT_MESSAGE).to_string(),
        }],
    })
}

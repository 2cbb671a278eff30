//! Effects
//!
//! The only way a script can influence the result is by proposing a new price
//! for a line. Each proposal becomes a [`MutationEvent`]; nothing on the cart
//! is ever changed in place.
//!
//! Accumulation policy, applied by [`crate::assembler`]:
//!
//! - targets accumulate, in call order, and only for product variant lines;
//! - the discount value and message are last-write-wins across *all*
//!   proposals, gift card lines included.
//!
//! The platform result carries a single value and message per discount entry,
//! so every target shares whichever ratio was proposed last.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::cart::{LineId, LineItem};

/// Errors raised by a proposal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EffectError {
    /// The line total is zero, so no ratio exists.
    #[error("{0} has a zero total; cannot compute a price ratio")]
    ZeroLinePrice(LineId),

    /// A negative price was proposed.
    #[error("proposed price {price} for {line} is negative")]
    NegativePrice {
        /// Target line
        line: LineId,

        /// Proposed price
        price: Decimal,
    },

    /// Ratio could not be represented.
    #[error("price ratio for {0} overflowed")]
    Overflow(LineId),

    /// The script proposed more prices than allowed.
    #[error("more than {0} price proposals")]
    TooManyProposals(usize),
}

/// Options passed alongside a proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalOptions {
    /// Message shown to the buyer
    pub message: Option<String>,
}

/// A script-triggered record proposing a new price for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEvent {
    /// Line the proposal was made for
    pub line: LineId,

    /// Variant id, present when the line is eligible
    pub product_variant_id: Option<String>,

    /// Proposed price
    pub new_price: Decimal,

    /// Line total at proposal time
    pub original_price: Decimal,

    /// `new_price / original_price`
    pub percentage: Decimal,

    /// Message, if one was supplied
    pub message: Option<String>,

    /// Whether the line is a product variant
    pub eligible: bool,
}

/// Per-evaluation event log. A fresh accumulator is created for every run
/// and dropped with the run if the script does not complete.
#[derive(Debug)]
pub struct EffectAccumulator {
    events: Vec<MutationEvent>,
    max_proposals: usize,
}

impl EffectAccumulator {
    /// Create an empty accumulator accepting at most `max_proposals` events.
    pub fn new(max_proposals: usize) -> Self {
        Self {
            events: Vec::new(),
            max_proposals,
        }
    }

    /// Record a proposed new price for `line`.
    ///
    /// # Errors
    ///
    /// Returns an `EffectError` if the line total is zero, the price is
    /// negative, the ratio overflows, or the proposal limit is reached. No
    /// event is recorded in that case.
    pub fn propose_new_price(
        &mut self,
        line: &LineItem,
        new_price: Decimal,
        options: ProposalOptions,
    ) -> Result<(), EffectError> {
        if self.events.len() >= self.max_proposals {
            return Err(EffectError::TooManyProposals(self.max_proposals));
        }

        if new_price.is_sign_negative() && !new_price.is_zero() {
            return Err(EffectError::NegativePrice {
                line: line.id(),
                price: new_price,
            });
        }

        let original_price = line.total_price();

        if original_price.is_zero() {
            return Err(EffectError::ZeroLinePrice(line.id()));
        }

        let percentage = new_price
            .checked_div(original_price)
            .ok_or(EffectError::Overflow(line.id()))?
            .normalize();

        self.events.push(MutationEvent {
            line: line.id(),
            product_variant_id: line.product_variant_id().map(str::to_string),
            new_price,
            original_price,
            percentage,
            message: options.message,
            eligible: line.is_product_variant(),
        });

        Ok(())
    }

    /// Events recorded so far, in call order.
    pub fn events(&self) -> &[MutationEvent] {
        &self.events
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Consume the accumulator, yielding its events.
    pub fn into_events(self) -> Vec<MutationEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::dec;
    use serde_json::json;
    use testresult::TestResult;

    use crate::{cart::CartSnapshot, input::RawCart};

    use super::*;

    fn snapshot() -> Result<CartSnapshot, Box<dyn std::error::Error>> {
        let cart: RawCart = serde_json::from_value(json!({
            "subtotal_price": "80",
            "lines": [
                { "merchandise": { "typename": "ProductVariant", "id": "a" }, "cost": { "totalAmount": "50" } },
                { "merchandise": { "typename": "GiftCard" }, "cost": { "totalAmount": "30" } },
                { "merchandise": { "typename": "ProductVariant", "id": "free" }, "cost": { "totalAmount": "0" } }
            ]
        }))?;

        Ok(CartSnapshot::from_raw(&cart)?)
    }

    fn line(snapshot: &CartSnapshot, index: usize) -> Result<&LineItem, &'static str> {
        snapshot.line_items().get(index).ok_or("missing line")
    }

    #[test]
    fn records_ratio_and_eligibility() -> TestResult {
        let snapshot = snapshot()?;
        let mut effects = EffectAccumulator::new(10);

        effects.propose_new_price(
            line(&snapshot, 0)?,
            dec!(45),
            ProposalOptions {
                message: Some("Volume discount".to_string()),
            },
        )?;

        let event = effects.events().last().ok_or("missing event")?;

        assert_eq!(event.percentage, dec!(0.9));
        assert_eq!(event.original_price, dec!(50));
        assert_eq!(event.product_variant_id.as_deref(), Some("a"));
        assert!(event.eligible);

        Ok(())
    }

    #[test]
    fn records_gift_card_proposals_as_ineligible() -> TestResult {
        let snapshot = snapshot()?;
        let mut effects = EffectAccumulator::new(10);

        effects.propose_new_price(line(&snapshot, 1)?, dec!(15), ProposalOptions::default())?;

        let event = effects.events().last().ok_or("missing event")?;

        assert!(!event.eligible);
        assert_eq!(event.product_variant_id, None);
        assert_eq!(event.percentage, dec!(0.5));
        assert_eq!(effects.len(), 1);

        Ok(())
    }

    #[test]
    fn keeps_duplicate_proposals_in_call_order() -> TestResult {
        let snapshot = snapshot()?;
        let mut effects = EffectAccumulator::new(10);
        let first = line(&snapshot, 0)?;

        effects.propose_new_price(first, dec!(40), ProposalOptions::default())?;
        effects.propose_new_price(first, dec!(25), ProposalOptions::default())?;

        let ratios: Vec<_> = effects.events().iter().map(|e| e.percentage).collect();

        assert_eq!(ratios, vec![dec!(0.8), dec!(0.5)]);

        Ok(())
    }

    #[test]
    fn zero_line_total_is_rejected() -> TestResult {
        let snapshot = snapshot()?;
        let mut effects = EffectAccumulator::new(10);
        let free = line(&snapshot, 2)?;

        let result = effects.propose_new_price(free, dec!(0), ProposalOptions::default());

        assert_eq!(result.err(), Some(EffectError::ZeroLinePrice(free.id())));
        assert!(effects.is_empty());

        Ok(())
    }

    #[test]
    fn negative_price_is_rejected() -> TestResult {
        let snapshot = snapshot()?;
        let mut effects = EffectAccumulator::new(10);

        let result =
            effects.propose_new_price(line(&snapshot, 0)?, dec!(-1), ProposalOptions::default());

        assert!(matches!(result, Err(EffectError::NegativePrice { .. })));
        assert!(effects.is_empty());

        Ok(())
    }

    #[test]
    fn proposal_limit_is_enforced() -> TestResult {
        let snapshot = snapshot()?;
        let mut effects = EffectAccumulator::new(1);
        let first = line(&snapshot, 0)?;

        effects.propose_new_price(first, dec!(40), ProposalOptions::default())?;

        let result = effects.propose_new_price(first, dec!(30), ProposalOptions::default());

        assert_eq!(result.err(), Some(EffectError::TooManyProposals(1)));
        assert_eq!(effects.into_events().len(), 1);

        Ok(())
    }
}

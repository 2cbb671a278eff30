//! Discounts
//!
//! Output document types. Field names follow the platform's JSON contract.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the platform should pick among returned discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountApplicationStrategy {
    /// Apply the first discount only.
    First,

    /// Apply the discount with the greatest reduction.
    Maximum,

    /// Apply every discount.
    All,
}

/// The result document returned for every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountResult {
    /// Selection strategy
    pub discount_application_strategy: DiscountApplicationStrategy,

    /// Discount entries
    pub discounts: Vec<Discount>,
}

impl DiscountResult {
    /// The canonical empty discount: `First`, no entries.
    pub fn empty() -> Self {
        Self {
            discount_application_strategy: DiscountApplicationStrategy::First,
            discounts: Vec::new(),
        }
    }

    /// Whether this is the canonical empty discount.
    pub fn is_empty(&self) -> bool {
        self.discount_application_strategy == DiscountApplicationStrategy::First
            && self.discounts.is_empty()
    }

    /// Render as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if a decimal cannot be represented as a JSON number.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Default for DiscountResult {
    fn default() -> Self {
        Self::empty()
    }
}

/// A single discount entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    /// Lines receiving the discount
    pub targets: Vec<DiscountTarget>,

    /// Discount value
    pub value: DiscountValue,

    /// Buyer-facing message
    pub message: String,
}

/// A reference to a discountable line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscountTarget {
    /// Product variant id
    #[serde(rename = "productVariantId")]
    pub product_variant_id: String,
}

/// Discount value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountValue {
    /// Percentage value
    pub percentage: PercentageValue,
}

impl DiscountValue {
    /// Build from a retained-fraction ratio (`new / original`).
    pub fn from_ratio(ratio: Decimal) -> Self {
        Self {
            percentage: PercentageValue { value: ratio },
        }
    }

    /// The stored ratio.
    pub fn ratio(&self) -> Decimal {
        self.percentage.value
    }
}

/// Percentage wrapper, serialised as `{ "value": <number> }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentageValue {
    /// Ratio of the proposed price to the line total
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
}

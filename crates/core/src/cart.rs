//! Cart
//!
//! Immutable, typed view of a cart for one evaluation.

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use smallvec::SmallVec;
use thiserror::Error;

use crate::input::{RawAmount, RawCart, RawLine};

/// GraphQL type name of discountable merchandise.
pub const PRODUCT_VARIANT_TYPENAME: &str = "ProductVariant";

/// Errors raised while building a [`CartSnapshot`] from a raw payload.
#[derive(Debug, Error)]
pub enum CartError {
    /// The input document itself could not be decoded.
    #[error("malformed input document: {0}")]
    Document(#[from] serde_json::Error),

    /// Neither `subtotal_price` nor `cost.subtotalAmount` was present.
    #[error("cart has no subtotal")]
    MissingSubtotal,

    /// The subtotal is not a decimal amount.
    #[error("cart subtotal {0} is not a decimal amount")]
    InvalidSubtotal(RawAmount),

    /// A line total is not a decimal amount (line index, raw amount).
    #[error("line {0} total {1} is not a decimal amount")]
    InvalidLineTotal(usize, RawAmount),

    /// A product variant line did not carry an id.
    #[error("line {0} is a product variant without an id")]
    MissingVariantId(usize),
}

/// Position of a line within its snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(usize);

impl LineId {
    /// Id for the line at `index` in cart order.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Index of the line in cart order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.0)
    }
}

/// Merchandise classification, fixed when the snapshot is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merchandise {
    /// A discountable product variant.
    ProductVariant {
        /// Platform id of the variant
        id: String,
    },

    /// Gift cards and any other non-discountable merchandise.
    Other {
        /// Platform type name
        typename: String,
    },
}

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    id: LineId,
    total_price: Decimal,
    merchandise: Merchandise,
}

impl LineItem {
    /// Line id
    pub fn id(&self) -> LineId {
        self.id
    }

    /// Line total
    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    /// Merchandise classification
    pub fn merchandise(&self) -> &Merchandise {
        &self.merchandise
    }

    /// Whether the line may receive a discount.
    pub fn is_product_variant(&self) -> bool {
        matches!(self.merchandise, Merchandise::ProductVariant { .. })
    }

    /// Variant id, for product variant lines only.
    pub fn product_variant_id(&self) -> Option<&str> {
        match &self.merchandise {
            Merchandise::ProductVariant { id } => Some(id),
            Merchandise::Other { .. } => None,
        }
    }
}

/// Immutable snapshot of a cart, built once per evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    subtotal_price: Decimal,
    line_items: SmallVec<[LineItem; 8]>,
}

impl CartSnapshot {
    /// Build a snapshot from a raw cart payload.
    ///
    /// # Errors
    ///
    /// Returns a `CartError` if the subtotal is missing, if any amount is not a
    /// decimal, or if a product variant line has no id.
    pub fn from_raw(raw: &RawCart) -> Result<Self, CartError> {
        let subtotal = raw
            .subtotal_price
            .as_ref()
            .or_else(|| raw.cost.as_ref().map(|cost| &cost.subtotal_amount))
            .ok_or(CartError::MissingSubtotal)?;

        let subtotal_price =
            parse_amount(subtotal).ok_or_else(|| CartError::InvalidSubtotal(subtotal.clone()))?;

        let line_items = raw
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| classify_line(index, line))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            subtotal_price,
            line_items,
        })
    }

    /// Cart subtotal
    pub fn subtotal_price(&self) -> Decimal {
        self.subtotal_price
    }

    /// Lines in cart order
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    /// Look up a line by id.
    pub fn line(&self, id: LineId) -> Option<&LineItem> {
        self.line_items.get(id.0)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.line_items.len()
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }
}

fn classify_line(index: usize, line: &RawLine) -> Result<LineItem, CartError> {
    let total_price = parse_amount(&line.cost.total_amount)
        .ok_or_else(|| CartError::InvalidLineTotal(index, line.cost.total_amount.clone()))?;

    let merchandise = if line.merchandise.typename == PRODUCT_VARIANT_TYPENAME {
        let id = line
            .merchandise
            .id
            .clone()
            .ok_or(CartError::MissingVariantId(index))?;

        Merchandise::ProductVariant { id }
    } else {
        Merchandise::Other {
            typename: line.merchandise.typename.clone(),
        }
    };

    Ok(LineItem {
        id: LineId(index),
        total_price,
        merchandise,
    })
}

/// Parse a raw amount as an exact decimal.
pub fn parse_amount(amount: &RawAmount) -> Option<Decimal> {
    match amount {
        RawAmount::Text(text) => parse_decimal(text.trim()),
        RawAmount::Number(number) => parse_decimal(&number.to_string()),
        RawAmount::Money { amount } => parse_amount(amount),
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

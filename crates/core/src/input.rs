//! Input documents
//!
//! Raw, platform-shaped payloads as they arrive for a single evaluation. Nothing
//! here is validated beyond its JSON structure; [`crate::cart::CartSnapshot`]
//! does the typing.

use std::fmt;

use serde::Deserialize;

/// The full evaluation input: a cart, plus the discount node carrying the
/// stored configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionInput {
    /// Cart payload
    pub cart: RawCart,

    /// Discount node holding the configuration metafield
    #[serde(default, rename = "discountNode")]
    pub discount_node: Option<DiscountNode>,
}

impl FunctionInput {
    /// Parse an input document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if the text is not a structurally valid input document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Raw configuration metafield value, if one is attached.
    pub fn metafield_value(&self) -> Option<&str> {
        self.discount_node
            .as_ref()
            .and_then(|node| node.metafield.as_ref())
            .map(|metafield| metafield.value.as_str())
    }
}

/// Discount node
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountNode {
    /// Configuration metafield
    #[serde(default)]
    pub metafield: Option<Metafield>,
}

/// Metafield
#[derive(Debug, Clone, Deserialize)]
pub struct Metafield {
    /// JSON-encoded configuration
    pub value: String,
}

/// Raw cart payload.
///
/// The subtotal is read from `subtotal_price`, falling back to the platform's
/// `cost.subtotalAmount`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCart {
    /// Flat subtotal
    #[serde(default, alias = "subtotalPrice")]
    pub subtotal_price: Option<RawAmount>,

    /// Platform cost block
    #[serde(default)]
    pub cost: Option<RawCartCost>,

    /// Cart lines, in cart order
    #[serde(default)]
    pub lines: Vec<RawLine>,
}

/// Cart-level cost block
#[derive(Debug, Clone, Deserialize)]
pub struct RawCartCost {
    /// Cart subtotal
    #[serde(rename = "subtotalAmount")]
    pub subtotal_amount: RawAmount,
}

/// Raw cart line
#[derive(Debug, Clone, Deserialize)]
pub struct RawLine {
    /// What the line is buying
    pub merchandise: RawMerchandise,

    /// Line cost block
    pub cost: RawLineCost,
}

/// Raw merchandise reference
#[derive(Debug, Clone, Deserialize)]
pub struct RawMerchandise {
    /// GraphQL type name, e.g. `ProductVariant`
    #[serde(rename = "typename", alias = "__typename")]
    pub typename: String,

    /// Merchandise id; required for product variants
    #[serde(default)]
    pub id: Option<String>,
}

/// Line-level cost block
#[derive(Debug, Clone, Deserialize)]
pub struct RawLineCost {
    /// Line total
    #[serde(rename = "totalAmount")]
    pub total_amount: RawAmount,
}

/// An unparsed amount: a decimal string, a JSON number, or a `{ amount }` object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    /// Decimal string, e.g. `"12.50"`
    Text(String),

    /// JSON number
    Number(serde_json::Number),

    /// Platform money object
    Money {
        /// Wrapped amount
        amount: Box<RawAmount>,
    },
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawAmount::Text(text) => write!(f, "{text:?}"),
            RawAmount::Number(number) => write!(f, "{number}"),
            RawAmount::Money { amount } => write!(f, "{{ amount: {amount} }}"),
        }
    }
}

//! Runtime values
//!
//! Cart-backed values hold line indexes into the snapshot rather than
//! references, so a value can never outlive or alter the data it points at.

use std::fmt;

use rust_decimal::Decimal;

/// A value produced while evaluating a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    Nil,
    Bool(bool),
    Number(Decimal),
    Str(String),

    /// The `Input` binding
    Input,

    /// The cart snapshot
    Cart,

    /// The cart's line items
    LineItems,

    /// A line item, by position
    Line(usize),

    /// A line's merchandise
    Variant(usize),

    /// A line's product
    Product(usize),
}

impl Value {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Input => "input",
            Value::Cart => "cart",
            Value::LineItems => "line items",
            Value::Line(_) => "line item",
            Value::Variant(_) => "variant",
            Value::Product(_) => "product",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Number(number) => write!(f, "{}", number.normalize()),
            Value::Str(text) => write!(f, "{text}"),
            Value::Input => write!(f, "Input"),
            Value::Cart => write!(f, "cart"),
            Value::LineItems => write!(f, "line_items"),
            Value::Line(index) => write!(f, "line {index}"),
            Value::Variant(index) => write!(f, "variant of line {index}"),
            Value::Product(index) => write!(f, "product of line {index}"),
        }
    }
}

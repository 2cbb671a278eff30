//! Cartscript
//!
//! Cartscript evaluates merchant-authored discount scripts against a storefront
//! cart inside a bounded sandbox, and turns the prices they propose into a
//! discount result document.
//!
//! ```
//! use cartscript::{configuration::Configuration, evaluation::Evaluator, input::FunctionInput};
//!
//! let input = FunctionInput::from_json(r#"{
//!     "cart": {
//!         "subtotal_price": "50.00",
//!         "lines": [{
//!             "merchandise": { "typename": "ProductVariant", "id": "gid://A" },
//!             "cost": { "totalAmount": "50.00" }
//!         }]
//!     }
//! }"#)?;
//!
//! let configuration = Configuration::new(
//!     r#"cart.line_items.first.change_line_price(45, message: "10% off");"#,
//! );
//!
//! let evaluation = Evaluator::default().evaluate_cart(&input.cart, Some(&configuration));
//!
//! assert_eq!(evaluation.result.discounts.len(), 1);
//! # Ok::<(), serde_json::Error>(())
//! ```

pub mod assembler;
pub mod cart;
pub mod compile;
pub mod configuration;
pub mod discounts;
pub mod effects;
pub mod evaluation;
pub mod fixtures;
pub mod input;
pub mod script;

pub use evaluation::run;

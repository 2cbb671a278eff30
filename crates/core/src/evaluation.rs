//! Evaluation
//!
//! One evaluation turns one input document into one result document. Every
//! failure along the way is absorbed here: the caller always receives a valid
//! result, and the failure is only reported as a [`Diagnostic`] and in logs.

use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::{
    assembler::{Assembly, assemble},
    cart::{CartError, CartSnapshot},
    configuration::{Configuration, ConfigurationError},
    discounts::DiscountResult,
    effects::MutationEvent,
    input::{FunctionInput, RawCart},
    script::{ExecutionLimits, ExecutionOutcome, ScriptError, ScriptHost},
};

/// Why an evaluation fell back to the empty discount.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// No script is configured.
    #[error("No discount script is configured")]
    ConfigurationMissing,

    /// The stored configuration could not be read.
    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigurationError),

    /// The script failed to load or faulted while running.
    #[error("Script faulted: {0}")]
    ExecutionFault(#[source] ScriptError),

    /// The script ran out of steps or time.
    #[error("Script exceeded its budget: {0}")]
    ExecutionTimeout(#[source] ScriptError),

    /// The cart payload could not be turned into a snapshot.
    #[error("Malformed input: {0}")]
    MalformedInput(#[from] CartError),
}

/// Non-fatal detail about how a result was produced.
#[derive(Debug)]
pub enum Diagnostic {
    /// The evaluation failed and the empty discount was returned.
    Failed(EvaluationError),

    /// The script completed without targeting any eligible line.
    NoQualifyingLines,
}

/// Result of one evaluation.
#[derive(Debug)]
pub struct Evaluation {
    /// The output document, always valid
    pub result: DiscountResult,

    /// Set when the result is empty for a notable reason
    pub diagnostic: Option<Diagnostic>,

    /// Events recorded by a completed run, empty otherwise
    pub events: Vec<MutationEvent>,
}

impl Evaluation {
    fn failed(error: EvaluationError) -> Self {
        Self {
            result: DiscountResult::empty(),
            diagnostic: Some(Diagnostic::Failed(error)),
            events: Vec::new(),
        }
    }

    /// The absorbed failure, if any.
    pub fn error(&self) -> Option<&EvaluationError> {
        match &self.diagnostic {
            Some(Diagnostic::Failed(error)) => Some(error),
            Some(Diagnostic::NoQualifyingLines) | None => None,
        }
    }
}

/// Runs stored scripts against carts.
///
/// Holds only immutable limits; every evaluation builds its own snapshot,
/// host and accumulator, so one evaluator can serve any number of threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    limits: ExecutionLimits,
}

impl Evaluator {
    /// Create an evaluator with the given limits.
    pub fn new(limits: ExecutionLimits) -> Self {
        Self { limits }
    }

    /// Limits applied to each run.
    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Evaluate an input document, reading the script from its metafield.
    pub fn evaluate(&self, input: &FunctionInput) -> Evaluation {
        let span = info_span!("evaluate", lines = input.cart.lines.len());
        let _entered = span.enter();

        match Configuration::from_metafield(input.metafield_value()) {
            Ok(configuration) => self.run_configured(&input.cart, configuration.as_ref()),
            Err(error) => {
                warn!(%error, "unreadable configuration, returning empty discount");

                Evaluation::failed(error.into())
            }
        }
    }

    /// Evaluate a cart with an explicit configuration.
    pub fn evaluate_cart(
        &self,
        cart: &RawCart,
        configuration: Option<&Configuration>,
    ) -> Evaluation {
        let span = info_span!("evaluate", lines = cart.lines.len());
        let _entered = span.enter();

        self.run_configured(cart, configuration)
    }

    /// Parse and evaluate a JSON input document.
    pub fn evaluate_json(&self, document: &str) -> Evaluation {
        match FunctionInput::from_json(document) {
            Ok(input) => self.evaluate(&input),
            Err(error) => {
                warn!(%error, "unreadable input document, returning empty discount");

                Evaluation::failed(CartError::Document(error).into())
            }
        }
    }

    fn run_configured(
        &self,
        cart: &RawCart,
        configuration: Option<&Configuration>,
    ) -> Evaluation {
        let Some(configuration) = configuration.filter(|stored| !stored.is_blank()) else {
            debug!("no script configured");

            return Evaluation::failed(EvaluationError::ConfigurationMissing);
        };

        let snapshot = match CartSnapshot::from_raw(cart) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(%error, "malformed cart, returning empty discount");

                return Evaluation::failed(error.into());
            }
        };

        let mut host = ScriptHost::new(self.limits);

        if let Err(error) = host.load(&configuration.code) {
            warn!(%error, "script failed to load");

            return Evaluation::failed(EvaluationError::ExecutionFault(error));
        }

        match host.run(&snapshot) {
            ExecutionOutcome::Completed { events, steps } => {
                let assembly = assemble(&events);

                debug!(steps, events = events.len(), "assembled result");

                let diagnostic = match assembly {
                    Assembly::Discounted(_) => None,
                    Assembly::NoQualifyingLines => {
                        info!("no cart lines qualify for the discount");

                        Some(Diagnostic::NoQualifyingLines)
                    }
                };

                Evaluation {
                    result: assembly.into_result(),
                    diagnostic,
                    events,
                }
            }
            ExecutionOutcome::Faulted(error) => {
                warn!(%error, "script faulted, returning empty discount");

                Evaluation::failed(EvaluationError::ExecutionFault(error))
            }
            ExecutionOutcome::TimedOut(error) => {
                warn!(%error, "script exceeded its budget, returning empty discount");

                Evaluation::failed(EvaluationError::ExecutionTimeout(error))
            }
        }
    }
}

/// Evaluate `input` with default limits. Never fails.
pub fn run(input: &FunctionInput) -> DiscountResult {
    Evaluator::default().evaluate(input).result
}

#[cfg(test)]
mod tests {
    use rust_decimal::dec;
    use serde_json::json;
    use testresult::TestResult;

    use super::*;
    use crate::discounts::DiscountApplicationStrategy;

    fn input(code: Option<&str>) -> FunctionInput {
        let mut document = json!({
            "cart": {
                "subtotal_price": "100.00",
                "lines": [
                    { "merchandise": { "typename": "ProductVariant", "id": "gid://A" },
                      "cost": { "totalAmount": "50.00" } },
                    { "merchandise": { "typename": "ProductVariant", "id": "gid://B" },
                      "cost": { "totalAmount": "30.00" } },
                    { "merchandise": { "typename": "GiftCard" },
                      "cost": { "totalAmount": "20.00" } }
                ]
            }
        });

        if let Some(code) = code {
            document["discountNode"] = json!({
                "metafield": { "value": Configuration::new(code).to_metafield_value() }
            });
        }

        serde_json::from_value(document).expect("input should deserialize")
    }

    #[test]
    fn missing_configuration_yields_empty_result() {
        let evaluation = Evaluator::default().evaluate(&input(None));

        assert!(evaluation.result.is_empty());
        assert!(matches!(
            evaluation.error(),
            Some(EvaluationError::ConfigurationMissing)
        ));
    }

    #[test]
    fn blank_code_is_missing_configuration() {
        let cart = input(None).cart;
        let evaluation =
            Evaluator::default().evaluate_cart(&cart, Some(&Configuration::new(" \n\t ")));

        assert!(evaluation.result.is_empty());
        assert!(evaluation.events.is_empty());
        assert!(matches!(
            evaluation.error(),
            Some(EvaluationError::ConfigurationMissing)
        ));
    }

    #[test]
    fn discounts_eligible_lines() -> TestResult {
        let evaluation = Evaluator::default().evaluate(&input(Some(
            r#"
            cart.line_items[0].change_line_price(45, message: "Volume discount");
            cart.line_items[1].change_line_price(27, message: "Volume discount");
            "#,
        )));

        assert!(evaluation.diagnostic.is_none());
        assert_eq!(evaluation.events.len(), 2);
        assert_eq!(
            evaluation.result.discount_application_strategy,
            DiscountApplicationStrategy::Maximum
        );

        let discount = evaluation.result.discounts.first().ok_or("missing discount")?;

        assert_eq!(discount.value.ratio(), dec!(0.9));
        assert_eq!(discount.message, "Volume discount");
        assert_eq!(discount.targets.len(), 2);

        Ok(())
    }

    #[test]
    fn gift_card_only_reports_no_qualifying_lines() {
        let evaluation = Evaluator::default()
            .evaluate(&input(Some("cart.line_items.last.change_line_price(10);")));

        assert!(evaluation.result.is_empty());
        assert_eq!(evaluation.events.len(), 1);
        assert!(matches!(
            evaluation.diagnostic,
            Some(Diagnostic::NoQualifyingLines)
        ));
    }

    #[test]
    fn faults_discard_events() {
        let evaluation = Evaluator::default().evaluate(&input(Some(
            r#"cart.line_items.first.change_line_price(45); raise "boom";"#,
        )));

        assert!(evaluation.result.is_empty());
        assert!(evaluation.events.is_empty());
        assert!(matches!(
            evaluation.error(),
            Some(EvaluationError::ExecutionFault(_))
        ));
    }

    #[test]
    fn load_failures_are_faults() {
        let evaluation = Evaluator::default().evaluate(&input(Some("let = ;")));

        assert!(matches!(
            evaluation.error(),
            Some(EvaluationError::ExecutionFault(ScriptError::Parse(_)))
        ));
    }

    #[test]
    fn budget_exhaustion_is_a_timeout() {
        let evaluator = Evaluator::new(ExecutionLimits {
            max_steps: 500,
            ..ExecutionLimits::default()
        });

        let evaluation = evaluator.evaluate(&input(Some("while true { }")));

        assert!(evaluation.result.is_empty());
        assert!(matches!(
            evaluation.error(),
            Some(EvaluationError::ExecutionTimeout(_))
        ));
    }

    #[test]
    fn unreadable_configuration_is_absorbed() -> TestResult {
        let mut input = input(None);
        input.discount_node = serde_json::from_value(json!({
            "metafield": { "value": "{not json" }
        }))?;

        let evaluation = Evaluator::default().evaluate(&input);

        assert!(evaluation.result.is_empty());
        assert!(matches!(
            evaluation.error(),
            Some(EvaluationError::InvalidConfiguration(_))
        ));

        Ok(())
    }

    #[test]
    fn malformed_input_is_absorbed() {
        let evaluator = Evaluator::default();

        let evaluation = evaluator.evaluate_json(r#"{"cart": {"lines": "nope"}}"#);
        assert!(evaluation.result.is_empty());
        assert!(matches!(
            evaluation.error(),
            Some(EvaluationError::MalformedInput(CartError::Document(_)))
        ));

        let evaluation = evaluator.evaluate_json(
            r#"{"cart": {"lines": []}, "discountNode": {"metafield": {"value": "{\"code\": \"nil;\"}"}}}"#,
        );
        assert!(matches!(
            evaluation.error(),
            Some(EvaluationError::MalformedInput(CartError::MissingSubtotal))
        ));
    }

    #[test]
    fn run_never_fails() {
        assert!(run(&input(Some("1 / 0;"))).is_empty());
    }

    #[test]
    fn evaluator_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<Evaluator>();
    }
}

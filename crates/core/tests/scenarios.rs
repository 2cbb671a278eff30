//! Scenario fixtures

use cartscript::{
    evaluation::Evaluator,
    fixtures::{ExpectedOutcome, Fixture, Scenario},
};
use testresult::TestResult;

fn fixture() -> Fixture {
    Fixture::with_base_path(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"))
}

fn check(scenario: &Scenario) -> TestResult {
    let evaluator = Evaluator::new(scenario.execution_limits());
    let evaluation = evaluator.evaluate_cart(&scenario.cart, scenario.configuration().as_ref());

    assert_eq!(
        ExpectedOutcome::of(&evaluation),
        scenario.outcome,
        "{}: unexpected outcome ({:?})",
        scenario.name,
        evaluation.diagnostic
    );
    assert_eq!(
        evaluation.result.to_json()?,
        scenario.expected,
        "{}: unexpected result",
        scenario.name
    );

    Ok(())
}

#[test]
fn all_scenarios_pass() -> TestResult {
    let scenarios = fixture().load_scenarios()?;

    assert!(scenarios.len() >= 11, "scenario fixtures are missing");

    for scenario in &scenarios {
        check(scenario)?;
    }

    Ok(())
}

#[test]
fn volume_discount() -> TestResult {
    check(&fixture().load_scenario("01_volume_discount")?)
}

#[test]
fn gift_card_only() -> TestResult {
    check(&fixture().load_scenario("02_gift_card_only")?)
}

#[test]
fn raise_discards_events() -> TestResult {
    check(&fixture().load_scenario("03_raise_discards_events")?)
}

#[test]
fn unbounded_loop() -> TestResult {
    check(&fixture().load_scenario("04_unbounded_loop")?)
}

#[test]
fn evaluation_is_repeatable() -> TestResult {
    let scenario = fixture().load_scenario("10_tiered_rate")?;
    let evaluator = Evaluator::new(scenario.execution_limits());
    let configuration = scenario.configuration();

    let first = evaluator.evaluate_cart(&scenario.cart, configuration.as_ref());
    let second = evaluator.evaluate_cart(&scenario.cart, configuration.as_ref());

    assert_eq!(first.result, second.result);
    assert_eq!(first.events, second.events);

    Ok(())
}

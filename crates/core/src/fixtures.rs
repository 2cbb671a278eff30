//! Fixtures
//!
//! YAML scenarios: a script, a cart, and the result document it must produce.

use std::{fs, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    configuration::Configuration,
    evaluation::{Diagnostic, Evaluation, EvaluationError},
    input::RawCart,
    script::ExecutionLimits,
};

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),
}

/// How a scenario's evaluation is expected to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutcome {
    /// Completed with at least one discounted line
    #[default]
    Discounted,

    /// Completed without targeting an eligible line
    NoQualifyingLines,

    /// No script configured
    ConfigurationMissing,

    /// Stored configuration unreadable
    InvalidConfiguration,

    /// Script failed to load or faulted
    Fault,

    /// Script exhausted its budget
    Timeout,

    /// Cart payload was rejected
    MalformedInput,
}

impl ExpectedOutcome {
    /// How `evaluation` actually ended.
    pub fn of(evaluation: &Evaluation) -> Self {
        match &evaluation.diagnostic {
            None => ExpectedOutcome::Discounted,
            Some(Diagnostic::NoQualifyingLines) => ExpectedOutcome::NoQualifyingLines,
            Some(Diagnostic::Failed(error)) => match error {
                EvaluationError::ConfigurationMissing => ExpectedOutcome::ConfigurationMissing,
                EvaluationError::InvalidConfiguration(_) => ExpectedOutcome::InvalidConfiguration,
                EvaluationError::ExecutionFault(_) => ExpectedOutcome::Fault,
                EvaluationError::ExecutionTimeout(_) => ExpectedOutcome::Timeout,
                EvaluationError::MalformedInput(_) => ExpectedOutcome::MalformedInput,
            },
        }
    }
}

/// Limit overrides for a scenario.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitOverrides {
    /// Step budget
    #[serde(default)]
    pub max_steps: Option<u64>,

    /// Proposal budget
    #[serde(default)]
    pub max_proposals: Option<usize>,
}

/// One scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,

    /// What the scenario demonstrates
    #[serde(default)]
    pub description: Option<String>,

    /// Stored script, if any
    #[serde(default)]
    pub script: Option<String>,

    /// Raw cart payload
    pub cart: RawCart,

    /// Expected result document
    pub expected: serde_json::Value,

    /// Expected ending
    #[serde(default)]
    pub outcome: ExpectedOutcome,

    /// Limit overrides
    #[serde(default)]
    pub limits: LimitOverrides,
}

impl Scenario {
    /// Stored configuration for the scenario's script.
    pub fn configuration(&self) -> Option<Configuration> {
        self.script.as_deref().map(Configuration::new)
    }

    /// Default limits with the scenario's overrides applied.
    pub fn execution_limits(&self) -> ExecutionLimits {
        let defaults = ExecutionLimits::default();

        ExecutionLimits {
            max_steps: self.limits.max_steps.unwrap_or(defaults.max_steps),
            max_proposals: self.limits.max_proposals.unwrap_or(defaults.max_proposals),
            ..defaults
        }
    }
}

/// Fixture
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Create a fixture set with the default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a fixture set with a custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Load a scenario from `scenarios/<name>.yml`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_scenario(&self, name: &str) -> Result<Scenario, FixtureError> {
        let file_path = self.base_path.join("scenarios").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;

        Ok(serde_norway::from_str(&contents)?)
    }

    /// Names of all scenarios, sorted
    ///
    /// # Errors
    ///
    /// Returns an error if the scenarios directory cannot be read.
    pub fn scenario_names(&self) -> Result<Vec<String>, FixtureError> {
        let mut names = Vec::new();

        for entry in fs::read_dir(self.base_path.join("scenarios"))? {
            let path = entry?.path();

            if path.extension().is_some_and(|ext| ext == "yml")
                && let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
            {
                names.push(stem.to_string());
            }
        }

        names.sort();

        Ok(names)
    }

    /// Load every scenario, sorted by file name
    ///
    /// # Errors
    ///
    /// Returns an error if any scenario cannot be read or parsed.
    pub fn load_scenarios(&self) -> Result<Vec<Scenario>, FixtureError> {
        self.scenario_names()?
            .iter()
            .map(|name| self.load_scenario(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use testresult::TestResult;

    use super::*;

    const SCENARIO: &str = r#"
name: single line
script: |
  cart.line_items.first.change_line_price(9);
cart:
  subtotal_price: "10.00"
  lines:
    - merchandise: { typename: ProductVariant, id: "gid://A" }
      cost: { totalAmount: "10.00" }
expected:
  discountApplicationStrategy: Maximum
limits:
  max_steps: 50
"#;

    #[test]
    fn loads_scenarios_from_directory() -> TestResult {
        let dir = tempfile::tempdir()?;
        let scenarios = dir.path().join("scenarios");
        fs::create_dir(&scenarios)?;
        fs::write(scenarios.join("b_single.yml"), SCENARIO)?;
        fs::write(scenarios.join("a_single.yml"), SCENARIO)?;
        fs::write(scenarios.join("notes.txt"), "ignored")?;

        let fixture = Fixture::with_base_path(dir.path());

        assert_eq!(fixture.scenario_names()?, vec!["a_single", "b_single"]);

        let scenario = fixture.load_scenario("a_single")?;

        assert_eq!(scenario.name, "single line");
        assert_eq!(scenario.cart.lines.len(), 1);
        assert_eq!(scenario.outcome, ExpectedOutcome::Discounted);
        assert_eq!(scenario.execution_limits().max_steps, 50);
        assert!(scenario.configuration().is_some());

        Ok(())
    }

    #[test]
    fn missing_file_is_io_error() {
        let fixture = Fixture::with_base_path("/definitely/not/here");

        assert!(matches!(
            fixture.load_scenario("nothing"),
            Err(FixtureError::Io(_))
        ));
    }

    #[test]
    fn invalid_yaml_is_yaml_error() -> TestResult {
        let dir = tempfile::tempdir()?;
        let scenarios = dir.path().join("scenarios");
        fs::create_dir(&scenarios)?;
        fs::write(scenarios.join("broken.yml"), "name: [unterminated")?;

        let fixture = Fixture::with_base_path(dir.path());

        assert!(matches!(
            fixture.load_scenario("broken"),
            Err(FixtureError::Yaml(_))
        ));

        Ok(())
    }
}

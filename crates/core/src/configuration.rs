//! Configuration
//!
//! The stored discount configuration: a JSON document `{"code": "..."}` kept in
//! the discount's metafield.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The metafield is not a configuration document.
    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// A stored, already compiled discount script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Script text
    pub code: String,
}

#[derive(Debug, Deserialize)]
struct StoredConfiguration {
    #[serde(default)]
    code: Option<String>,
}

impl Configuration {
    /// Wrap compiled script text.
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    /// Read the configuration from a metafield value.
    ///
    /// An absent metafield, an absent `code` key and blank code all mean
    /// "no script" and yield `None`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if the value is not valid JSON of the
    /// expected shape.
    pub fn from_metafield(value: Option<&str>) -> Result<Option<Self>, ConfigurationError> {
        let Some(value) = value else {
            return Ok(None);
        };

        let stored: StoredConfiguration = serde_json::from_str(value)?;

        Ok(stored
            .code
            .filter(|code| !code.trim().is_empty())
            .map(Self::new))
    }

    /// Whether the code is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.code.trim().is_empty()
    }

    /// Render as a metafield value.
    pub fn to_metafield_value(&self) -> String {
        serde_json::json!({ "code": self.code }).to_string()
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn missing_and_blank_code_mean_no_script() -> TestResult {
        assert_eq!(Configuration::from_metafield(None)?, None);
        assert_eq!(Configuration::from_metafield(Some("{}"))?, None);
        assert_eq!(Configuration::from_metafield(Some(r#"{"code": ""}"#))?, None);
        assert_eq!(Configuration::from_metafield(Some(r#"{"code": "  \n"}"#))?, None);
        assert_eq!(Configuration::from_metafield(Some(r#"{"code": null}"#))?, None);

        Ok(())
    }

    #[test]
    fn blank_code() {
        assert!(Configuration::new("").is_blank());
        assert!(Configuration::new(" \t\n").is_blank());
        assert!(!Configuration::new("nil;").is_blank());
    }

    #[test]
    fn reads_code() -> TestResult {
        let configuration = Configuration::from_metafield(Some(r#"{"code": "nil;"}"#))?;

        assert_eq!(configuration, Some(Configuration::new("nil;")));

        Ok(())
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(Configuration::from_metafield(Some("not json")).is_err());
        assert!(Configuration::from_metafield(Some(r#"{"code": 5}"#)).is_err());
    }

    #[test]
    fn metafield_value_round_trips() -> TestResult {
        let configuration = Configuration::new("raise \"quoted\";");
        let value = configuration.to_metafield_value();

        assert_eq!(value, r#"{"code":"raise \"quoted\";"}"#);
        assert_eq!(
            Configuration::from_metafield(Some(&value))?,
            Some(configuration)
        );

        Ok(())
    }
}

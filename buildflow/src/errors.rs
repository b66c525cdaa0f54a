//! Error types for the buildflow engine.
//!
//! Per-platform build failures are never reported through these types; they
//! are captured as data inside a failed [`BuildResult`](crate::core::BuildResult).
//! `BuildflowError` covers malformed calls and invalid configuration only.

use std::collections::HashMap;
use thiserror::Error;

/// The main error type for buildflow operations.
#[derive(Debug, Error)]
pub enum BuildflowError {
    /// The caller supplied invalid input (e.g. an empty platform list).
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Executor options failed validation.
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig {
        /// The offending option.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A recovery strategy name did not match any known strategy.
    #[error("Unknown recovery strategy: {0}")]
    UnknownStrategy(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BuildflowError {
    /// Creates the error returned when an executor is called without platforms.
    #[must_use]
    pub fn no_platforms() -> Self {
        Self::Validation("No platforms specified for build".to_string())
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error was caused by caller input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidConfig { .. })
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        let kind = match self {
            Self::Validation(_) => "ValidationError",
            Self::InvalidConfig { field, .. } => {
                map.insert("field".to_string(), serde_json::json!(field));
                "InvalidConfigError"
            }
            Self::UnknownStrategy(name) => {
                map.insert("strategy".to_string(), serde_json::json!(name));
                "UnknownStrategyError"
            }
            Self::Serialization(_) => "SerializationError",
        };

        map.insert("type".to_string(), serde_json::json!(kind));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_platforms_is_validation() {
        let err = BuildflowError::no_platforms();
        assert!(err.is_validation());
        assert!(err.to_string().contains("No platforms specified"));
    }

    #[test]
    fn test_invalid_config_message() {
        let err = BuildflowError::invalid_config("max_concurrency", "must be at least 1");
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: max_concurrency - must be at least 1"
        );
    }

    #[test]
    fn test_to_dict() {
        let err = BuildflowError::UnknownStrategy("rollback".to_string());
        let dict = err.to_dict();

        assert_eq!(dict.get("type").unwrap(), "UnknownStrategyError");
        assert_eq!(dict.get("strategy").unwrap(), "rollback");
        assert!(!err.is_validation());
    }
}

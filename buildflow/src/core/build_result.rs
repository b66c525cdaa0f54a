//! Outcome of a single platform build.

use super::{BuildError, Platform};
use crate::utils::iso_timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of one platform build.
///
/// `success == false` always comes with at least one error, and
/// `success == true` never carries errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    /// The platform that was built.
    pub platform: Platform,
    /// Whether the build succeeded.
    pub success: bool,
    /// Location of the produced package; empty on failure.
    pub package_path: String,
    /// Build duration in milliseconds.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    /// Non-fatal warnings, in emission order.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Errors, in emission order. Empty on success.
    #[serde(default)]
    pub errors: Vec<BuildError>,
    /// Free-form metadata, always containing `timestamp`.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl BuildResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(
        platform: impl Into<Platform>,
        package_path: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            platform: platform.into(),
            success: true,
            package_path: package_path.into(),
            duration_ms,
            warnings: Vec::new(),
            errors: Vec::new(),
            metadata: timestamp_metadata(),
        }
    }

    /// Creates a failed result.
    ///
    /// An empty `errors` list is replaced with a generic `BUILD_FAILED` error.
    #[must_use]
    pub fn failure(platform: impl Into<Platform>, duration_ms: u64, errors: Vec<BuildError>) -> Self {
        let platform = platform.into();
        let errors = if errors.is_empty() {
            vec![BuildError::build_failed(platform.clone(), "Unknown build error")]
        } else {
            errors
        };

        Self {
            platform,
            success: false,
            package_path: String::new(),
            duration_ms,
            warnings: Vec::new(),
            errors,
            metadata: timestamp_metadata(),
        }
    }

    /// A failed result with a single `BUILD_FAILED` error.
    #[must_use]
    pub fn build_failed(platform: impl Into<Platform>, duration_ms: u64, message: impl Into<String>) -> Self {
        let platform = platform.into();
        let error = BuildError::build_failed(platform.clone(), message);
        Self::failure(platform, duration_ms, vec![error])
    }

    /// A failed result for a build that exceeded its timeout.
    #[must_use]
    pub fn timed_out(platform: impl Into<Platform>, timeout_ms: u64) -> Self {
        let platform = platform.into();
        let error = BuildError::timed_out(platform.clone(), timeout_ms);
        Self::failure(platform, timeout_ms, vec![error])
    }

    /// A failed result for a build that was cancelled or never started.
    #[must_use]
    pub fn cancelled(platform: impl Into<Platform>, duration_ms: u64) -> Self {
        let platform = platform.into();
        let error = BuildError::cancelled(platform.clone());
        Self::failure(platform, duration_ms, vec![error])
    }

    /// Adds a warning.
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns true if any error carries the given code.
    #[must_use]
    pub fn has_error_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Returns the first error, if any.
    #[must_use]
    pub fn primary_error(&self) -> Option<&BuildError> {
        self.errors.first()
    }
}

fn timestamp_metadata() -> HashMap<String, serde_json::Value> {
    let mut metadata = HashMap::new();
    metadata.insert("timestamp".to_string(), serde_json::json!(iso_timestamp()));
    metadata
}

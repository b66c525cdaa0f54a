//! Structured per-platform build failures.

use super::Platform;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Stable error codes used by the executors and recovery strategies.
pub mod error_codes {
    /// The build function reported an error.
    pub const BUILD_FAILED: &str = "BUILD_FAILED";
    /// The build did not finish within the configured timeout.
    pub const BUILD_TIMEOUT: &str = "BUILD_TIMEOUT";
    /// The build was cancelled before completion.
    pub const BUILD_CANCELLED: &str = "BUILD_CANCELLED";
    /// The build task panicked.
    pub const BUILD_PANICKED: &str = "BUILD_PANICKED";
    /// A platform identifier was not recognised by the caller's configuration.
    pub const CONFIG_INVALID_PLATFORM: &str = "CONFIG_INVALID_PLATFORM";
    /// A network operation failed.
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
}

/// Remediation hints attached to a generic build failure.
pub const GENERIC_BUILD_SUGGESTIONS: [&str; 3] = [
    "Check build logs for detailed error information",
    "Verify platform-specific configuration is correct",
    "Ensure all dependencies are installed",
];

/// Severity of a build error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Non-fatal issue.
    Warning,
    /// The build failed.
    #[default]
    Error,
    /// The failure affects the whole run.
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A structured build failure.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("[{code}] {message}")]
#[serde(rename_all = "camelCase")]
pub struct BuildError {
    /// Stable identifier, e.g. `BUILD_TIMEOUT`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Severity.
    pub severity: ErrorSeverity,
    /// Broad category, e.g. "build", "configuration", "platform".
    pub category: String,
    /// The platform that failed, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// Free-form diagnostic payload.
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
    /// Remediation hints.
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Documentation references.
    #[serde(default)]
    pub documentation: Vec<String>,
}

impl BuildError {
    /// Creates a new error with `error` severity.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity: ErrorSeverity::Error,
            category: category.into(),
            platform: None,
            context: HashMap::new(),
            suggestions: Vec::new(),
            documentation: Vec::new(),
        }
    }

    /// A `BUILD_FAILED` error carrying the generic remediation hints.
    #[must_use]
    pub fn build_failed(platform: impl Into<Platform>, message: impl Into<String>) -> Self {
        Self::new(error_codes::BUILD_FAILED, message, "build")
            .with_platform(platform)
            .with_suggestions(GENERIC_BUILD_SUGGESTIONS)
    }

    /// A `BUILD_TIMEOUT` error for a build that exceeded `timeout_ms`.
    #[must_use]
    pub fn timed_out(platform: impl Into<Platform>, timeout_ms: u64) -> Self {
        Self::new(
            error_codes::BUILD_TIMEOUT,
            format!("Build timed out after {timeout_ms}ms"),
            "build",
        )
        .with_platform(platform)
        .with_context("timeoutMs", serde_json::json!(timeout_ms))
        .with_suggestion("Increase the build timeout")
        .with_suggestion("Check whether the build is waiting on an unavailable resource")
    }

    /// A `BUILD_CANCELLED` error for a build that did not run to completion.
    #[must_use]
    pub fn cancelled(platform: impl Into<Platform>) -> Self {
        Self::new(
            error_codes::BUILD_CANCELLED,
            "Build cancelled before completion",
            "build",
        )
        .with_platform(platform)
        .with_severity(ErrorSeverity::Warning)
        .with_suggestion("Re-run the build for this platform")
    }

    /// Sets the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the failing platform.
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<Platform>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Adds a context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Marks the error as not recoverable.
    #[must_use]
    pub fn non_recoverable(self) -> Self {
        self.with_context("recoverable", serde_json::Value::Bool(false))
    }

    /// Adds a remediation hint.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Adds several remediation hints.
    #[must_use]
    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions.extend(suggestions.into_iter().map(Into::into));
        self
    }

    /// Adds a documentation reference.
    #[must_use]
    pub fn with_documentation(mut self, reference: impl Into<String>) -> Self {
        self.documentation.push(reference.into());
        self
    }

    /// Returns false only when the context explicitly says `recoverable: false`.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self.context.get("recoverable"),
            Some(serde_json::Value::Bool(false))
        )
    }

    /// Returns true for the configuration category (long or short form).
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self.category.as_str(), "configuration" | "config")
    }
}

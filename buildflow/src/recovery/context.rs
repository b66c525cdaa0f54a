//! Recovery inputs and outputs.

use crate::core::{BuildError, Platform};
use crate::errors::BuildflowError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Default number of retry attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// The four recovery strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryStrategyKind {
    /// Run the failed build again after a backoff delay.
    Retry,
    /// Drop the failed platform and carry on with the rest.
    Skip,
    /// Use cached artifacts or a default configuration.
    Fallback,
    /// Stop the whole build.
    Abort,
}

impl RecoveryStrategyKind {
    /// All kinds, in decision-table order.
    pub const ALL: [Self; 4] = [Self::Retry, Self::Skip, Self::Fallback, Self::Abort];

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::Skip => "skip",
            Self::Fallback => "fallback",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for RecoveryStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecoveryStrategyKind {
    type Err = BuildflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| BuildflowError::UnknownStrategy(s.to_string()))
    }
}

/// Everything a strategy needs to decide about a failed build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryContext {
    /// The error being recovered from.
    pub error: BuildError,
    /// Retries already spent.
    #[serde(default)]
    pub retry_attempt: u32,
    /// Retry budget.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Platform whose build failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// Platforms still to build.
    #[serde(default)]
    pub remaining_platforms: Vec<Platform>,
    /// Cached artifacts from a previous build, by key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_artifacts: Option<HashMap<String, serde_json::Value>>,
    /// Default configuration to fall back to, by key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_config: Option<HashMap<String, serde_json::Value>>,
    /// Free-form data accumulated across recovery steps.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl RecoveryContext {
    /// Creates a context for `error` with no retries spent.
    #[must_use]
    pub fn new(error: BuildError) -> Self {
        Self {
            error,
            retry_attempt: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            platform: None,
            remaining_platforms: Vec::new(),
            cached_artifacts: None,
            default_config: None,
            metadata: HashMap::new(),
        }
    }

    /// Sets the retries already spent.
    #[must_use]
    pub fn with_retry_attempt(mut self, attempt: u32) -> Self {
        self.retry_attempt = attempt;
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Sets the failed platform.
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<Platform>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Sets the platforms still to build.
    #[must_use]
    pub fn with_remaining_platforms<I, P>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Platform>,
    {
        self.remaining_platforms = platforms.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the cached artifacts.
    #[must_use]
    pub fn with_cached_artifacts(mut self, artifacts: HashMap<String, serde_json::Value>) -> Self {
        self.cached_artifacts = Some(artifacts);
        self
    }

    /// Sets the default configuration.
    #[must_use]
    pub fn with_default_config(mut self, config: HashMap<String, serde_json::Value>) -> Self {
        self.default_config = Some(config);
        self
    }

    /// The failed platform: the context's own, else the error's.
    #[must_use]
    pub fn failed_platform(&self) -> Option<&str> {
        self.platform.as_deref().or(self.error.platform.as_deref())
    }

    /// Returns true if retries remain.
    #[must_use]
    pub fn has_retries_left(&self) -> bool {
        self.retry_attempt < self.max_retries
    }

    /// Merges a strategy's [`ContextUpdate`] into this context.
    ///
    /// Set fields replace, metadata keys are merged over existing ones.
    pub fn apply(&mut self, update: &ContextUpdate) {
        if let Some(attempt) = update.retry_attempt {
            self.retry_attempt = attempt;
        }
        if let Some(remaining) = &update.remaining_platforms {
            self.remaining_platforms.clone_from(remaining);
        }
        for (key, value) in &update.metadata {
            self.metadata.insert(key.clone(), value.clone());
        }
    }
}

/// Partial context returned by a successful strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUpdate {
    /// New retry attempt count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_attempt: Option<u32>,
    /// New list of platforms still to build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_platforms: Option<Vec<Platform>>,
    /// Metadata entries to merge.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ContextUpdate {
    /// An update advancing the retry attempt.
    #[must_use]
    pub fn retry_attempt(attempt: u32) -> Self {
        Self {
            retry_attempt: Some(attempt),
            ..Self::default()
        }
    }

    /// An update replacing the remaining platforms.
    #[must_use]
    pub fn remaining_platforms(platforms: Vec<Platform>) -> Self {
        Self {
            remaining_platforms: Some(platforms),
            ..Self::default()
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// What a strategy advises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryResult {
    /// Whether the strategy could do what it set out to.
    pub success: bool,
    /// The strategy that produced this result.
    pub strategy: RecoveryStrategyKind,
    /// Human-readable summary.
    pub message: String,
    /// Whether the caller should keep building.
    pub should_continue: bool,
    /// Context changes for the caller to apply before continuing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_context: Option<ContextUpdate>,
    /// Errors that could not be recovered from; set when `success` is false.
    #[serde(default)]
    pub errors: Vec<BuildError>,
}

impl RecoveryResult {
    /// A successful outcome; the caller should continue.
    #[must_use]
    pub fn proceed(
        strategy: RecoveryStrategyKind,
        message: impl Into<String>,
        update: ContextUpdate,
    ) -> Self {
        Self {
            success: true,
            strategy,
            message: message.into(),
            should_continue: true,
            updated_context: Some(update),
            errors: Vec::new(),
        }
    }

    /// A failed outcome; the caller should stop.
    #[must_use]
    pub fn halt(strategy: RecoveryStrategyKind, message: impl Into<String>, error: BuildError) -> Self {
        Self {
            success: false,
            strategy,
            message: message.into(),
            should_continue: false,
            updated_context: None,
            errors: vec![error],
        }
    }
}

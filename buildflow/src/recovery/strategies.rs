//! The four recovery strategies.

use super::backoff::BackoffConfig;
use super::context::{ContextUpdate, RecoveryContext, RecoveryResult, RecoveryStrategyKind};
use crate::core::{BuildError, ErrorSeverity};
use crate::utils::duration_ms;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// A recovery strategy.
#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> RecoveryStrategyKind;

    /// Whether this strategy can handle `error` in `ctx`.
    fn is_applicable(&self, error: &BuildError, ctx: &RecoveryContext) -> bool;

    /// Runs the strategy.
    async fn execute(&self, ctx: &RecoveryContext) -> RecoveryResult;
}

const TRANSIENT_PATTERN: &str = r"(?i)network|timeout|timed out|econnrefused|connection refused|enotfound|name not found|file lock|locked|ebusy|resource unavailable|eagain|temporary";

fn transient_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(TRANSIENT_PATTERN).ok())
        .as_ref()
}

/// Retries transient failures with exponential backoff.
#[derive(Debug, Clone, Default)]
pub struct RetryStrategy {
    backoff: BackoffConfig,
}

impl RetryStrategy {
    /// Creates a retry strategy with the default backoff.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backoff parameters.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// The backoff parameters.
    #[must_use]
    pub fn backoff(&self) -> &BackoffConfig {
        &self.backoff
    }

    /// Returns true if the error looks transient, by message or code.
    #[must_use]
    pub fn can_retry(&self, error: &BuildError) -> bool {
        transient_pattern().is_some_and(|pattern| {
            pattern.is_match(&error.message) || pattern.is_match(&error.code)
        })
    }
}

#[async_trait]
impl RecoveryStrategy for RetryStrategy {
    fn kind(&self) -> RecoveryStrategyKind {
        RecoveryStrategyKind::Retry
    }

    fn is_applicable(&self, error: &BuildError, ctx: &RecoveryContext) -> bool {
        self.can_retry(error) && ctx.has_retries_left()
    }

    async fn execute(&self, ctx: &RecoveryContext) -> RecoveryResult {
        if !ctx.has_retries_left() {
            return RecoveryResult::halt(
                self.kind(),
                format!("Maximum retry attempts ({}) exceeded", ctx.max_retries),
                ctx.error.clone(),
            );
        }

        let delay = self.backoff.delay(ctx.retry_attempt);
        let delay_ms = duration_ms(delay);
        let next_attempt = ctx.retry_attempt + 1;
        debug!(
            attempt = next_attempt,
            max_retries = ctx.max_retries,
            delay_ms,
            "Backing off before retry"
        );
        tokio::time::sleep(delay).await;

        RecoveryResult::proceed(
            self.kind(),
            format!(
                "Retrying operation (attempt {next_attempt}/{}) after {delay_ms} ms",
                ctx.max_retries,
            ),
            ContextUpdate::retry_attempt(next_attempt),
        )
    }
}

/// Drops the failed platform and continues with the rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipStrategy;

impl SkipStrategy {
    /// Creates a skip strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns true if the error names the platform that failed.
    #[must_use]
    pub fn can_skip(&self, error: &BuildError) -> bool {
        error.platform.is_some()
    }
}

#[async_trait]
impl RecoveryStrategy for SkipStrategy {
    fn kind(&self) -> RecoveryStrategyKind {
        RecoveryStrategyKind::Skip
    }

    fn is_applicable(&self, error: &BuildError, ctx: &RecoveryContext) -> bool {
        self.can_skip(error) && !ctx.remaining_platforms.is_empty()
    }

    async fn execute(&self, ctx: &RecoveryContext) -> RecoveryResult {
        let Some(failed) = ctx.failed_platform() else {
            return RecoveryResult::halt(
                self.kind(),
                "Cannot skip: no platform specified in error context",
                ctx.error.clone(),
            );
        };
        if ctx.remaining_platforms.is_empty() {
            return RecoveryResult::halt(
                self.kind(),
                "Cannot skip: no remaining platforms to build",
                ctx.error.clone(),
            );
        }

        let remaining: Vec<_> = ctx
            .remaining_platforms
            .iter()
            .filter(|p| p.as_str() != failed)
            .cloned()
            .collect();

        RecoveryResult::proceed(
            self.kind(),
            format!(
                "Skipping {failed} platform. Continuing with {} remaining platform(s): {}",
                remaining.len(),
                remaining.join(", ")
            ),
            ContextUpdate::remaining_platforms(remaining),
        )
    }
}

/// Falls back to cached artifacts or a default configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackStrategy;

impl FallbackStrategy {
    /// Creates a fallback strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns true if the context holds a non-empty cache or default config.
    #[must_use]
    pub fn can_fallback(&self, ctx: &RecoveryContext) -> bool {
        non_empty(ctx.cached_artifacts.as_ref()).is_some()
            || non_empty(ctx.default_config.as_ref()).is_some()
    }
}

fn non_empty(
    map: Option<&HashMap<String, serde_json::Value>>,
) -> Option<&HashMap<String, serde_json::Value>> {
    map.filter(|m| !m.is_empty())
}

fn sorted_keys(map: &HashMap<String, serde_json::Value>) -> Vec<&str> {
    let mut keys: Vec<_> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

#[async_trait]
impl RecoveryStrategy for FallbackStrategy {
    fn kind(&self) -> RecoveryStrategyKind {
        RecoveryStrategyKind::Fallback
    }

    fn is_applicable(&self, _error: &BuildError, ctx: &RecoveryContext) -> bool {
        self.can_fallback(ctx)
    }

    async fn execute(&self, ctx: &RecoveryContext) -> RecoveryResult {
        if let Some(cache) = non_empty(ctx.cached_artifacts.as_ref()) {
            let keys = sorted_keys(cache);
            return RecoveryResult::proceed(
                self.kind(),
                format!("Using cached build artifacts ({} entries)", keys.len()),
                ContextUpdate::default()
                    .with_metadata("usedCache", serde_json::json!(true))
                    .with_metadata("cacheKeys", serde_json::json!(keys)),
            );
        }
        if let Some(config) = non_empty(ctx.default_config.as_ref()) {
            let keys = sorted_keys(config);
            return RecoveryResult::proceed(
                self.kind(),
                format!("Using default configuration ({} keys)", keys.len()),
                ContextUpdate::default()
                    .with_metadata("usedDefaultConfig", serde_json::json!(true))
                    .with_metadata("configKeys", serde_json::json!(keys)),
            );
        }
        RecoveryResult::halt(self.kind(), "No fallback available", ctx.error.clone())
    }
}

/// Stops the build.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortStrategy;

impl AbortStrategy {
    /// Creates an abort strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns true for errors that must stop the build whatever else applies:
    /// configuration errors of `error` severity, and errors marked
    /// `recoverable: false`.
    #[must_use]
    pub fn should_abort(&self, error: &BuildError) -> bool {
        (error.is_configuration() && error.severity == ErrorSeverity::Error)
            || !error.is_recoverable()
    }
}

#[async_trait]
impl RecoveryStrategy for AbortStrategy {
    fn kind(&self) -> RecoveryStrategyKind {
        RecoveryStrategyKind::Abort
    }

    fn is_applicable(&self, _error: &BuildError, _ctx: &RecoveryContext) -> bool {
        true
    }

    async fn execute(&self, ctx: &RecoveryContext) -> RecoveryResult {
        RecoveryResult::halt(
            self.kind(),
            format!("Build aborted due to critical error: {}", ctx.error.message),
            ctx.error.clone(),
        )
    }
}

//! Executor configuration.

use crate::core::ProgressCallback;
use crate::errors::BuildflowError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-build timeout: five minutes.
pub const DEFAULT_BUILD_TIMEOUT_MS: u64 = 5 * 60 * 1000;

/// Default interval at which a waiting build re-checks the cancellation flag.
pub const DEFAULT_CANCEL_POLL_INTERVAL_MS: u64 = 100;

/// Configuration for [`ParallelExecutor`](super::ParallelExecutor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelOptions {
    /// Maximum builds in flight at once; `None` launches every platform at once.
    pub max_concurrency: Option<usize>,
    /// Per-build timeout in milliseconds.
    pub build_timeout_ms: u64,
    /// Keep launching batches after a failure.
    pub continue_on_failure: bool,
    /// Cancellation re-check interval in milliseconds.
    pub cancel_poll_interval_ms: u64,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            build_timeout_ms: DEFAULT_BUILD_TIMEOUT_MS,
            continue_on_failure: true,
            cancel_poll_interval_ms: DEFAULT_CANCEL_POLL_INTERVAL_MS,
        }
    }
}

impl ParallelOptions {
    /// Creates options with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of concurrent builds.
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    /// Removes the concurrency cap.
    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.max_concurrency = None;
        self
    }

    /// Sets the per-build timeout.
    #[must_use]
    pub fn with_build_timeout_ms(mut self, timeout: u64) -> Self {
        self.build_timeout_ms = timeout;
        self
    }

    /// Sets whether later batches run after a failure.
    #[must_use]
    pub fn with_continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = continue_on_failure;
        self
    }

    /// Sets the cancellation re-check interval.
    #[must_use]
    pub fn with_cancel_poll_interval_ms(mut self, interval: u64) -> Self {
        self.cancel_poll_interval_ms = interval;
        self
    }

    /// The per-build timeout as a duration.
    #[must_use]
    pub fn build_timeout(&self) -> Duration {
        Duration::from_millis(self.build_timeout_ms)
    }

    /// The cancellation re-check interval as a duration.
    #[must_use]
    pub fn cancel_poll_interval(&self) -> Duration {
        Duration::from_millis(self.cancel_poll_interval_ms)
    }

    /// Rejects a zero concurrency cap or zero durations.
    pub fn validate(&self) -> Result<(), BuildflowError> {
        if self.max_concurrency == Some(0) {
            return Err(BuildflowError::invalid_config(
                "max_concurrency",
                "must be at least 1",
            ));
        }
        validate_durations(self.build_timeout_ms, self.cancel_poll_interval_ms)
    }
}

/// Configuration for [`SequentialExecutor`](super::SequentialExecutor).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequentialOptions {
    /// Stop at the first failed build and skip the rest.
    pub stop_on_failure: bool,
    /// Per-build timeout in milliseconds.
    pub build_timeout_ms: u64,
    /// Cancellation re-check interval in milliseconds.
    pub cancel_poll_interval_ms: u64,
    /// Invoked before each build and once more when the run ends.
    #[serde(skip)]
    pub on_progress: Option<ProgressCallback>,
}

impl Default for SequentialOptions {
    fn default() -> Self {
        Self {
            stop_on_failure: false,
            build_timeout_ms: DEFAULT_BUILD_TIMEOUT_MS,
            cancel_poll_interval_ms: DEFAULT_CANCEL_POLL_INTERVAL_MS,
            on_progress: None,
        }
    }
}

impl std::fmt::Debug for SequentialOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialOptions")
            .field("stop_on_failure", &self.stop_on_failure)
            .field("build_timeout_ms", &self.build_timeout_ms)
            .field("cancel_poll_interval_ms", &self.cancel_poll_interval_ms)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl SequentialOptions {
    /// Creates options with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the run stops at the first failure.
    #[must_use]
    pub fn with_stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }

    /// Sets the per-build timeout.
    #[must_use]
    pub fn with_build_timeout_ms(mut self, timeout: u64) -> Self {
        self.build_timeout_ms = timeout;
        self
    }

    /// Sets the cancellation re-check interval.
    #[must_use]
    pub fn with_cancel_poll_interval_ms(mut self, interval: u64) -> Self {
        self.cancel_poll_interval_ms = interval;
        self
    }

    /// Sets the progress callback.
    #[must_use]
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&crate::core::ProgressSnapshot) + Send + Sync + 'static,
    {
        self.on_progress = Some(std::sync::Arc::new(callback));
        self
    }

    /// The per-build timeout as a duration.
    #[must_use]
    pub fn build_timeout(&self) -> Duration {
        Duration::from_millis(self.build_timeout_ms)
    }

    /// The cancellation re-check interval as a duration.
    #[must_use]
    pub fn cancel_poll_interval(&self) -> Duration {
        Duration::from_millis(self.cancel_poll_interval_ms)
    }

    /// Rejects zero durations.
    pub fn validate(&self) -> Result<(), BuildflowError> {
        validate_durations(self.build_timeout_ms, self.cancel_poll_interval_ms)
    }
}

fn validate_durations(build_timeout_ms: u64, poll_interval_ms: u64) -> Result<(), BuildflowError> {
    if build_timeout_ms == 0 {
        return Err(BuildflowError::invalid_config(
            "build_timeout_ms",
            "must be greater than zero",
        ));
    }
    if poll_interval_ms == 0 {
        return Err(BuildflowError::invalid_config(
            "cancel_poll_interval_ms",
            "must be greater than zero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_defaults() {
        let options = ParallelOptions::default();
        assert_eq!(options.max_concurrency, None);
        assert_eq!(options.build_timeout(), Duration::from_secs(300));
        assert!(options.continue_on_failure);
        assert_eq!(options.cancel_poll_interval(), Duration::from_millis(100));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_parallel_builder_and_validation() {
        let options = ParallelOptions::new()
            .with_max_concurrency(2)
            .with_build_timeout_ms(1000)
            .with_continue_on_failure(false);

        assert_eq!(options.max_concurrency, Some(2));
        assert_eq!(options.build_timeout_ms, 1000);
        assert!(!options.continue_on_failure);
        assert!(options.clone().unbounded().max_concurrency.is_none());

        let zero = ParallelOptions::new().with_max_concurrency(0);
        assert!(matches!(
            zero.validate(),
            Err(BuildflowError::InvalidConfig { ref field, .. }) if field == "max_concurrency"
        ));
    }

    #[test]
    fn test_parallel_options_from_partial_json() {
        let options: ParallelOptions =
            serde_json::from_str(r#"{"max_concurrency": 3}"#).unwrap();
        assert_eq!(options.max_concurrency, Some(3));
        assert_eq!(options.build_timeout_ms, DEFAULT_BUILD_TIMEOUT_MS);
        assert!(options.continue_on_failure);
    }

    #[test]
    fn test_sequential_defaults_and_validation() {
        let options = SequentialOptions::default();
        assert!(!options.stop_on_failure);
        assert!(options.on_progress.is_none());
        assert!(options.validate().is_ok());

        let bad = SequentialOptions::new().with_build_timeout_ms(0);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_sequential_options_skip_callback_in_serde() {
        let options = SequentialOptions::new()
            .with_stop_on_failure(true)
            .with_progress(|_| {});
        let json = serde_json::to_value(&options).unwrap();

        assert_eq!(json["stop_on_failure"], true);
        assert!(json.get("on_progress").is_none());
        assert!(format!("{options:?}").contains("on_progress: true"));
    }
}

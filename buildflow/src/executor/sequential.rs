//! One-at-a-time multi-platform execution with progress reporting.

use super::race::BuildRace;
use super::{PlatformBuilder, SequentialOptions};
use crate::cancellation::RunTokens;
use crate::core::{tally, BuildResult, Platform, ProgressSnapshot, SequentialExecutionResult};
use crate::errors::BuildflowError;
use crate::events::{event_types, BuildEvent, EventSink, NoOpEventSink};
use crate::utils::elapsed_ms;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Runs a build function across platforms one at a time, in input order.
pub struct SequentialExecutor {
    options: SequentialOptions,
    runs: RunTokens,
    events: Arc<dyn EventSink>,
}

impl SequentialExecutor {
    /// Creates an executor with the given options.
    #[must_use]
    pub fn new(options: SequentialOptions) -> Self {
        Self {
            options,
            runs: RunTokens::new(),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &SequentialOptions {
        &self.options
    }

    /// Requests cancellation of every run in flight.
    ///
    /// The in-flight build is recorded as cancelled; every platform after it
    /// is reported in `skipped_platforms`.
    pub fn cancel(&self) {
        self.runs.cancel("Cancellation requested");
    }

    /// Returns true if cancellation has been requested for the most recent run.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.runs.is_cancelled()
    }

    /// Builds every platform in order.
    pub async fn execute(
        &self,
        platforms: &[Platform],
        builder: Arc<dyn PlatformBuilder>,
    ) -> Result<SequentialExecutionResult, BuildflowError> {
        if platforms.is_empty() {
            return Err(BuildflowError::no_platforms());
        }
        self.options.validate()?;

        let run = self.runs.begin();
        let token = Arc::clone(run.token());
        let run_id = Uuid::new_v4();
        let start = Instant::now();
        let total = platforms.len();

        info!(
            run_id = %run_id,
            platforms = total,
            stop_on_failure = self.options.stop_on_failure,
            "Starting sequential build"
        );
        self.events.try_emit(
            &BuildEvent::new(event_types::EXECUTION_STARTED)
                .with_run_id(run_id)
                .with_data(serde_json::json!({
                    "mode": "sequential",
                    "platforms": platforms,
                })),
        );

        let race = BuildRace {
            builder,
            token: Arc::clone(&token),
            events: Arc::clone(&self.events),
            run_id,
            timeout: self.options.build_timeout(),
            poll_interval: self.options.cancel_poll_interval(),
        };

        let mut results: Vec<BuildResult> = Vec::with_capacity(total);
        let mut skipped_platforms: Vec<Platform> = Vec::new();
        let mut stopped_on_failure = false;

        for (index, platform) in platforms.iter().enumerate() {
            if token.is_cancelled() {
                skipped_platforms.extend_from_slice(&platforms[index..]);
                info!(
                    run_id = %run_id,
                    skipped = skipped_platforms.len(),
                    "Sequential build cancelled"
                );
                break;
            }

            let (successes, failures) = tally(&results);
            self.report(&ProgressSnapshot::before(
                platform.clone(),
                index,
                total,
                successes,
                failures,
                elapsed_ms(start),
            ));

            let result = race.run(platform.clone()).await;
            let failed = !result.success;
            results.push(result);

            if failed && self.options.stop_on_failure {
                stopped_on_failure = true;
                skipped_platforms.extend_from_slice(&platforms[index + 1..]);
                warn!(
                    run_id = %run_id,
                    platform = %platform,
                    skipped = skipped_platforms.len(),
                    "Stopping after failed build"
                );
                break;
            }
        }

        let (success_count, failure_count) = tally(&results);
        let total_duration_ms = elapsed_ms(start);
        self.report(&ProgressSnapshot::finished(
            total,
            success_count,
            failure_count,
            total_duration_ms,
        ));

        let result = SequentialExecutionResult {
            run_id,
            results,
            total_duration_ms,
            success_count,
            failure_count,
            all_completed: !token.is_cancelled(),
            stopped_on_failure,
            skipped_platforms,
        };

        info!(
            run_id = %run_id,
            success_count,
            failure_count,
            skipped = result.skipped_platforms.len(),
            total_duration_ms,
            "Sequential build finished"
        );
        self.events.try_emit(
            &BuildEvent::new(event_types::EXECUTION_COMPLETED)
                .with_run_id(run_id)
                .with_data(serde_json::json!(result.to_dict())),
        );

        Ok(result)
    }

    fn report(&self, snapshot: &ProgressSnapshot) {
        debug!(
            platform = ?snapshot.current_platform,
            percent = snapshot.percent_complete,
            "Progress"
        );
        if let Some(callback) = &self.options.on_progress {
            callback(snapshot);
        }
    }
}

impl Default for SequentialExecutor {
    fn default() -> Self {
        Self::new(SequentialOptions::default())
    }
}

impl std::fmt::Debug for SequentialExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialExecutor")
            .field("options", &self.options)
            .field("cancelled", &self.runs.is_cancelled())
            .finish_non_exhaustive()
    }
}

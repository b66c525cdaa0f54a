//! Concurrent multi-platform execution.

use super::race::BuildRace;
use super::{ParallelOptions, PlatformBuilder};
use crate::cancellation::RunTokens;
use crate::core::{BuildResult, ExecutionResult, Platform};
use crate::errors::BuildflowError;
use crate::events::{event_types, BuildEvent, EventSink, NoOpEventSink};
use crate::utils::elapsed_ms;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Runs a build function across platforms concurrently.
///
/// With no concurrency cap every platform is launched at once. With a cap of
/// `N` the platforms are split into consecutive batches of `N`; batches run one
/// after another, builds within a batch run concurrently. A single failure
/// never stops the other builds of its batch.
pub struct ParallelExecutor {
    options: ParallelOptions,
    runs: RunTokens,
    events: Arc<dyn EventSink>,
}

impl ParallelExecutor {
    /// Creates an executor with the given options.
    #[must_use]
    pub fn new(options: ParallelOptions) -> Self {
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
    pub fn options(&self) -> &ParallelOptions {
        &self.options
    }

    /// Requests cancellation of every run in flight.
    ///
    /// Idempotent. In-flight builds are recorded as cancelled once the
    /// cancellation is observed; builds not yet started are never launched.
    /// Each call to [`execute`](Self::execute) gets its own token, so a new
    /// run starts uncancelled without clearing an overlapping one.
    pub fn cancel(&self) {
        self.runs.cancel("Cancellation requested");
    }

    /// Returns true if cancellation has been requested for the most recent run.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.runs.is_cancelled()
    }

    /// Builds every platform and aggregates the outcomes.
    ///
    /// Per-platform failures are reported as failed results; only an empty
    /// platform list or invalid options produce an `Err`.
    pub async fn execute(
        &self,
        platforms: &[Platform],
        builder: Arc<dyn PlatformBuilder>,
    ) -> Result<ExecutionResult, BuildflowError> {
        if platforms.is_empty() {
            return Err(BuildflowError::no_platforms());
        }
        self.options.validate()?;

        let run = self.runs.begin();
        let token = Arc::clone(run.token());
        let run_id = Uuid::new_v4();
        let start = Instant::now();

        info!(
            run_id = %run_id,
            platforms = platforms.len(),
            max_concurrency = ?self.options.max_concurrency,
            "Starting parallel build"
        );
        self.events.try_emit(
            &BuildEvent::new(event_types::EXECUTION_STARTED)
                .with_run_id(run_id)
                .with_data(serde_json::json!({
                    "mode": "parallel",
                    "platforms": platforms,
                    "max_concurrency": self.options.max_concurrency,
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

        let batch_size = self.options.max_concurrency.unwrap_or(platforms.len());
        let mut results: Vec<BuildResult> = Vec::with_capacity(platforms.len());

        for (batch_index, batch) in platforms.chunks(batch_size).enumerate() {
            debug!(run_id = %run_id, batch = batch_index, size = batch.len(), "Launching batch");

            let batch_results = join_all(batch.iter().cloned().map(|p| race.run(p))).await;
            let batch_failed = batch_results.iter().any(|r| !r.success);
            results.extend(batch_results);

            if batch_failed && !self.options.continue_on_failure {
                let remaining = &platforms[results.len()..];
                if !remaining.is_empty() {
                    info!(
                        run_id = %run_id,
                        skipped = remaining.len(),
                        "Batch failed, cancelling remaining platforms"
                    );
                }
                results.extend(remaining.iter().map(|p| {
                    race.emit_not_started(p);
                    BuildResult::cancelled(p.clone(), 0)
                }));
                break;
            }
        }

        let total_duration_ms = elapsed_ms(start);
        let all_completed = !token.is_cancelled();
        let result = ExecutionResult::from_results(run_id, results, total_duration_ms, all_completed);

        info!(
            run_id = %run_id,
            success_count = result.success_count,
            failure_count = result.failure_count,
            total_duration_ms,
            all_completed,
            "Parallel build finished"
        );
        self.events.try_emit(
            &BuildEvent::new(event_types::EXECUTION_COMPLETED)
                .with_run_id(run_id)
                .with_data(serde_json::json!(result.to_dict())),
        );

        Ok(result)
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(ParallelOptions::default())
    }
}

impl std::fmt::Debug for ParallelExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelExecutor")
            .field("options", &self.options)
            .field("cancelled", &self.runs.is_cancelled())
            .finish_non_exhaustive()
    }
}

//! The per-build race between completion, timeout, and cancellation.

use super::PlatformBuilder;
use crate::cancellation::CancellationToken;
use crate::core::{error_codes, BuildError, BuildResult, Platform};
use crate::events::{event_types, BuildEvent, EventSink};
use crate::utils::{duration_ms, elapsed_ms, iso_timestamp};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tracing::{debug, warn};
use uuid::Uuid;

/// How a single race settled.
enum Settled {
    Finished(Result<anyhow::Result<BuildResult>, JoinError>),
    TimedOut,
    Cancelled,
}

/// Runs one platform build under a timeout and a cancellation observer.
///
/// The build itself runs on its own task. When the timeout or cancellation
/// wins, the task is detached rather than aborted: the build function may keep
/// running in the background, but its result is discarded. The timer and the
/// cancellation observer are dropped on every exit path.
pub(crate) struct BuildRace {
    pub(crate) builder: Arc<dyn PlatformBuilder>,
    pub(crate) token: Arc<CancellationToken>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) run_id: Uuid,
    pub(crate) timeout: Duration,
    pub(crate) poll_interval: Duration,
}

impl BuildRace {
    /// Builds `platform`, always producing a result.
    pub(crate) async fn run(&self, platform: Platform) -> BuildResult {
        if self.token.is_cancelled() {
            debug!(platform = %platform, "Skipping build, run already cancelled");
            self.emit_not_started(&platform);
            return BuildResult::cancelled(platform, 0);
        }

        self.emit(event_types::BUILD_STARTED, &platform, serde_json::Value::Null);
        let start = Instant::now();

        let task = {
            let builder = Arc::clone(&self.builder);
            let platform = platform.clone();
            tokio::spawn(async move { builder.build(&platform).await })
        };

        let settled = tokio::select! {
            joined = task => Settled::Finished(joined),
            () = tokio::time::sleep(self.timeout) => Settled::TimedOut,
            () = self.token.cancelled(self.poll_interval) => Settled::Cancelled,
        };
        let elapsed = elapsed_ms(start);

        match settled {
            Settled::Finished(Ok(Ok(result))) => {
                let result = normalize(result, &platform);
                if result.success {
                    debug!(platform = %platform, duration_ms = elapsed, "Build completed");
                    self.emit(
                        event_types::BUILD_COMPLETED,
                        &platform,
                        serde_json::json!({ "duration_ms": elapsed }),
                    );
                } else {
                    self.emit_failure(&result, elapsed);
                }
                result
            }
            Settled::Finished(Ok(Err(err))) => {
                let result = BuildResult::build_failed(platform, elapsed, err.to_string());
                self.emit_failure(&result, elapsed);
                result
            }
            Settled::Finished(Err(join_err)) => {
                let result = join_failure(platform, elapsed, &join_err);
                self.emit_failure(&result, elapsed);
                result
            }
            Settled::TimedOut => {
                let timeout_ms = duration_ms(self.timeout);
                warn!(platform = %platform, timeout_ms, "Build timed out");
                self.emit(
                    event_types::BUILD_TIMED_OUT,
                    &platform,
                    serde_json::json!({ "timeout_ms": timeout_ms }),
                );
                BuildResult::timed_out(platform, timeout_ms)
            }
            Settled::Cancelled => {
                debug!(
                    platform = %platform,
                    reason = ?self.token.reason(),
                    "Build cancelled while in flight"
                );
                self.emit(
                    event_types::BUILD_CANCELLED,
                    &platform,
                    serde_json::json!({ "started": true, "duration_ms": elapsed }),
                );
                BuildResult::cancelled(platform, elapsed)
            }
        }
    }

    /// Records a platform that was cancelled before its build launched.
    pub(crate) fn emit_not_started(&self, platform: &str) {
        self.emit(
            event_types::BUILD_CANCELLED,
            platform,
            serde_json::json!({ "started": false }),
        );
    }

    fn emit_failure(&self, result: &BuildResult, elapsed: u64) {
        let (code, message) = result
            .primary_error()
            .map(|e| (e.code.clone(), e.message.clone()))
            .unwrap_or_default();

        warn!(
            platform = %result.platform,
            code = %code,
            duration_ms = elapsed,
            "Build failed: {}", message
        );
        self.emit(
            event_types::BUILD_FAILED,
            &result.platform,
            serde_json::json!({ "code": code, "message": message, "duration_ms": elapsed }),
        );
    }

    fn emit(&self, event_type: &str, platform: &str, data: serde_json::Value) {
        self.events.try_emit(
            &BuildEvent::new(event_type)
                .with_run_id(self.run_id)
                .with_platform(platform)
                .with_data(data),
        );
    }
}

/// Ties a builder's result back to the platform it was launched for and
/// restores the success/errors invariant.
fn normalize(mut result: BuildResult, platform: &str) -> BuildResult {
    if result.platform != platform {
        result.platform = platform.to_string();
    }
    if !result.errors.is_empty() {
        result.success = false;
    }
    if !result.success {
        if result.errors.is_empty() {
            result
                .errors
                .push(BuildError::build_failed(platform, "Unknown build error"));
        }
        result.package_path.clear();
    }
    result
        .metadata
        .entry("timestamp".to_string())
        .or_insert_with(|| serde_json::json!(iso_timestamp()));
    result
}

fn join_failure(platform: Platform, elapsed: u64, join_err: &JoinError) -> BuildResult {
    if join_err.is_panic() {
        let error = BuildError::build_failed(platform.clone(), "Build task panicked");
        let error = BuildError {
            code: error_codes::BUILD_PANICKED.to_string(),
            ..error
        };
        BuildResult::failure(platform, elapsed, vec![error])
    } else {
        BuildResult::build_failed(platform, elapsed, join_err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CollectingEventSink, NoOpEventSink};
    use crate::executor::FnBuilder;

    fn race(builder: Arc<dyn PlatformBuilder>, timeout_ms: u64) -> BuildRace {
        BuildRace {
            builder,
            token: Arc::new(CancellationToken::new()),
            events: Arc::new(NoOpEventSink),
            run_id: Uuid::new_v4(),
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_completion_wins() {
        let builder = Arc::new(FnBuilder::new(|p: String| async move {
            Ok(BuildResult::success(p, "out", 1))
        }));
        let result = race(builder, 1000).run("web".to_string()).await;

        assert!(result.success);
        assert_eq!(result.platform, "web");
    }

    #[tokio::test]
    async fn test_error_is_normalized() {
        let builder = Arc::new(FnBuilder::new(|_p: String| async move {
            Err(anyhow::anyhow!("linker not found"))
        }));
        let result = race(builder, 1000).run("ios".to_string()).await;

        assert!(!result.success);
        let error = result.primary_error().unwrap();
        assert_eq!(error.code, error_codes::BUILD_FAILED);
        assert_eq!(error.message, "linker not found");
        assert_eq!(error.suggestions.len(), 3);
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let builder = Arc::new(FnBuilder::new(|_p: String| async move {
            if true {
                panic!("builder bug");
            }
            Ok(BuildResult::success("never", "", 0))
        }));
        let result = race(builder, 1000).run("android".to_string()).await;

        assert!(result.has_error_code(error_codes::BUILD_PANICKED));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_wins_over_hanging_build() {
        let builder = Arc::new(FnBuilder::new(|_p: String| async move {
            futures::future::pending::<()>().await;
            Ok(BuildResult::success("never", "", 0))
        }));
        let result = race(builder, 50).run("web".to_string()).await;

        assert!(result.has_error_code(error_codes::BUILD_TIMEOUT));
        assert_eq!(result.duration_ms, 50);
    }

    #[tokio::test]
    async fn test_cancellation_wins() {
        let builder = Arc::new(FnBuilder::new(|_p: String| async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(BuildResult::success("never", "", 0))
        }));
        let race = race(builder, 60_000);
        let token = Arc::clone(&race.token);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel("test");
        });

        let result = race.run("web".to_string()).await;
        assert!(result.has_error_code(error_codes::BUILD_CANCELLED));
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_builder() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let builder = Arc::new(FnBuilder::new(move |p: String| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async move { Ok(BuildResult::success(p, "out", 0)) }
        }));

        let sink = Arc::new(CollectingEventSink::new());
        let mut race = race(builder, 1000);
        race.events = sink.clone();
        race.token.cancel("before start");

        let result = race.run("web".to_string()).await;
        assert!(result.has_error_code(error_codes::BUILD_CANCELLED));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(sink.events_of_type(event_types::BUILD_CANCELLED).len(), 1);
    }

    #[test]
    fn test_normalize_restores_invariant() {
        let mut claimed = BuildResult::success("other", "out", 1);
        claimed.errors.push(BuildError::new("LINT", "lint failed", "build"));

        let result = normalize(claimed, "web");
        assert_eq!(result.platform, "web");
        assert!(!result.success);
        assert!(result.package_path.is_empty());

        let mut empty_failure = BuildResult::success("web", "out", 1);
        empty_failure.success = false;
        let result = normalize(empty_failure, "web");
        assert_eq!(result.errors.len(), 1);
    }
}

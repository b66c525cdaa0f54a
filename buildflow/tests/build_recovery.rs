//! End-to-end tests: executors feeding failed builds into recovery.

use buildflow::prelude::*;
use buildflow::testing::{
    assert_build_failed_with, assert_build_succeeded, assert_counts, assert_recovery,
    ConcurrencyProbe, FailingBuilder, HangingBuilder, ScriptedBuilder, SucceedingBuilder,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn platforms(names: &[&str]) -> Vec<Platform> {
    names.iter().map(|s| (*s).to_string()).collect()
}

fn coordinator() -> RecoveryStrategyCoordinator {
    RecoveryStrategyCoordinator::new()
        .with_backoff(BackoffConfig::new().with_base_delay_ms(5).with_max_delay_ms(50))
}

fn network_failure() -> FailingBuilder {
    FailingBuilder::only(["ios"], "Network timeout while fetching signing assets")
        .with_code(error_codes::NETWORK_ERROR)
}

/// Builds web/ios/android, retries ios once, and returns the context after
/// the retry failed again.
async fn fail_retry_fail(remaining: &[&str]) -> RecoveryContext {
    let builder: Arc<dyn PlatformBuilder> = Arc::new(network_failure());
    let executor = ParallelExecutor::default();
    let coordinator = coordinator();

    let first = executor
        .execute(&platforms(&["web", "ios", "android"]), Arc::clone(&builder))
        .await
        .unwrap();
    assert_counts(&first, 2, 1);
    assert_build_succeeded(first.result_for("web").unwrap());
    let ios = first.result_for("ios").unwrap();
    assert_build_failed_with(ios, error_codes::NETWORK_ERROR);

    let mut ctx = RecoveryContext::new(ios.primary_error().unwrap().clone())
        .with_max_retries(1)
        .with_platform("ios")
        .with_remaining_platforms(remaining.iter().copied());

    assert_eq!(
        coordinator.determine_strategy(&ctx.error, &ctx),
        RecoveryStrategyKind::Retry
    );
    let advice = coordinator.recover(&ctx).await;
    assert_recovery(&advice, RecoveryStrategyKind::Retry, true);
    ctx.apply(advice.updated_context.as_ref().unwrap());
    assert_eq!(ctx.retry_attempt, 1);

    let retried = executor.execute(&platforms(&["ios"]), builder).await.unwrap();
    let ios = &retried.results[0];
    assert_build_failed_with(ios, error_codes::NETWORK_ERROR);
    ctx.error = ios.primary_error().unwrap().clone();
    ctx
}

#[tokio::test]
async fn test_retry_then_skip_when_platforms_remain() {
    let ctx = fail_retry_fail(&["android", "web"]).await;
    let coordinator = coordinator();

    assert_eq!(
        coordinator.determine_strategy(&ctx.error, &ctx),
        RecoveryStrategyKind::Skip
    );
    let advice = coordinator.recover(&ctx).await;
    assert_recovery(&advice, RecoveryStrategyKind::Skip, true);
    assert_eq!(
        advice.updated_context.unwrap().remaining_platforms,
        Some(platforms(&["android", "web"]))
    );
}

#[tokio::test]
async fn test_retry_then_abort_when_nothing_remains() {
    let ctx = fail_retry_fail(&[]).await;
    let coordinator = coordinator();

    assert_eq!(
        coordinator.determine_strategy(&ctx.error, &ctx),
        RecoveryStrategyKind::Abort
    );
    let advice = coordinator.recover(&ctx).await;
    assert_recovery(&advice, RecoveryStrategyKind::Abort, false);
    assert!(!advice.success);
    assert!(advice
        .message
        .starts_with("Build aborted due to critical error: Network timeout"));
}

#[tokio::test]
async fn test_retry_recovers_flaky_build() {
    let network = BuildError::new(error_codes::NETWORK_ERROR, "ECONNREFUSED", "build");
    let builder = Arc::new(ScriptedBuilder::new().fail_times("android", &network, 2));
    let executor = SequentialExecutor::default();
    let coordinator = coordinator();

    let mut result = executor
        .execute(&platforms(&["android"]), builder.clone())
        .await
        .unwrap();
    let mut ctx = RecoveryContext::new(result.errors()[0].clone());

    while !result.is_success() {
        let advice = coordinator.recover(&ctx).await;
        assert_recovery(&advice, RecoveryStrategyKind::Retry, true);
        ctx.apply(advice.updated_context.as_ref().unwrap());
        result = executor
            .execute(&platforms(&["android"]), builder.clone())
            .await
            .unwrap();
    }

    assert_eq!(ctx.retry_attempt, 2);
    assert_eq!(builder.calls_for("android"), 3);
}

#[tokio::test]
async fn test_fallback_for_missing_tokens() {
    let error = BuildError::new("TOKEN_NOT_FOUND", "Token not found", "token").with_platform("web");
    let ctx = RecoveryContext::new(error)
        .with_cached_artifacts(HashMap::from([(
            "web-build".to_string(),
            serde_json::json!({"path": "/cache/web"}),
        )]))
        .with_default_config(HashMap::from([("spacing".to_string(), serde_json::json!(8))]));

    let advice = coordinator().recover(&ctx).await;
    assert_recovery(&advice, RecoveryStrategyKind::Fallback, true);

    let mut ctx = ctx;
    ctx.apply(advice.updated_context.as_ref().unwrap());
    assert_eq!(ctx.metadata["usedCache"], true);
    assert!(!ctx.metadata.contains_key("usedDefaultConfig"));
}

#[tokio::test]
async fn test_configuration_error_aborts_without_retry() {
    let error = BuildError::new(
        error_codes::CONFIG_INVALID_PLATFORM,
        "Invalid platform: network",
        "configuration",
    )
    .with_platform("tv");
    let ctx = RecoveryContext::new(error).with_remaining_platforms(["web"]);

    let advice = coordinator().recover(&ctx).await;
    assert_recovery(&advice, RecoveryStrategyKind::Abort, false);
    assert_eq!(advice.errors.len(), 1);
}

#[tokio::test]
async fn test_bounded_parallel_run() {
    let probe = Arc::new(ConcurrencyProbe::new(Duration::from_millis(15)));
    let sink = Arc::new(CollectingEventSink::new());
    let executor = ParallelExecutor::new(ParallelOptions::new().with_max_concurrency(3))
        .with_event_sink(sink.clone());
    let targets = platforms(&["web", "ios", "android", "macos", "windows", "linux", "tv"]);

    let result = executor.execute(&targets, probe.clone()).await.unwrap();

    assert!(result.is_success());
    assert_counts(&result, 7, 0);
    assert!(probe.max_observed() <= 3);
    assert_eq!(probe.calls(), 7);
    let order: Vec<_> = result.results.iter().map(|r| r.platform.clone()).collect();
    assert_eq!(order, targets);
    assert_eq!(sink.events_of_type("build.completed").len(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_do_not_block_sequential_run() {
    let snapshots = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let recorded = Arc::clone(&snapshots);
    let executor = SequentialExecutor::new(
        SequentialOptions::new()
            .with_build_timeout_ms(2_000)
            .with_progress(move |s| recorded.lock().push(s.percent_complete)),
    );

    let result = executor
        .execute(
            &platforms(&["web", "ios"]),
            Arc::new(HangingBuilder::for_platforms(["web"])),
        )
        .await
        .unwrap();

    assert_build_failed_with(&result.results[0], error_codes::BUILD_TIMEOUT);
    assert_build_succeeded(&result.results[1]);
    assert!(result.all_completed);
    assert_eq!(*snapshots.lock(), vec![0.0, 50.0, 100.0]);
}

#[tokio::test]
async fn test_sequential_stop_on_failure() {
    let executor = SequentialExecutor::new(SequentialOptions::new().with_stop_on_failure(true));
    let builder = Arc::new(FailingBuilder::only(["b"], "compile error"));

    let result = executor
        .execute(&platforms(&["a", "b", "c"]), builder)
        .await
        .unwrap();

    assert_eq!(result.successful_platforms(), platforms(&["a"]));
    assert_eq!(result.failed_platforms(), platforms(&["b"]));
    assert_eq!(result.skipped_platforms, platforms(&["c"]));
    assert!(result.stopped_on_failure);
}

#[tokio::test]
async fn test_closure_builder_errors_become_failed_results() {
    let builder = Arc::new(FnBuilder::new(|platform: String| async move {
        if platform == "ios" {
            anyhow::bail!("xcodebuild exited with code 65");
        }
        Ok(BuildResult::success(platform.clone(), format!("dist/{platform}"), 1))
    }));

    let result = ParallelExecutor::default()
        .execute(&platforms(&["web", "ios"]), builder)
        .await
        .unwrap();

    let ios = result.result_for("ios").unwrap();
    assert_build_failed_with(ios, error_codes::BUILD_FAILED);
    assert_eq!(ios.primary_error().unwrap().message, "xcodebuild exited with code 65");
    assert_eq!(ios.primary_error().unwrap().suggestions.len(), 3);
}

#[tokio::test]
async fn test_empty_platform_list_is_rejected() {
    let builder = Arc::new(SucceedingBuilder::new());

    let parallel = ParallelExecutor::default().execute(&[], builder.clone()).await;
    let sequential = SequentialExecutor::default().execute(&[], builder.clone()).await;

    assert!(parallel.unwrap_err().is_validation());
    assert!(sequential.unwrap_err().is_validation());
    assert_eq!(builder.calls(), 0);
}

//! Strategy selection and dispatch.

use super::backoff::BackoffConfig;
use super::context::{RecoveryContext, RecoveryResult, RecoveryStrategyKind};
use super::strategies::{
    AbortStrategy, FallbackStrategy, RecoveryStrategy, RetryStrategy, SkipStrategy,
};
use crate::core::BuildError;
use crate::events::{event_types, BuildEvent, EventSink, NoOpEventSink};
use std::sync::Arc;
use tracing::{info, warn};

/// Chooses and runs a recovery strategy for a failed build.
///
/// The coordinator only advises: it never re-runs a build or touches an
/// executor. The caller applies `updated_context` and decides what to do next.
pub struct RecoveryStrategyCoordinator {
    retry: RetryStrategy,
    skip: SkipStrategy,
    fallback: FallbackStrategy,
    abort: AbortStrategy,
    events: Arc<dyn EventSink>,
}

impl Default for RecoveryStrategyCoordinator {
    fn default() -> Self {
        Self {
            retry: RetryStrategy::new(),
            skip: SkipStrategy::new(),
            fallback: FallbackStrategy::new(),
            abort: AbortStrategy::new(),
            events: Arc::new(NoOpEventSink),
        }
    }
}

impl RecoveryStrategyCoordinator {
    /// Creates a coordinator with the default retry backoff.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the retry backoff.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.retry = self.retry.with_backoff(backoff);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The strategy registered for `kind`.
    #[must_use]
    pub fn strategy(&self, kind: RecoveryStrategyKind) -> &dyn RecoveryStrategy {
        match kind {
            RecoveryStrategyKind::Retry => &self.retry,
            RecoveryStrategyKind::Skip => &self.skip,
            RecoveryStrategyKind::Fallback => &self.fallback,
            RecoveryStrategyKind::Abort => &self.abort,
        }
    }

    /// Picks a strategy for `error`.
    ///
    /// Abort conditions win outright, even for errors that look transient.
    /// Otherwise the first applicable of Retry, Skip and Fallback is chosen,
    /// and Abort is the default.
    #[must_use]
    pub fn determine_strategy(
        &self,
        error: &BuildError,
        ctx: &RecoveryContext,
    ) -> RecoveryStrategyKind {
        let kind = if self.abort.should_abort(error) {
            RecoveryStrategyKind::Abort
        } else {
            [
                RecoveryStrategyKind::Retry,
                RecoveryStrategyKind::Skip,
                RecoveryStrategyKind::Fallback,
            ]
            .into_iter()
            .find(|kind| self.strategy(*kind).is_applicable(error, ctx))
            .unwrap_or(RecoveryStrategyKind::Abort)
        };

        info!(
            strategy = %kind,
            code = %error.code,
            platform = ?ctx.failed_platform(),
            retry_attempt = ctx.retry_attempt,
            "Selected recovery strategy"
        );
        self.events.try_emit(
            &BuildEvent::new(event_types::RECOVERY_SELECTED)
                .with_data(serde_json::json!({
                    "strategy": kind,
                    "code": error.code,
                    "platform": ctx.failed_platform(),
                })),
        );
        kind
    }

    /// Runs the strategy named `name` ("retry", "skip", "fallback", "abort").
    ///
    /// An unknown name yields a failed result rather than an error.
    pub async fn execute_recovery(&self, name: &str, ctx: &RecoveryContext) -> RecoveryResult {
        match name.parse::<RecoveryStrategyKind>() {
            Ok(kind) => self.execute_strategy(kind, ctx).await,
            Err(err) => {
                warn!(strategy = %name, "Unknown recovery strategy requested");
                RecoveryResult::halt(RecoveryStrategyKind::Abort, err.to_string(), ctx.error.clone())
            }
        }
    }

    /// Runs the strategy of the given kind.
    pub async fn execute_strategy(
        &self,
        kind: RecoveryStrategyKind,
        ctx: &RecoveryContext,
    ) -> RecoveryResult {
        let result = self.strategy(kind).execute(ctx).await;

        if result.success {
            info!(strategy = %kind, "{}", result.message);
        } else {
            warn!(strategy = %kind, "{}", result.message);
        }
        self.events.try_emit(
            &BuildEvent::new(event_types::RECOVERY_EXECUTED).with_data(serde_json::json!({
                "strategy": kind,
                "success": result.success,
                "should_continue": result.should_continue,
                "message": result.message,
            })),
        );
        result
    }

    /// Picks a strategy for the context's error and runs it.
    pub async fn recover(&self, ctx: &RecoveryContext) -> RecoveryResult {
        let kind = self.determine_strategy(&ctx.error, ctx);
        self.execute_strategy(kind, ctx).await
    }
}

impl std::fmt::Debug for RecoveryStrategyCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryStrategyCoordinator")
            .field("backoff", self.retry.backoff())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{error_codes, ErrorSeverity};
    use crate::events::CollectingEventSink;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn coordinator() -> RecoveryStrategyCoordinator {
        RecoveryStrategyCoordinator::new()
            .with_backoff(BackoffConfig::new().with_base_delay_ms(1).without_jitter())
    }

    fn network_error() -> BuildError {
        BuildError::new(error_codes::NETWORK_ERROR, "Network timeout", "build")
    }

    fn config_error() -> BuildError {
        BuildError::new(error_codes::CONFIG_INVALID_PLATFORM, "Invalid platform", "config")
    }

    #[test]
    fn test_determine_abort_for_configuration_errors() {
        let error = config_error();
        let ctx = RecoveryContext::new(error.clone()).with_remaining_platforms(["web"]);
        assert_eq!(coordinator().determine_strategy(&error, &ctx), RecoveryStrategyKind::Abort);
    }

    #[test]
    fn test_determine_retry_for_transient_errors() {
        let error = network_error();
        let ctx = RecoveryContext::new(error.clone());
        assert_eq!(coordinator().determine_strategy(&error, &ctx), RecoveryStrategyKind::Retry);
    }

    #[test]
    fn test_non_recoverable_always_aborts() {
        let error = network_error().with_platform("ios").non_recoverable();
        let ctx = RecoveryContext::new(error.clone())
            .with_remaining_platforms(["web"])
            .with_cached_artifacts(HashMap::from([("ios".to_string(), serde_json::json!({}))]));

        assert_eq!(coordinator().determine_strategy(&error, &ctx), RecoveryStrategyKind::Abort);
    }

    #[test]
    fn test_critical_transient_error_is_retried() {
        let error = network_error().with_severity(ErrorSeverity::Critical);
        let ctx = RecoveryContext::new(error.clone());
        assert_eq!(coordinator().determine_strategy(&error, &ctx), RecoveryStrategyKind::Retry);

        let exhausted = ctx.with_retry_attempt(3);
        assert_eq!(
            coordinator().determine_strategy(&error, &exhausted),
            RecoveryStrategyKind::Abort
        );
    }

    #[test]
    fn test_decision_table_order() {
        let c = coordinator();

        // Retries exhausted: falls through to skip.
        let error = network_error().with_platform("ios");
        let ctx = RecoveryContext::new(error.clone())
            .with_retry_attempt(3)
            .with_remaining_platforms(["web"]);
        assert_eq!(c.determine_strategy(&error, &ctx), RecoveryStrategyKind::Skip);

        // Nothing to skip to: fallback.
        let error = BuildError::build_failed("ios", "Token not found");
        let ctx = RecoveryContext::new(error.clone())
            .with_default_config(HashMap::from([("spacing".to_string(), serde_json::json!(8))]));
        assert_eq!(c.determine_strategy(&error, &ctx), RecoveryStrategyKind::Fallback);

        // Nothing applies: abort.
        let ctx = RecoveryContext::new(error.clone());
        assert_eq!(c.determine_strategy(&error, &ctx), RecoveryStrategyKind::Abort);
    }

    #[tokio::test]
    async fn test_execute_recovery_by_name() {
        let c = coordinator();
        let ctx = RecoveryContext::new(network_error());

        let result = c.execute_recovery("retry", &ctx).await;
        assert_eq!(result.strategy, RecoveryStrategyKind::Retry);
        assert!(result.success);

        let result = c.execute_recovery("abort", &RecoveryContext::new(config_error())).await;
        assert_eq!(result.strategy, RecoveryStrategyKind::Abort);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_unknown_strategy() {
        let result = coordinator()
            .execute_recovery("unknown", &RecoveryContext::new(network_error()))
            .await;

        assert!(!result.success);
        assert!(!result.should_continue);
        assert_eq!(result.message, "Unknown recovery strategy: unknown");
    }

    #[tokio::test]
    async fn test_recover_emits_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let c = coordinator().with_event_sink(sink.clone());

        let ctx = RecoveryContext::new(BuildError::build_failed("ios", "iOS build failed"))
            .with_remaining_platforms(["android", "web"]);
        let result = c.recover(&ctx).await;

        assert_eq!(result.strategy, RecoveryStrategyKind::Skip);
        let selected = sink.events_of_type(event_types::RECOVERY_SELECTED);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].data["strategy"], "skip");
        assert_eq!(selected[0].data["platform"], "ios");

        let executed = sink.events_of_type(event_types::RECOVERY_EXECUTED);
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].data["success"], true);
    }
}

//! Advisory recovery for failed builds.
//!
//! Given a failed build's [`BuildError`](crate::core::BuildError) and a
//! [`RecoveryContext`], the [`RecoveryStrategyCoordinator`] picks one of four
//! strategies and returns a [`RecoveryResult`] telling the caller whether to
//! continue and how to update its context. Recovery never re-runs a build by
//! itself.
//!
//! ```rust,ignore
//! let coordinator = RecoveryStrategyCoordinator::new();
//! let mut ctx = RecoveryContext::new(error).with_remaining_platforms(rest);
//! let advice = coordinator.recover(&ctx).await;
//! if let Some(update) = &advice.updated_context {
//!     ctx.apply(update);
//! }
//! ```

mod backoff;
mod context;
mod coordinator;
mod strategies;

pub use backoff::BackoffConfig;
pub use context::{
    ContextUpdate, RecoveryContext, RecoveryResult, RecoveryStrategyKind, DEFAULT_MAX_RETRIES,
};
pub use coordinator::RecoveryStrategyCoordinator;
pub use strategies::{AbortStrategy, FallbackStrategy, RecoveryStrategy, RetryStrategy, SkipStrategy};

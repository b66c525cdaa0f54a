//! # Buildflow
//!
//! Multi-platform build orchestration.
//!
//! Buildflow runs one build function across a set of target platforms and
//! reports what happened:
//!
//! - **Parallel execution**: unbounded, or in batches of at most N builds
//! - **Sequential execution**: one build at a time with progress snapshots
//! - **Per-build timeouts**: a hung build is recorded as `BUILD_TIMEOUT`
//! - **Cooperative cancellation**: unfinished work is recorded, never lost
//! - **Advisory recovery**: retry, skip, fallback or abort for a failed build
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use buildflow::prelude::*;
//! use std::sync::Arc;
//!
//! let builder = Arc::new(FnBuilder::new(|platform| async move {
//!     Ok(BuildResult::success(platform.clone(), format!("dist/{platform}"), 0))
//! }));
//!
//! let executor = ParallelExecutor::new(ParallelOptions::new().with_max_concurrency(2));
//! let result = executor.execute(&platforms, builder).await?;
//!
//! for failed in result.results.iter().filter(|r| !r.success) {
//!     let ctx = RecoveryContext::new(failed.errors[0].clone());
//!     let advice = RecoveryStrategyCoordinator::new().recover(&ctx).await;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod core;
pub mod errors;
pub mod events;
pub mod executor;
pub mod observability;
pub mod recovery;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::core::{
        error_codes, BuildError, BuildResult, ErrorSeverity, ExecutionResult, Platform,
        ProgressCallback, ProgressSnapshot, SequentialExecutionResult,
    };
    pub use crate::errors::BuildflowError;
    pub use crate::events::{
        BuildEvent, CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::executor::{
        FnBuilder, ParallelExecutor, ParallelOptions, PlatformBuilder, SequentialExecutor,
        SequentialOptions,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::recovery::{
        BackoffConfig, ContextUpdate, RecoveryContext, RecoveryResult,
        RecoveryStrategyCoordinator, RecoveryStrategyKind,
    };
    pub use crate::utils::iso_timestamp;
}

//! Multi-platform build executors.
//!
//! Both executors run every build under the same race: the build task against
//! a per-build timeout and the executor's cancellation token. A hung build is
//! reported as `BUILD_TIMEOUT` without blocking anything else, and a build
//! function that errors or panics becomes a failed [`BuildResult`](crate::core::BuildResult).

mod builder;
mod options;
mod parallel;
mod race;
mod sequential;

pub use builder::{FnBuilder, PlatformBuilder};
pub use options::{
    ParallelOptions, SequentialOptions, DEFAULT_BUILD_TIMEOUT_MS, DEFAULT_CANCEL_POLL_INTERVAL_MS,
};
pub use parallel::ParallelExecutor;
pub use sequential::SequentialExecutor;

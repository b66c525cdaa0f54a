//! The build-function abstraction invoked once per platform.

use crate::core::BuildResult;
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;

/// Builds a single platform.
///
/// A build may fail by returning a failed [`BuildResult`] or by returning
/// `Err`; executors normalize the latter into a `BUILD_FAILED` result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformBuilder: Send + Sync {
    /// Builds `platform`.
    async fn build(&self, platform: &str) -> anyhow::Result<BuildResult>;
}

/// A closure-based builder.
///
/// ```rust,ignore
/// let builder = FnBuilder::new(|platform| async move {
///     Ok(BuildResult::success(platform, "dist", 0))
/// });
/// ```
pub struct FnBuilder<F> {
    func: F,
}

impl<F, Fut> FnBuilder<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<BuildResult>> + Send,
{
    /// Wraps a closure that receives the platform by value.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Debug for FnBuilder<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnBuilder").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> PlatformBuilder for FnBuilder<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<BuildResult>> + Send,
{
    async fn build(&self, platform: &str) -> anyhow::Result<BuildResult> {
        (self.func)(platform.to_string()).await
    }
}

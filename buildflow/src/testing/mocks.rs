//! Mock platform builders for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::core::{BuildError, BuildResult, Platform};
use crate::executor::PlatformBuilder;

/// Records which platforms a builder was asked to build.
#[derive(Debug, Default)]
struct CallLog {
    platforms: Mutex<Vec<Platform>>,
}

impl CallLog {
    fn record(&self, platform: &str) {
        self.platforms.lock().push(platform.to_string());
    }

    fn count(&self) -> usize {
        self.platforms.lock().len()
    }

    fn platforms(&self) -> Vec<Platform> {
        self.platforms.lock().clone()
    }
}

fn set_of<I, P>(platforms: I) -> HashSet<Platform>
where
    I: IntoIterator<Item = P>,
    P: Into<Platform>,
{
    platforms.into_iter().map(Into::into).collect()
}

/// A builder that always succeeds, optionally after a per-platform delay.
#[derive(Debug, Default)]
pub struct SucceedingBuilder {
    delays: HashMap<Platform, Duration>,
    log: CallLog,
}

impl SucceedingBuilder {
    /// Creates a builder that succeeds immediately for every platform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays the build of `platform`.
    #[must_use]
    pub fn with_delay(mut self, platform: impl Into<Platform>, delay: Duration) -> Self {
        self.delays.insert(platform.into(), delay);
        self
    }

    /// Number of builds started.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.log.count()
    }

    /// Platforms built, in call order.
    #[must_use]
    pub fn built_platforms(&self) -> Vec<Platform> {
        self.log.platforms()
    }
}

#[async_trait]
impl PlatformBuilder for SucceedingBuilder {
    async fn build(&self, platform: &str) -> anyhow::Result<BuildResult> {
        self.log.record(platform);
        let delay = self.delays.get(platform).copied().unwrap_or_default();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(BuildResult::success(
            platform,
            format!("dist/{platform}"),
            crate::utils::duration_ms(delay),
        ))
    }
}

/// A builder that fails, for every platform or only for some.
#[derive(Debug)]
pub struct FailingBuilder {
    targets: Option<HashSet<Platform>>,
    code: String,
    message: String,
    as_err: bool,
    log: CallLog,
}

impl FailingBuilder {
    /// Fails every platform with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            targets: None,
            code: crate::core::error_codes::BUILD_FAILED.to_string(),
            message: message.into(),
            as_err: false,
            log: CallLog::default(),
        }
    }

    /// Fails only the listed platforms; the rest succeed.
    #[must_use]
    pub fn only<I, P>(platforms: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Platform>,
    {
        Self {
            targets: Some(set_of(platforms)),
            ..Self::new(message)
        }
    }

    /// Sets the error code of the reported failure.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Reports failure by returning `Err` instead of a failed result.
    #[must_use]
    pub fn returning_err(mut self) -> Self {
        self.as_err = true;
        self
    }

    /// Number of builds started.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.log.count()
    }

    fn fails(&self, platform: &str) -> bool {
        self.targets.as_ref().map_or(true, |t| t.contains(platform))
    }
}

#[async_trait]
impl PlatformBuilder for FailingBuilder {
    async fn build(&self, platform: &str) -> anyhow::Result<BuildResult> {
        self.log.record(platform);
        if !self.fails(platform) {
            return Ok(BuildResult::success(platform, format!("dist/{platform}"), 0));
        }
        if self.as_err {
            anyhow::bail!("{}", self.message);
        }
        let error = BuildError::new(self.code.clone(), self.message.clone(), "build")
            .with_platform(platform);
        Ok(BuildResult::failure(platform, 0, vec![error]))
    }
}

/// A builder that never finishes for the listed platforms.
#[derive(Debug)]
pub struct HangingBuilder {
    targets: HashSet<Platform>,
    log: CallLog,
}

impl HangingBuilder {
    /// Hangs on the listed platforms; the rest succeed immediately.
    #[must_use]
    pub fn for_platforms<I, P>(platforms: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Platform>,
    {
        Self {
            targets: set_of(platforms),
            log: CallLog::default(),
        }
    }

    /// Number of builds started.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.log.count()
    }
}

#[async_trait]
impl PlatformBuilder for HangingBuilder {
    async fn build(&self, platform: &str) -> anyhow::Result<BuildResult> {
        self.log.record(platform);
        if self.targets.contains(platform) {
            futures::future::pending::<()>().await;
        }
        Ok(BuildResult::success(platform, format!("dist/{platform}"), 0))
    }
}

/// A builder that tracks how many builds are in flight at once.
#[derive(Debug)]
pub struct ConcurrencyProbe {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    log: CallLog,
}

impl ConcurrencyProbe {
    /// Creates a probe whose builds each take `delay`.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            log: CallLog::default(),
        }
    }

    /// Highest number of simultaneous builds observed.
    #[must_use]
    pub fn max_observed(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Number of builds started.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.log.count()
    }
}

#[async_trait]
impl PlatformBuilder for ConcurrencyProbe {
    async fn build(&self, platform: &str) -> anyhow::Result<BuildResult> {
        self.log.record(platform);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(BuildResult::success(platform, format!("dist/{platform}"), 0))
    }
}

/// One scripted build outcome.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Build succeeds.
    Succeed,
    /// Build returns a failed result carrying this error.
    Fail(BuildError),
    /// Build returns `Err` with this message.
    Error(String),
}

/// A builder that replays a per-platform script of outcomes.
///
/// Each call pops the next step for its platform; once a platform's script
/// runs out, its builds succeed.
#[derive(Debug, Default)]
pub struct ScriptedBuilder {
    scripts: Mutex<HashMap<Platform, VecDeque<ScriptStep>>>,
    log: CallLog,
}

impl ScriptedBuilder {
    /// Creates a builder with no scripted steps.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step to `platform`'s script.
    #[must_use]
    pub fn then(self, platform: impl Into<Platform>, step: ScriptStep) -> Self {
        self.scripts
            .lock()
            .entry(platform.into())
            .or_default()
            .push_back(step);
        self
    }

    /// Makes `platform` fail with `error` the next `times` builds.
    #[must_use]
    pub fn fail_times(mut self, platform: impl Into<Platform>, error: &BuildError, times: usize) -> Self {
        let platform = platform.into();
        for _ in 0..times {
            self = self.then(platform.clone(), ScriptStep::Fail(error.clone()));
        }
        self
    }

    /// Number of builds started.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.log.count()
    }

    /// Number of builds started for `platform`.
    #[must_use]
    pub fn calls_for(&self, platform: &str) -> usize {
        self.log.platforms().iter().filter(|p| *p == platform).count()
    }
}

#[async_trait]
impl PlatformBuilder for ScriptedBuilder {
    async fn build(&self, platform: &str) -> anyhow::Result<BuildResult> {
        self.log.record(platform);
        let step = self
            .scripts
            .lock()
            .get_mut(platform)
            .and_then(VecDeque::pop_front)
            .unwrap_or(ScriptStep::Succeed);

        match step {
            ScriptStep::Succeed => Ok(BuildResult::success(platform, format!("dist/{platform}"), 0)),
            ScriptStep::Fail(error) => Ok(BuildResult::failure(
                platform,
                0,
                vec![error.with_platform(platform)],
            )),
            ScriptStep::Error(message) => Err(anyhow::anyhow!(message)),
        }
    }
}

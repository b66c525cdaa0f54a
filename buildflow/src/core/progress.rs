//! Progress reporting for sequential runs.

use super::Platform;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Point-in-time view of a sequential run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// The platform about to be built; `None` on the final snapshot.
    pub current_platform: Option<Platform>,
    /// Zero-based index of `current_platform`.
    pub current_index: usize,
    /// Number of platforms requested.
    pub total_platforms: usize,
    /// Percentage of platforms processed so far (0-100).
    pub percent_complete: f64,
    /// Successful builds so far.
    pub success_count: usize,
    /// Failed builds so far.
    pub failure_count: usize,
    /// Milliseconds since the run started.
    #[serde(rename = "elapsedTime")]
    pub elapsed_ms: u64,
}

impl ProgressSnapshot {
    /// Snapshot taken before building the platform at `current_index`.
    #[must_use]
    pub fn before(
        platform: impl Into<Platform>,
        current_index: usize,
        total_platforms: usize,
        success_count: usize,
        failure_count: usize,
        elapsed_ms: u64,
    ) -> Self {
        let percent_complete = if total_platforms == 0 {
            0.0
        } else {
            current_index as f64 / total_platforms as f64 * 100.0
        };

        Self {
            current_platform: Some(platform.into()),
            current_index,
            total_platforms,
            percent_complete,
            success_count,
            failure_count,
            elapsed_ms,
        }
    }

    /// Final snapshot, always at 100%.
    #[must_use]
    pub fn finished(
        total_platforms: usize,
        success_count: usize,
        failure_count: usize,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            current_platform: None,
            current_index: total_platforms,
            total_platforms,
            percent_complete: 100.0,
            success_count,
            failure_count,
            elapsed_ms,
        }
    }

    /// Returns true for the final snapshot.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.current_platform.is_none()
    }
}

/// Callback invoked with each progress snapshot.
pub type ProgressCallback = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_before_each_step() {
        let first = ProgressSnapshot::before("web", 0, 4, 0, 0, 0);
        assert!((first.percent_complete - 0.0).abs() < f64::EPSILON);

        let third = ProgressSnapshot::before("ios", 2, 4, 1, 1, 10);
        assert!((third.percent_complete - 50.0).abs() < f64::EPSILON);
        assert!(!third.is_final());
    }

    #[test]
    fn test_finished_is_complete() {
        let done = ProgressSnapshot::finished(3, 1, 0, 20);
        assert!(done.is_final());
        assert!((done.percent_complete - 100.0).abs() < f64::EPSILON);
    }
}

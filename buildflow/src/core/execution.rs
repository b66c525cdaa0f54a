//! Aggregated results of a multi-platform run.

use super::{BuildError, BuildResult, Platform};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Aggregated result of a parallel run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Identifier of this run, shared with emitted events.
    pub run_id: Uuid,
    /// One result per requested platform.
    pub results: Vec<BuildResult>,
    /// Wall-clock duration of the whole run in milliseconds.
    #[serde(rename = "totalDuration")]
    pub total_duration_ms: u64,
    /// Number of successful builds.
    pub success_count: usize,
    /// Number of failed builds.
    pub failure_count: usize,
    /// False only if the run was cancelled before finishing.
    pub all_completed: bool,
}

impl ExecutionResult {
    /// Builds an aggregate from per-platform results, tallying the counts.
    #[must_use]
    pub fn from_results(
        run_id: Uuid,
        results: Vec<BuildResult>,
        total_duration_ms: u64,
        all_completed: bool,
    ) -> Self {
        let (success_count, failure_count) = tally(&results);
        Self {
            run_id,
            results,
            total_duration_ms,
            success_count,
            failure_count,
            all_completed,
        }
    }

    /// Returns true if every platform built successfully and nothing was cancelled.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.all_completed && self.failure_count == 0
    }

    /// Platforms that built successfully, in result order.
    #[must_use]
    pub fn successful_platforms(&self) -> Vec<Platform> {
        platforms_where(&self.results, true)
    }

    /// Platforms that failed, in result order.
    #[must_use]
    pub fn failed_platforms(&self) -> Vec<Platform> {
        platforms_where(&self.results, false)
    }

    /// All errors across all results.
    #[must_use]
    pub fn errors(&self) -> Vec<&BuildError> {
        self.results.iter().flat_map(|r| r.errors.iter()).collect()
    }

    /// Returns the result for a platform.
    #[must_use]
    pub fn result_for(&self, platform: &str) -> Option<&BuildResult> {
        self.results.iter().find(|r| r.platform == platform)
    }

    /// Converts to a dictionary summary.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        map.insert("total_duration_ms".to_string(), serde_json::json!(self.total_duration_ms));
        map.insert("success_count".to_string(), serde_json::json!(self.success_count));
        map.insert("failure_count".to_string(), serde_json::json!(self.failure_count));
        map.insert("all_completed".to_string(), serde_json::json!(self.all_completed));
        map.insert(
            "failed_platforms".to_string(),
            serde_json::json!(self.failed_platforms()),
        );
        map
    }
}

/// Aggregated result of a sequential run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequentialExecutionResult {
    /// Identifier of this run, shared with emitted events.
    pub run_id: Uuid,
    /// One result per attempted platform, in input order.
    pub results: Vec<BuildResult>,
    /// Wall-clock duration of the whole run in milliseconds.
    #[serde(rename = "totalDuration")]
    pub total_duration_ms: u64,
    /// Number of successful builds.
    pub success_count: usize,
    /// Number of failed builds.
    pub failure_count: usize,
    /// False only if the run was cancelled before finishing.
    pub all_completed: bool,
    /// Whether the run stopped early because a build failed.
    pub stopped_on_failure: bool,
    /// Platforms never attempted, due to cancellation or stop-on-failure.
    pub skipped_platforms: Vec<Platform>,
}

impl SequentialExecutionResult {
    /// Returns true if every platform was attempted and built successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.all_completed && self.failure_count == 0 && self.skipped_platforms.is_empty()
    }

    /// Platforms that built successfully, in input order.
    #[must_use]
    pub fn successful_platforms(&self) -> Vec<Platform> {
        platforms_where(&self.results, true)
    }

    /// Platforms that failed, in input order.
    #[must_use]
    pub fn failed_platforms(&self) -> Vec<Platform> {
        platforms_where(&self.results, false)
    }

    /// All errors across all results.
    #[must_use]
    pub fn errors(&self) -> Vec<&BuildError> {
        self.results.iter().flat_map(|r| r.errors.iter()).collect()
    }

    /// Converts to a dictionary summary.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        map.insert("total_duration_ms".to_string(), serde_json::json!(self.total_duration_ms));
        map.insert("success_count".to_string(), serde_json::json!(self.success_count));
        map.insert("failure_count".to_string(), serde_json::json!(self.failure_count));
        map.insert("all_completed".to_string(), serde_json::json!(self.all_completed));
        map.insert("stopped_on_failure".to_string(), serde_json::json!(self.stopped_on_failure));
        map.insert(
            "skipped_platforms".to_string(),
            serde_json::json!(self.skipped_platforms),
        );
        map
    }
}

/// Counts successes and failures.
pub(crate) fn tally(results: &[BuildResult]) -> (usize, usize) {
    let successes = results.iter().filter(|r| r.success).count();
    (successes, results.len() - successes)
}

fn platforms_where(results: &[BuildResult], success: bool) -> Vec<Platform> {
    results
        .iter()
        .filter(|r| r.success == success)
        .map(|r| r.platform.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExecutionResult {
        ExecutionResult::from_results(
            Uuid::new_v4(),
            vec![
                BuildResult::success("web", "out/web", 3),
                BuildResult::build_failed("ios", 4, "xcodebuild failed"),
                BuildResult::success("android", "out/android", 5),
            ],
            6,
            true,
        )
    }

    #[test]
    fn test_counts_sum_to_results() {
        let result = sample();
        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.success_count + result.failure_count, result.results.len());
        assert!(!result.is_success());
    }

    #[test]
    fn test_platform_partitions() {
        let result = sample();
        assert_eq!(result.successful_platforms(), vec!["web", "android"]);
        assert_eq!(result.failed_platforms(), vec!["ios"]);
        assert_eq!(result.errors().len(), 1);
        assert!(result.result_for("ios").is_some());
    }

    #[test]
    fn test_to_dict() {
        let dict = sample().to_dict();
        assert_eq!(dict.get("failure_count").unwrap(), 1);
        assert_eq!(dict.get("failed_platforms").unwrap(), &serde_json::json!(["ios"]));
    }
}

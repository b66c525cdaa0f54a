//! Test assertions for build results.

use crate::core::{BuildResult, ExecutionResult};
use crate::recovery::{RecoveryResult, RecoveryStrategyKind};

/// Asserts that the build succeeded.
pub fn assert_build_succeeded(result: &BuildResult) {
    assert!(
        result.success,
        "Expected {} to succeed, got errors: {:?}",
        result.platform,
        result.errors.iter().map(ToString::to_string).collect::<Vec<_>>()
    );
    assert!(result.errors.is_empty(), "Successful result carries errors");
}

/// Asserts that the build failed with the given error code.
pub fn assert_build_failed_with(result: &BuildResult, code: &str) {
    assert!(!result.success, "Expected {} to fail", result.platform);
    assert!(
        result.has_error_code(code),
        "Expected error code {code} for {}, got {:?}",
        result.platform,
        result.errors.iter().map(|e| e.code.as_str()).collect::<Vec<_>>()
    );
    assert!(result.package_path.is_empty(), "Failed result has a package path");
}

/// Asserts the aggregate counts add up and match the expected values.
pub fn assert_counts(result: &ExecutionResult, successes: usize, failures: usize) {
    assert_eq!(
        result.success_count + result.failure_count,
        result.results.len(),
        "Counts do not add up to the number of results"
    );
    assert_eq!(
        (result.success_count, result.failure_count),
        (successes, failures),
        "Expected {successes} successes and {failures} failures"
    );
}

/// Asserts that recovery chose `strategy` and whether the caller may continue.
pub fn assert_recovery(result: &RecoveryResult, strategy: RecoveryStrategyKind, should_continue: bool) {
    assert_eq!(
        result.strategy, strategy,
        "Expected {strategy} recovery, got {} ({})",
        result.strategy, result.message
    );
    assert_eq!(
        result.should_continue, should_continue,
        "Unexpected should_continue: {}",
        result.message
    );
}

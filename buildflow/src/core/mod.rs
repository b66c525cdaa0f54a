//! Core build data model.
//!
//! This module provides:
//! - `BuildError` and its severity / stable codes
//! - `BuildResult` for a single platform
//! - `ExecutionResult` / `SequentialExecutionResult` aggregates
//! - `ProgressSnapshot` for sequential progress reporting

mod build_error;
mod build_result;
mod execution;
mod progress;

pub use build_error::{error_codes, BuildError, ErrorSeverity, GENERIC_BUILD_SUGGESTIONS};
pub use build_result::BuildResult;
pub(crate) use execution::tally;
pub use execution::{ExecutionResult, SequentialExecutionResult};
pub use progress::{ProgressCallback, ProgressSnapshot};

/// An opaque build target identifier (e.g. "web", "ios", "android").
pub type Platform = String;

//! Testing utilities for buildflow executors and recovery.
//!
//! This module provides:
//! - Mock platform builders (succeeding, failing, hanging, scripted)
//! - A concurrency probe for bounded-parallelism checks
//! - Assertions for build and recovery results

mod assertions;
mod mocks;

pub use assertions::{
    assert_build_failed_with, assert_build_succeeded, assert_counts, assert_recovery,
};
pub use mocks::{
    ConcurrencyProbe, FailingBuilder, HangingBuilder, ScriptStep, ScriptedBuilder,
    SucceedingBuilder,
};

//! Cooperative cancellation for build runs.
//!
//! This module provides:
//! - CancellationToken, the level-triggered flag shared by a run's
//!   in-flight builds
//! - RunTokens, which gives every executor run its own token

mod runs;
mod token;

pub use runs::{RunGuard, RunTokens};
pub use token::CancellationToken;

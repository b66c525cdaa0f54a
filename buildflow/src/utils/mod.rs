//! Utility functions for timestamps and durations.

pub mod timestamps;

pub use timestamps::{duration_ms, elapsed_ms, iso_timestamp, now_utc, Timestamp};

//! Timestamp and duration helpers.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an ISO 8601 formatted string.
///
/// Format: `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`
///
/// # Examples
///
/// ```
/// use buildflow::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Milliseconds elapsed since `start`, saturating at `u64::MAX`.
#[must_use]
pub fn elapsed_ms(start: Instant) -> u64 {
    duration_ms(start.elapsed())
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
#[must_use]
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_timestamp_parses_back() {
        let ts = iso_timestamp();
        let parsed = DateTime::parse_from_rfc3339(&ts);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_duration_ms() {
        assert_eq!(duration_ms(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_ms(Duration::from_secs(2)), 2000);
    }

    #[test]
    fn test_now_utc_is_recent() {
        let before = Utc::now();
        let now = now_utc();
        assert!(now >= before);
    }
}

//! Build lifecycle events.
//!
//! Executors and the recovery coordinator report what they do through an
//! [`EventSink`]. The default sink discards everything; [`LoggingEventSink`]
//! forwards events to `tracing`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::core::Platform;
use crate::utils::iso_timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type names.
pub mod event_types {
    /// A run started.
    pub const EXECUTION_STARTED: &str = "execution.started";
    /// A run finished (completed, stopped or cancelled).
    pub const EXECUTION_COMPLETED: &str = "execution.completed";
    /// A platform build was launched.
    pub const BUILD_STARTED: &str = "build.started";
    /// A platform build succeeded.
    pub const BUILD_COMPLETED: &str = "build.completed";
    /// A platform build failed.
    pub const BUILD_FAILED: &str = "build.failed";
    /// A platform build exceeded its timeout.
    pub const BUILD_TIMED_OUT: &str = "build.timed_out";
    /// A platform build was cancelled or never started.
    pub const BUILD_CANCELLED: &str = "build.cancelled";
    /// The coordinator chose a recovery strategy.
    pub const RECOVERY_SELECTED: &str = "recovery.selected";
    /// A recovery strategy finished executing.
    pub const RECOVERY_EXECUTED: &str = "recovery.executed";
}

/// A single lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildEvent {
    /// Event type, one of [`event_types`].
    pub event_type: String,
    /// Run the event belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    /// Platform the event concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// Event payload.
    #[serde(default)]
    pub data: serde_json::Value,
    /// When the event was created.
    pub timestamp: String,
}

impl BuildEvent {
    /// Creates a new event with an empty payload.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            run_id: None,
            platform: None,
            data: serde_json::Value::Null,
            timestamp: iso_timestamp(),
        }
    }

    /// Sets the run id.
    #[must_use]
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Sets the platform.
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<Platform>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let run_id = Uuid::new_v4();
        let event = BuildEvent::new(event_types::BUILD_STARTED)
            .with_run_id(run_id)
            .with_platform("web")
            .with_data(serde_json::json!({"index": 0}));

        assert_eq!(event.event_type, "build.started");
        assert_eq!(event.run_id, Some(run_id));
        assert_eq!(event.platform.as_deref(), Some("web"));
        assert_eq!(event.data["index"], 0);
    }

    #[test]
    fn test_event_serialization_skips_empty_fields() {
        let event = BuildEvent::new(event_types::RECOVERY_SELECTED);
        let value = serde_json::to_value(&event).unwrap();

        assert!(value.get("run_id").is_none());
        assert!(value.get("platform").is_none());
        assert_eq!(value["event_type"], "recovery.selected");
    }
}

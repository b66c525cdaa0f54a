//! Event sink trait and implementations.

use super::BuildEvent;
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, Level};

/// Trait for sinks that receive build lifecycle events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: &BuildEvent);

    /// Emits an event without blocking.
    ///
    /// Must never panic; sink failures are swallowed.
    fn try_emit(&self, event: &BuildEvent);
}

/// A sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: &BuildEvent) {}

    fn try_emit(&self, _event: &BuildEvent) {}
}

/// A sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    /// The log level to use.
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &BuildEvent) {
        let run_id = event.run_id.map(|id| id.to_string()).unwrap_or_default();
        let platform = event.platform.as_deref().unwrap_or("-");

        if self.level == Level::DEBUG {
            debug!(
                event_type = %event.event_type,
                run_id = %run_id,
                platform = %platform,
                data = %event.data,
                "Event: {}", event.event_type
            );
        } else {
            info!(
                event_type = %event.event_type,
                run_id = %run_id,
                platform = %platform,
                data = %event.data,
                "Event: {}", event.event_type
            );
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: &BuildEvent) {
        self.log_event(event);
    }

    fn try_emit(&self, event: &BuildEvent) {
        self.log_event(event);
    }
}

/// A sink that keeps every event in memory, for tests and reporting.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<BuildEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events whose type starts with `type_prefix`.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<BuildEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: &BuildEvent) {
        self.events.write().push(event.clone());
    }

    fn try_emit(&self, event: &BuildEvent) {
        self.events.write().push(event.clone());
    }
}

//! Event sink trait and implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, error, info, Level};

/// Receives lifecycle events from the orchestrator and stages.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The type of event (e.g., "stage.started")
    /// * `data` - Optional event data
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// Logs events through `tracing`.
///
/// Failure events (`*.fatal`, `*_failed`) are always logged at error level.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event_type: &str, data: Option<&serde_json::Value>) {
        if event_type.ends_with(".fatal") || event_type.ends_with("_failed") {
            error!(event_type = %event_type, event_data = ?data, "Event: {}", event_type);
        } else if self.level == Level::DEBUG {
            debug!(event_type = %event_type, event_data = ?data, "Event: {}", event_type);
        } else {
            info!(event_type = %event_type, event_data = ?data, "Event: {}", event_type);
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.log_event(event_type, data.as_ref());
    }
}

/// One event captured by [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Event name, e.g. `stage.skipped`.
    pub event_type: String,
    /// The `module` field of the payload, when present.
    pub module: Option<String>,
    /// The payload.
    pub data: Option<serde_json::Value>,
}

impl RecordedEvent {
    fn new(event_type: &str, data: Option<serde_json::Value>) -> Self {
        let module = data
            .as_ref()
            .and_then(|d| d.get("module"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        Self {
            event_type: event_type.to_string(),
            module,
            data,
        }
    }

    /// A payload field, if present.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.as_ref().and_then(|d| d.get(key))
    }
}

/// Records events in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().clone()
    }

    /// Event names in arrival order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.event_type.clone()).collect()
    }

    /// Number of events recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Events whose name starts with `type_prefix`.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<RecordedEvent> {
        self.filtered(|e| e.event_type.starts_with(type_prefix))
    }

    /// Events emitted for `module`, in order.
    #[must_use]
    pub fn events_for_module(&self, module: &str) -> Vec<RecordedEvent> {
        self.filtered(|e| e.module.as_deref() == Some(module))
    }

    fn filtered(&self, keep: impl Fn(&RecordedEvent) -> bool) -> Vec<RecordedEvent> {
        self.events.read().iter().filter(|e| keep(e)).cloned().collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push(RecordedEvent::new(event_type, data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_and_logging_sinks_accept_events() {
        NoOpEventSink.emit("module.started", None).await;
        let sink = LoggingEventSink::default();
        sink.emit("stage.completed", Some(serde_json::json!({"module": "vlan"})))
            .await;
        sink.emit("apply.destroy_failed", None).await;
        LoggingEventSink::debug().emit("stage.started", None).await;
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("module.started", None).await;
        sink.emit("stage.skipped", Some(serde_json::json!({"stage": "apply"})))
            .await;

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.event_types(), vec!["module.started", "stage.skipped"]);
    }

    #[tokio::test]
    async fn test_collecting_sink_filter_and_clear() {
        let sink = CollectingEventSink::new();
        sink.emit("stage.started", None).await;
        sink.emit("stage.completed", None).await;
        sink.emit("module.completed", None).await;

        assert_eq!(sink.events_of_type("stage.").len(), 2);
        assert_eq!(sink.events_of_type("module.").len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_collecting_sink_indexes_by_module() {
        let sink = CollectingEventSink::new();
        sink.emit("module.started", Some(serde_json::json!({"module": "vlan"})))
            .await;
        sink.emit("module.started", Some(serde_json::json!({"module": "dns"})))
            .await;
        sink.emit("stage.skipped", Some(serde_json::json!({"module": "vlan", "stage": "apply"})))
            .await;

        let vlan = sink.events_for_module("vlan");
        assert_eq!(vlan.len(), 2);
        assert_eq!(vlan[1].event_type, "stage.skipped");
        assert_eq!(vlan[1].field("stage"), Some(&serde_json::json!("apply")));
        assert_eq!(sink.events()[1].module.as_deref(), Some("dns"));
    }
}

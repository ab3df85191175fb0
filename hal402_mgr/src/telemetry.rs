//! Telemetry publishers.
//!
//! - [`LatchedPublisher`] keeps the last event per topic (shared, cloneable)
//! - [`JsonLinePublisher`] writes one JSON object per event to a writer
//! - [`FanoutPublisher`] forwards every event to several publishers

use hal402_common::telemetry::{ErrorEvent, StatusEvent, TelemetryPublisher};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

#[derive(Debug, Default)]
struct LatchedTopics {
    status: BTreeMap<String, StatusEvent>,
    errors: BTreeMap<String, ErrorEvent>,
    published: u64,
}

/// Publisher that retains the last value of every topic.
///
/// Clones share the same store, so a handle kept outside the manager
/// observes everything the manager publishes.
#[derive(Debug, Clone, Default)]
pub struct LatchedPublisher {
    inner: Arc<Mutex<LatchedTopics>>,
}

impl LatchedPublisher {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LatchedTopics> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Last status event on `topic`.
    pub fn status(&self, topic: &str) -> Option<StatusEvent> {
        self.lock().status.get(topic).cloned()
    }

    /// Last error event on `topic`.
    pub fn error(&self, topic: &str) -> Option<ErrorEvent> {
        self.lock().errors.get(topic).cloned()
    }

    /// All latched status events, sorted by topic.
    pub fn status_snapshot(&self) -> Vec<(String, StatusEvent)> {
        self.lock()
            .status
            .iter()
            .map(|(topic, event)| (topic.clone(), event.clone()))
            .collect()
    }

    /// Total events received.
    pub fn published(&self) -> u64 {
        self.lock().published
    }
}

impl TelemetryPublisher for LatchedPublisher {
    fn publish_status(&mut self, topic: &str, event: &StatusEvent) {
        let mut topics = self.lock();
        topics.status.insert(topic.to_string(), event.clone());
        topics.published += 1;
    }

    fn publish_error(&mut self, topic: &str, event: &ErrorEvent) {
        let mut topics = self.lock();
        topics.errors.insert(topic.to_string(), event.clone());
        topics.published += 1;
    }
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    topic: &'a str,
    payload: &'a T,
}

/// Publisher writing newline-delimited JSON.
pub struct JsonLinePublisher<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinePublisher<W> {
    /// Wrap `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit<T: Serialize>(&mut self, topic: &str, payload: &T) {
        let envelope = Envelope { topic, payload };
        let result = serde_json::to_writer(&mut self.writer, &envelope)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));
        if let Err(e) = result {
            warn!("Failed to publish on {}: {}", topic, e);
        }
    }
}

impl<W: Write + Send> TelemetryPublisher for JsonLinePublisher<W> {
    fn publish_status(&mut self, topic: &str, event: &StatusEvent) {
        self.emit(topic, event);
    }

    fn publish_error(&mut self, topic: &str, event: &ErrorEvent) {
        self.emit(topic, event);
    }
}

/// Forward every event to each wrapped publisher in order.
#[derive(Default)]
pub struct FanoutPublisher {
    sinks: Vec<Box<dyn TelemetryPublisher>>,
}

impl FanoutPublisher {
    /// Create with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn with(mut self, sink: Box<dyn TelemetryPublisher>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl TelemetryPublisher for FanoutPublisher {
    fn publish_status(&mut self, topic: &str, event: &StatusEvent) {
        for sink in &mut self.sinks {
            sink.publish_status(topic, event);
        }
    }

    fn publish_error(&mut self, topic: &str, event: &ErrorEvent) {
        for sink in &mut self.sinks {
            sink.publish_error(topic, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hal402_common::ds402::state::DriveState;

    fn status(state: DriveState) -> StatusEvent {
        StatusEvent {
            drive_name: "drive_1".to_string(),
            state,
            status_word: 0x40,
            message: None,
        }
    }

    #[test]
    fn test_latched_keeps_last_value() {
        let handle = LatchedPublisher::new();
        let mut publisher = handle.clone();
        publisher.publish_status("svc/drive_1_status", &status(DriveState::Unknown));
        publisher.publish_status("svc/drive_1_status", &status(DriveState::SwitchOnDisabled));
        publisher.publish_error("svc/drive_1_error", &ErrorEvent::none("drive_1"));

        assert_eq!(
            handle.status("svc/drive_1_status").map(|e| e.state),
            Some(DriveState::SwitchOnDisabled)
        );
        assert_eq!(handle.error("svc/drive_1_error").map(|e| e.code), Some(0));
        assert_eq!(handle.published(), 3);
        assert_eq!(handle.status_snapshot().len(), 1);
        assert!(handle.status("svc/drive_2_status").is_none());
    }

    #[test]
    fn test_json_lines() {
        let mut publisher = JsonLinePublisher::new(Vec::new());
        publisher.publish_status("svc/drive_1_status", &status(DriveState::SwitchOnDisabled));
        publisher.publish_error("svc/drive_1_error", &ErrorEvent::none("drive_1"));

        let out = String::from_utf8(publisher.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["topic"], "svc/drive_1_status");
        assert_eq!(lines[0]["payload"]["state"], "SWITCH_ON_DISABLED");
        assert_eq!(lines[0]["payload"]["status_word"], 0x40);
        assert_eq!(lines[1]["payload"]["code"], 0);
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let a = LatchedPublisher::new();
        let b = LatchedPublisher::new();
        let mut fanout = FanoutPublisher::new()
            .with(Box::new(a.clone()))
            .with(Box::new(b.clone()));
        fanout.publish_status("t", &status(DriveState::Fault));
        assert_eq!(a.published(), 1);
        assert_eq!(b.published(), 1);
    }
}

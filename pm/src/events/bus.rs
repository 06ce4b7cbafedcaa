//! Event Bus - central pub/sub system for sync diagnostics
//!
//! The EventBus uses tokio broadcast channels to deliver events to all subscribers
//! with minimal latency. The engine emits events, consumers (CLI, tests) subscribe.

use tokio::sync::broadcast;
use tracing::debug;

use super::types::{DiscardReason, SyncEvent};
use crate::domain::BackendId;
use crate::registry::Generation;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 4_096;

/// Central event bus for sync engine diagnostics
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Subscribe to receive events
    ///
    /// Returns a receiver that will receive all events emitted after subscription.
    /// Note: Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter handle for the engine
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter { tx: self.tx.clone() }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for components to emit events without owning the bus
///
/// Emitting never blocks and never fails: with no subscribers the event is
/// dropped, and a lagging subscriber loses the oldest events.
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventEmitter {
    /// Emitter with no bus behind it
    pub fn detached() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Emit a raw event
    pub fn emit(&self, event: SyncEvent) {
        debug!(event_type = event.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(event);
    }

    // === Convenience methods ===

    pub fn event_received(&self, event_type: &str, backend_id: &BackendId) {
        self.emit(SyncEvent::EventReceived {
            event_type: event_type.to_string(),
            backend_id: backend_id.clone(),
        });
    }

    pub fn protocol_violation(&self, event_type: &str, backend_id: &BackendId) {
        self.emit(SyncEvent::ProtocolViolation {
            event_type: event_type.to_string(),
            backend_id: backend_id.clone(),
        });
    }

    pub fn feed_ended(&self, pending_fetches: usize) {
        self.emit(SyncEvent::FeedEnded { pending_fetches });
    }

    pub fn feed_failed(&self, message: &str) {
        self.emit(SyncEvent::FeedFailed {
            message: message.to_string(),
        });
    }

    pub fn fetch_started(&self, backend_id: &BackendId, generation: Generation) {
        self.emit(SyncEvent::FetchStarted {
            backend_id: backend_id.clone(),
            generation,
        });
    }

    pub fn fetch_completed(&self, backend_id: &BackendId, generation: Generation, point_count: usize) {
        self.emit(SyncEvent::FetchCompleted {
            backend_id: backend_id.clone(),
            generation,
            point_count,
        });
    }

    pub fn fetch_failed(&self, backend_id: &BackendId, generation: Generation, message: &str) {
        self.emit(SyncEvent::FetchFailed {
            backend_id: backend_id.clone(),
            generation,
            message: message.to_string(),
        });
    }

    pub fn fetch_discarded(&self, backend_id: &BackendId, generation: Generation, reason: DiscardReason) {
        self.emit(SyncEvent::FetchDiscarded {
            backend_id: backend_id.clone(),
            generation,
            reason,
        });
    }

    pub fn overlay_added(&self, key: &str, backend_id: &BackendId) {
        self.emit(SyncEvent::OverlayAdded {
            key: key.to_string(),
            backend_id: backend_id.clone(),
        });
    }

    pub fn overlay_removed(&self, key: &str, backend_id: &BackendId) {
        self.emit(SyncEvent::OverlayRemoved {
            key: key.to_string(),
            backend_id: backend_id.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_emit_without_subscribers() {
        // This should not panic even with no subscribers
        let bus = EventBus::new(100);
        bus.emitter().feed_ended(0);
        EventEmitter::detached().overlay_added("A", &BackendId::from("1"));
    }

    #[tokio::test]
    async fn test_emitter_convenience_methods() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();
        let emitter = bus.emitter();
        let id = BackendId::from("1");

        emitter.event_received("REGISTERED", &id);
        emitter.fetch_started(&id, 1);
        emitter.fetch_completed(&id, 1, 2);
        emitter.overlay_added("A", &id);

        let types: Vec<&str> = [
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
        ]
        .iter()
        .map(|e| e.event_type())
        .collect();
        assert_eq!(types, vec!["EventReceived", "FetchStarted", "FetchCompleted", "OverlayAdded"]);

        // No more events
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(100);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emitter().overlay_removed("A", &BackendId::from("1"));

        assert_eq!(rx1.recv().await.unwrap().event_type(), "OverlayRemoved");
        assert_eq!(rx2.recv().await.unwrap().event_type(), "OverlayRemoved");
    }
}

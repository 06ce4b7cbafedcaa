//! Diagnostic event types for registry synchronization
//!
//! These events represent all observable activity of the sync engine:
//! - Feed (event received, feed ended, feed failed, protocol violation)
//! - Fetch lifecycle (started, completed, failed, discarded)
//! - Overlays (added, removed)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::BackendId;
use crate::registry::Generation;

/// Core event enum - the vocabulary of sync engine activity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    // === Feed ===
    /// An event arrived from the registry feed
    EventReceived { event_type: String, backend_id: BackendId },
    /// The feed delivered an event tag outside the protocol
    ProtocolViolation { event_type: String, backend_id: BackendId },
    /// The feed ended cleanly
    FeedEnded { pending_fetches: usize },
    /// The feed failed
    FeedFailed { message: String },

    // === Fetches ===
    /// A data fetch was issued for a registration
    FetchStarted { backend_id: BackendId, generation: Generation },
    /// A fetch returned data for the current registration
    FetchCompleted {
        backend_id: BackendId,
        generation: Generation,
        point_count: usize,
    },
    /// A fetch failed; nothing was changed
    FetchFailed {
        backend_id: BackendId,
        generation: Generation,
        message: String,
    },
    /// A fetch finished after its registration was removed or replaced
    FetchDiscarded {
        backend_id: BackendId,
        generation: Generation,
        reason: DiscardReason,
    },

    // === Overlays ===
    /// An overlay was added to the map
    OverlayAdded { key: String, backend_id: BackendId },
    /// An overlay was removed from the map
    OverlayRemoved { key: String, backend_id: BackendId },
}

/// Why a fetch result was thrown away
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscardReason {
    /// The backend is no longer registered
    Unregistered,
    /// The backend re-registered while the fetch was in flight
    Superseded,
}

impl SyncEvent {
    /// Get the backend this event concerns, if any
    pub fn backend_id(&self) -> Option<&BackendId> {
        match self {
            SyncEvent::EventReceived { backend_id, .. }
            | SyncEvent::ProtocolViolation { backend_id, .. }
            | SyncEvent::FetchStarted { backend_id, .. }
            | SyncEvent::FetchCompleted { backend_id, .. }
            | SyncEvent::FetchFailed { backend_id, .. }
            | SyncEvent::FetchDiscarded { backend_id, .. }
            | SyncEvent::OverlayAdded { backend_id, .. }
            | SyncEvent::OverlayRemoved { backend_id, .. } => Some(backend_id),
            SyncEvent::FeedEnded { .. } | SyncEvent::FeedFailed { .. } => None,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            SyncEvent::EventReceived { .. } => "EventReceived",
            SyncEvent::ProtocolViolation { .. } => "ProtocolViolation",
            SyncEvent::FeedEnded { .. } => "FeedEnded",
            SyncEvent::FeedFailed { .. } => "FeedFailed",
            SyncEvent::FetchStarted { .. } => "FetchStarted",
            SyncEvent::FetchCompleted { .. } => "FetchCompleted",
            SyncEvent::FetchFailed { .. } => "FetchFailed",
            SyncEvent::FetchDiscarded { .. } => "FetchDiscarded",
            SyncEvent::OverlayAdded { .. } => "OverlayAdded",
            SyncEvent::OverlayRemoved { .. } => "OverlayRemoved",
        }
    }
}

/// A timestamped event for line-oriented output
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Timestamp of the event
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    /// The event
    pub event: SyncEvent,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: SyncEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_backend_id() {
        let event = SyncEvent::OverlayAdded {
            key: "A".to_string(),
            backend_id: BackendId::from("1"),
        };
        assert_eq!(event.backend_id(), Some(&BackendId::from("1")));
        assert_eq!(SyncEvent::FeedEnded { pending_fetches: 0 }.backend_id(), None);
    }

    #[test]
    fn test_event_type() {
        let event = SyncEvent::FetchDiscarded {
            backend_id: BackendId::from("1"),
            generation: 3,
            reason: DiscardReason::Superseded,
        };
        assert_eq!(event.event_type(), "FetchDiscarded");
    }

    #[test]
    fn test_event_log_entry_serialization() {
        let entry = EventLogEntry::new(SyncEvent::FetchStarted {
            backend_id: BackendId::from("summit-backend"),
            generation: 1,
        });

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"ts\""));
        assert!(json.contains("\"type\":\"FetchStarted\""));
        assert!(json.contains("summit-backend"));
    }

    #[test]
    fn test_discard_reason_names() {
        let json = serde_json::to_string(&DiscardReason::Unregistered).unwrap();
        assert_eq!(json, "\"unregistered\"");
    }
}

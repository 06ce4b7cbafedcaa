//! Message types for the sync engine

use serde::Serialize;
use tokio::sync::oneshot;

use crate::domain::{BackendId, DataPoint};
use crate::registry::{Generation, Registration};
use crate::transport::FetchError;

/// A fetch issued for one specific registration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub backend_id: BackendId,
    pub generation: Generation,
}

/// Result of a fetch task, posted back to the engine
#[derive(Debug)]
pub struct FetchCompletion {
    pub ticket: FetchTicket,
    pub result: Result<Vec<DataPoint>, FetchError>,
}

/// Control requests to the engine task
#[derive(Debug)]
pub enum SyncRequest {
    /// Get the current registry state
    GetSnapshot {
        reply_tx: oneshot::Sender<RegistrySnapshot>,
    },

    /// Get current metrics
    GetMetrics {
        reply_tx: oneshot::Sender<SyncMetrics>,
    },

    /// Stop the engine without waiting for the feed to end
    Shutdown,
}

/// One occupied presentation slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlaySlot {
    pub key: String,
    pub backend_id: BackendId,
    pub generation: Generation,
}

/// Point-in-time copy of the registry state, sorted for stable output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrySnapshot {
    pub backends: Vec<Registration>,
    pub overlays: Vec<OverlaySlot>,
}

impl RegistrySnapshot {
    /// Ids of the live backends
    pub fn backend_ids(&self) -> Vec<BackendId> {
        self.backends.iter().map(|r| r.backend.id.clone()).collect()
    }

    /// Occupied presentation keys
    pub fn overlay_keys(&self) -> Vec<String> {
        self.overlays.iter().map(|s| s.key.clone()).collect()
    }

    pub fn registration(&self, id: &BackendId) -> Option<&Registration> {
        self.backends.iter().find(|r| &r.backend.id == id)
    }

    pub fn slot(&self, key: &str) -> Option<&OverlaySlot> {
        self.overlays.iter().find(|s| s.key == key)
    }
}

/// Sync engine metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncMetrics {
    pub events_received: u64,
    pub registrations: u64,
    pub unregistrations: u64,
    pub fetches_started: u64,
    pub fetches_completed: u64,
    pub fetches_failed: u64,
    pub fetches_discarded: u64,
    pub overlays_added: u64,
    pub overlays_removed: u64,
    pub live_backends: usize,
    pub displayed_overlays: usize,
    pub in_flight_fetches: usize,
}

//! Sync engine errors

use thiserror::Error;

use crate::domain::BackendId;
use crate::transport::FeedError;

/// Conditions that stop the sync engine
///
/// Fetch failures and stale fetches are not in here: they are contained in
/// the handling of a single registration and only show up as diagnostics.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Protocol violation: unrecognized event type '{event_type}' for backend {backend_id}")]
    Protocol { event_type: String, backend_id: BackendId },

    #[error("Event feed failed: {0}")]
    Feed(#[from] FeedError),

    #[error("Sync engine channel closed")]
    ChannelClosed,
}

impl SyncError {
    /// Check if this error means the feed itself is corrupt
    pub fn is_protocol(&self) -> bool {
        matches!(self, SyncError::Protocol { .. })
    }
}

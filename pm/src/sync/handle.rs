//! SyncHandle - client interface to a running sync engine

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::error::SyncError;
use super::messages::{RegistrySnapshot, SyncMetrics, SyncRequest};

/// Handle for querying and stopping the engine
///
/// Cloneable; every clone talks to the same engine task.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<SyncRequest>,
}

impl SyncHandle {
    pub(crate) fn new(tx: mpsc::Sender<SyncRequest>) -> Self {
        debug!("SyncHandle::new: called");
        Self { tx }
    }

    /// Get the current registry state
    pub async fn snapshot(&self) -> Result<RegistrySnapshot, SyncError> {
        debug!("SyncHandle::snapshot: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SyncRequest::GetSnapshot { reply_tx })
            .await
            .map_err(|_| SyncError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SyncError::ChannelClosed)
    }

    /// Get current metrics
    pub async fn metrics(&self) -> Result<SyncMetrics, SyncError> {
        debug!("SyncHandle::metrics: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SyncRequest::GetMetrics { reply_tx })
            .await
            .map_err(|_| SyncError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SyncError::ChannelClosed)
    }

    /// Ask the engine to stop
    pub async fn shutdown(&self) -> Result<(), SyncError> {
        debug!("SyncHandle::shutdown: called");
        self.tx
            .send(SyncRequest::Shutdown)
            .await
            .map_err(|_| SyncError::ChannelClosed)
    }
}

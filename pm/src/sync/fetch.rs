//! FetchCoordinator - spawns and tracks backend data fetches
//!
//! One tokio task per fetch. Each task reports back over the completion
//! channel; the engine applies completions on its own task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::messages::{FetchCompletion, FetchTicket};
use crate::domain::BackendId;
use crate::events::{DiscardReason, EventEmitter};
use crate::transport::{FetchError, FetchTransport};

/// Tracks the fetches in flight
pub struct FetchCoordinator {
    transport: Arc<dyn FetchTransport>,
    completions_tx: mpsc::Sender<FetchCompletion>,
    timeout: Duration,
    abort_superseded: bool,
    pending: HashMap<FetchTicket, JoinHandle<()>>,
    emitter: EventEmitter,
    started: u64,
    aborted: u64,
}

impl FetchCoordinator {
    pub fn new(
        transport: Arc<dyn FetchTransport>,
        completions_tx: mpsc::Sender<FetchCompletion>,
        timeout: Duration,
        abort_superseded: bool,
        emitter: EventEmitter,
    ) -> Self {
        debug!(?timeout, abort_superseded, "FetchCoordinator::new: called");
        Self {
            transport,
            completions_tx,
            timeout,
            abort_superseded,
            pending: HashMap::new(),
            emitter,
            started: 0,
            aborted: 0,
        }
    }

    /// Spawn the fetch for `ticket`
    pub fn start(&mut self, ticket: FetchTicket) {
        debug!(backend_id = %ticket.backend_id, generation = ticket.generation, "FetchCoordinator::start: called");
        let transport = self.transport.clone();
        let completions_tx = self.completions_tx.clone();
        let timeout = self.timeout;
        let task_ticket = ticket.clone();

        let handle = tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, transport.fetch_data(&task_ticket.backend_id)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(timeout)),
            };
            // Nowhere to deliver once the engine has stopped
            let _ = completions_tx
                .send(FetchCompletion {
                    ticket: task_ticket,
                    result,
                })
                .await;
        });

        self.started += 1;
        self.emitter.fetch_started(&ticket.backend_id, ticket.generation);
        self.pending.insert(ticket, handle);
    }

    /// Abort the in-flight fetches of `backend_id`, if configured to
    ///
    /// Returns the number aborted. Without `abort_superseded` the fetches run
    /// on and their results are discarded when they arrive.
    pub fn cancel(&mut self, backend_id: &BackendId, reason: DiscardReason) -> usize {
        debug!(%backend_id, ?reason, "FetchCoordinator::cancel: called");
        if !self.abort_superseded {
            return 0;
        }

        let tickets: Vec<FetchTicket> = self
            .pending
            .keys()
            .filter(|t| &t.backend_id == backend_id)
            .cloned()
            .collect();

        for ticket in &tickets {
            if let Some(handle) = self.pending.remove(ticket) {
                handle.abort();
                self.aborted += 1;
                info!(%backend_id, generation = ticket.generation, ?reason, "Aborted in-flight fetch");
                self.emitter.fetch_discarded(backend_id, ticket.generation, reason);
            }
        }
        tickets.len()
    }

    /// Mark a completion as received
    ///
    /// Returns false if the fetch was aborted; its result must be dropped.
    pub fn settle(&mut self, ticket: &FetchTicket) -> bool {
        debug!(backend_id = %ticket.backend_id, generation = ticket.generation, "FetchCoordinator::settle: called");
        self.pending.remove(ticket).is_some()
    }

    /// Abort everything still in flight
    pub fn abort_all(&mut self) {
        debug!(pending = self.pending.len(), "FetchCoordinator::abort_all: called");
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }

    /// Number of fetches in flight
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn started(&self) -> u64 {
        self.started
    }

    pub fn aborted(&self) -> u64 {
        self.aborted
    }
}

impl Drop for FetchCoordinator {
    fn drop(&mut self) {
        self.abort_all();
    }
}

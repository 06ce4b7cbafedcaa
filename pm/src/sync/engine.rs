//! SyncEngine - main task for registry synchronization
//!
//! A single task owns all state. It serializes three inputs: fetch
//! completions, feed events and control requests. Completions are polled
//! first, then the feed, so a test that releases a fetch sees it applied
//! before the next event it sends.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::config::SyncConfig;
use super::error::SyncError;
use super::fetch::FetchCoordinator;
use super::handle::SyncHandle;
use super::messages::{FetchCompletion, RegistrySnapshot, SyncMetrics, SyncRequest};
use super::reconciler::{Reconciler, Transition};
use crate::domain::BackendChangeEvent;
use crate::events::{DiscardReason, EventBus, EventEmitter};
use crate::render::OverlayRenderer;
use crate::transport::{FeedError, FetchTransport};

/// Final state of an engine that stopped cleanly
pub struct SyncReport<R: OverlayRenderer> {
    pub snapshot: RegistrySnapshot,
    pub metrics: SyncMetrics,
    pub renderer: R,
}

/// State owned by the engine task
struct EngineState<R: OverlayRenderer> {
    reconciler: Reconciler<R>,
    fetches: FetchCoordinator,
}

impl<R: OverlayRenderer> EngineState<R> {
    fn on_event(&mut self, event: BackendChangeEvent) -> Result<(), SyncError> {
        match self.reconciler.apply(event)? {
            Transition::Registered { ticket, replaced } => {
                if replaced {
                    self.fetches.cancel(&ticket.backend_id, DiscardReason::Superseded);
                }
                self.fetches.start(ticket);
            }
            Transition::Unregistered { backend_id, was_live } => {
                if was_live {
                    self.fetches.cancel(&backend_id, DiscardReason::Unregistered);
                }
            }
        }
        Ok(())
    }

    fn on_completion(&mut self, completion: FetchCompletion) {
        if !self.fetches.settle(&completion.ticket) {
            debug!(backend_id = %completion.ticket.backend_id, "on_completion: fetch was aborted, dropping result");
            return;
        }
        self.reconciler.complete_fetch(completion);
    }

    /// Returns false when the engine should stop
    fn on_request(&mut self, request: SyncRequest) -> bool {
        match request {
            SyncRequest::GetSnapshot { reply_tx } => {
                let _ = reply_tx.send(self.reconciler.snapshot());
                true
            }
            SyncRequest::GetMetrics { reply_tx } => {
                let _ = reply_tx.send(self.metrics());
                true
            }
            SyncRequest::Shutdown => {
                info!("Sync engine shutdown requested");
                false
            }
        }
    }

    fn metrics(&self) -> SyncMetrics {
        let mut metrics = self.reconciler.metrics();
        metrics.fetches_started = self.fetches.started();
        metrics.fetches_discarded += self.fetches.aborted();
        metrics.in_flight_fetches = self.fetches.pending();
        metrics
    }
}

/// Drives the registry state machine from an event feed
pub struct SyncEngine<R: OverlayRenderer> {
    state: EngineState<R>,
    completions_rx: mpsc::Receiver<FetchCompletion>,
    requests_tx: mpsc::Sender<SyncRequest>,
    requests_rx: mpsc::Receiver<SyncRequest>,
    emitter: EventEmitter,
}

impl<R: OverlayRenderer> SyncEngine<R> {
    /// Create an engine rendering into `renderer` and fetching through `transport`
    pub fn new(config: SyncConfig, renderer: R, transport: Arc<dyn FetchTransport>, bus: &EventBus) -> Self {
        debug!(?config, "SyncEngine::new: called");
        let (requests_tx, requests_rx) = mpsc::channel(config.channel_buffer.max(1));
        let (completions_tx, completions_rx) = mpsc::channel(config.completion_buffer.max(1));
        let emitter = bus.emitter();

        let reconciler = Reconciler::new(renderer, config.overlay_key, emitter.clone());
        let fetches = FetchCoordinator::new(
            transport,
            completions_tx,
            config.fetch_timeout(),
            config.abort_superseded,
            emitter.clone(),
        );

        Self {
            state: EngineState { reconciler, fetches },
            completions_rx,
            requests_tx,
            requests_rx,
            emitter,
        }
    }

    /// Get a handle for querying or stopping the engine
    pub fn handle(&self) -> SyncHandle {
        SyncHandle::new(self.requests_tx.clone())
    }

    /// Run the engine until the feed ends, fails, or shutdown is requested
    ///
    /// When the feed ends, fetches already in flight are still applied
    /// before returning. A protocol violation or feed failure stops the
    /// engine at once.
    pub async fn run<S>(self, feed: S) -> Result<SyncReport<R>, SyncError>
    where
        S: Stream<Item = Result<BackendChangeEvent, FeedError>> + Send,
    {
        let SyncEngine {
            mut state,
            mut completions_rx,
            requests_tx,
            mut requests_rx,
            emitter,
        } = self;
        // Only handles given out keep the request channel open
        drop(requests_tx);

        tokio::pin!(feed);
        let mut feed_open = true;

        info!("Sync engine started");

        let result = loop {
            if !feed_open && state.fetches.pending() == 0 {
                debug!("run: feed ended and no fetches in flight");
                break Ok(());
            }

            tokio::select! {
                biased;

                Some(completion) = completions_rx.recv() => state.on_completion(completion),

                item = feed.next(), if feed_open => match item {
                    Some(Ok(event)) => {
                        if let Err(e) = state.on_event(event) {
                            break Err(e);
                        }
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Event feed failed");
                        emitter.feed_failed(&e.to_string());
                        break Err(SyncError::Feed(e));
                    }
                    None => {
                        feed_open = false;
                        let pending = state.fetches.pending();
                        info!(pending, "Event feed ended, waiting for in-flight fetches");
                        emitter.feed_ended(pending);
                    }
                },

                Some(request) = requests_rx.recv() => {
                    if !state.on_request(request) {
                        break Ok(());
                    }
                }

                else => break Ok(()),
            }
        };

        let metrics = state.metrics();
        state.fetches.abort_all();
        info!(
            events = metrics.events_received,
            live_backends = metrics.live_backends,
            displayed_overlays = metrics.displayed_overlays,
            "Sync engine stopped"
        );
        result?;

        let snapshot = state.reconciler.snapshot();
        Ok(SyncReport {
            snapshot,
            metrics,
            renderer: state.reconciler.into_renderer(),
        })
    }
}

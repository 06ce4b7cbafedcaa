//! Reconciler - the registry state machine
//!
//! Owns the backend directory, the overlay index and the renderer. Every
//! method runs synchronously on the engine task; the async parts (the
//! fetches) live in the fetch coordinator and come back here as
//! [`FetchCompletion`]s.
//!
//! Per backend id the state is simply Absent or Live. A pending fetch is not
//! a state: a completion is applied only if the registration it was issued
//! for is still the current one.

use tracing::{debug, error, info, warn};

use super::error::SyncError;
use super::messages::{FetchCompletion, FetchTicket, OverlaySlot, RegistrySnapshot, SyncMetrics};
use crate::domain::{BackendChangeEvent, BackendId, RegistryEventType};
use crate::events::{DiscardReason, EventEmitter};
use crate::registry::{BackendDirectory, Generation, OverlayEntry, OverlayIndex, OverlayKeying};
use crate::render::OverlayRenderer;

/// What applying one event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The backend is live under a new registration; `ticket` must be fetched
    Registered { ticket: FetchTicket, replaced: bool },
    /// The backend is absent; `was_live` is false if it already was
    Unregistered { backend_id: BackendId, was_live: bool },
}

/// What applying one fetch completion did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// An overlay was built and placed in slot `key`
    Applied { key: String },
    /// The fetch failed; nothing changed
    Failed,
    /// The registration was gone or replaced; nothing changed
    Discarded(DiscardReason),
}

/// The registry state machine
pub struct Reconciler<R: OverlayRenderer> {
    directory: BackendDirectory,
    overlays: OverlayIndex<R::Handle>,
    renderer: R,
    keying: OverlayKeying,
    last_generation: Generation,
    emitter: EventEmitter,
    metrics: SyncMetrics,
}

impl<R: OverlayRenderer> Reconciler<R> {
    pub fn new(renderer: R, keying: OverlayKeying, emitter: EventEmitter) -> Self {
        debug!(?keying, "Reconciler::new: called");
        Self {
            directory: BackendDirectory::new(),
            overlays: OverlayIndex::new(),
            renderer,
            keying,
            last_generation: 0,
            emitter,
            metrics: SyncMetrics::default(),
        }
    }

    /// Apply one feed event
    ///
    /// An unrecognized event type is rejected before anything is mutated.
    pub fn apply(&mut self, event: BackendChangeEvent) -> Result<Transition, SyncError> {
        let BackendChangeEvent {
            event_type,
            backend_info,
        } = event;
        let backend_id = backend_info.id.clone();
        debug!(%event_type, %backend_id, "Reconciler::apply: called");

        self.metrics.events_received += 1;
        self.emitter.event_received(event_type.as_str(), &backend_id);

        match event_type {
            RegistryEventType::Registered => {
                info!(%backend_id, display_name = %backend_info.display_name, "Backend registered");
                let replaced = self.directory.contains(&backend_id);
                if replaced {
                    debug!(%backend_id, "apply: re-registration, tearing down previous registration");
                    self.cleanup(&backend_id);
                }

                self.last_generation += 1;
                let generation = self.last_generation;
                self.directory.put(backend_info, generation);
                self.metrics.registrations += 1;

                Ok(Transition::Registered {
                    ticket: FetchTicket { backend_id, generation },
                    replaced,
                })
            }
            RegistryEventType::Unregistered => {
                let was_live = self.directory.contains(&backend_id);
                if was_live {
                    info!(%backend_id, "Backend unregistered");
                    self.cleanup(&backend_id);
                    self.directory.remove(&backend_id);
                    self.metrics.unregistrations += 1;
                } else {
                    debug!(%backend_id, "apply: unregister for unknown backend, nothing to do");
                }
                Ok(Transition::Unregistered { backend_id, was_live })
            }
            RegistryEventType::Unrecognized(tag) => {
                error!(event_type = %tag, %backend_id, "Unrecognized registry event type");
                self.emitter.protocol_violation(&tag, &backend_id);
                Err(SyncError::Protocol {
                    event_type: tag,
                    backend_id,
                })
            }
        }
    }

    /// Apply the result of a fetch
    pub fn complete_fetch(&mut self, completion: FetchCompletion) -> FetchOutcome {
        let FetchCompletion { ticket, result } = completion;
        let FetchTicket { backend_id, generation } = ticket;
        debug!(%backend_id, generation, "Reconciler::complete_fetch: called");

        // The registration may have been removed or replaced while in flight
        let key = match self.directory.get(&backend_id) {
            Some(current) if current.generation == generation => self.keying.key_for(&current.backend),
            current => {
                let reason = if current.is_some() {
                    DiscardReason::Superseded
                } else {
                    DiscardReason::Unregistered
                };
                info!(%backend_id, generation, ?reason, "Discarding stale fetch result");
                self.metrics.fetches_discarded += 1;
                self.emitter.fetch_discarded(&backend_id, generation, reason);
                return FetchOutcome::Discarded(reason);
            }
        };

        let points = match result {
            Ok(points) => points,
            Err(e) => {
                warn!(%backend_id, generation, error = %e, "Fetch failed");
                self.metrics.fetches_failed += 1;
                self.emitter.fetch_failed(&backend_id, generation, &e.to_string());
                return FetchOutcome::Failed;
            }
        };

        info!(%backend_id, points = points.len(), "Fetch completed");
        self.metrics.fetches_completed += 1;
        self.emitter.fetch_completed(&backend_id, generation, points.len());

        let handle = self.renderer.build_overlay(&points);
        self.renderer.add_overlay(&handle);
        let displaced = self.overlays.put(
            key.clone(),
            OverlayEntry {
                handle,
                backend_id: backend_id.clone(),
                generation,
            },
        );
        self.metrics.overlays_added += 1;
        info!(%backend_id, %key, "Overlay added");
        self.emitter.overlay_added(&key, &backend_id);

        // Only another backend with the same key can have held this slot
        if let Some(previous) = displaced {
            warn!(
                %key,
                %backend_id,
                displaced_backend_id = %previous.backend_id,
                "Presentation key shared by two backends, replacing overlay"
            );
            self.renderer.remove_overlay(&previous.handle);
            self.metrics.overlays_removed += 1;
            self.emitter.overlay_removed(&key, &previous.backend_id);
        }

        FetchOutcome::Applied { key }
    }

    /// Take down the overlay owned by the live backend `backend_id`, if any
    fn cleanup(&mut self, backend_id: &BackendId) {
        let Some(registration) = self.directory.get(backend_id) else {
            return;
        };
        let key = self.keying.key_for(&registration.backend);

        let owned = self
            .overlays
            .get(&key)
            .is_some_and(|entry| &entry.backend_id == backend_id);
        if !owned {
            debug!(%backend_id, %key, "cleanup: no overlay owned by backend, skipping");
            return;
        }

        if let Some(entry) = self.overlays.remove(&key) {
            self.renderer.remove_overlay(&entry.handle);
            self.metrics.overlays_removed += 1;
            info!(%backend_id, %key, "Overlay removed");
            self.emitter.overlay_removed(&key, backend_id);
        }
    }

    /// Copy of the current state, sorted by id and key
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut backends: Vec<_> = self.directory.iter().map(|(_, r)| r.clone()).collect();
        backends.sort_by(|a, b| a.backend.id.cmp(&b.backend.id));

        let mut overlays: Vec<_> = self
            .overlays
            .iter()
            .map(|(key, entry)| OverlaySlot {
                key: key.clone(),
                backend_id: entry.backend_id.clone(),
                generation: entry.generation,
            })
            .collect();
        overlays.sort_by(|a, b| a.key.cmp(&b.key));

        RegistrySnapshot { backends, overlays }
    }

    pub fn metrics(&self) -> SyncMetrics {
        SyncMetrics {
            live_backends: self.directory.len(),
            displayed_overlays: self.overlays.len(),
            ..self.metrics.clone()
        }
    }

    pub fn directory(&self) -> &BackendDirectory {
        &self.directory
    }

    pub fn overlays(&self) -> &OverlayIndex<R::Handle> {
        &self.overlays
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }
}

//! Event Bus for live sync diagnostics
//!
//! Every notable step of the sync engine emits a [`SyncEvent`]: events
//! received from the feed, fetches started/completed/failed/discarded, and
//! overlays added/removed. Consumers (the CLI, tests) subscribe to the bus.
//!
//! Emission is best-effort. It never blocks the engine and the engine never
//! depends on anyone receiving what it emits.
//!
//! ```rust,ignore
//! let bus = EventBus::with_default_capacity();
//! let mut rx = bus.subscribe();
//! let engine = SyncEngine::new(config, renderer, transport, &bus);
//! while let Ok(event) = rx.recv().await {
//!     println!("{:?}", event);
//! }
//! ```

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter};
pub use types::{DiscardReason, EventLogEntry, SyncEvent};

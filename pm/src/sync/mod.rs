//! Registry synchronization engine
//!
//! Keeps the map's overlays consistent with a stream of backend
//! registration events:
//! - **Reconciler:** the per-backend state machine over the directory and
//!   overlay index
//! - **FetchCoordinator:** one task per data fetch, results posted back
//! - **SyncEngine:** the task that serializes feed events, fetch results and
//!   control requests

mod config;
mod engine;
mod error;
mod fetch;
mod handle;
mod messages;
mod reconciler;

pub use config::SyncConfig;
pub use engine::{SyncEngine, SyncReport};
pub use error::SyncError;
pub use fetch::FetchCoordinator;
pub use handle::SyncHandle;
pub use messages::{FetchCompletion, FetchTicket, OverlaySlot, RegistrySnapshot, SyncMetrics, SyncRequest};
pub use reconciler::{FetchOutcome, Reconciler, Transition};

//! poimap - backend registry synchronization for map overlays
//!
//! A registry announces backends as they come and go. For every live backend
//! poimap fetches its point-of-interest data and keeps exactly one overlay on
//! the map; when the backend leaves, its overlay goes with it.
//!
//! # Core Concepts
//!
//! - **Single Writer**: One engine task owns all state; fetches run
//!   concurrently but their results are applied by that task
//! - **Registrations, not ids**: Every registration gets a generation, so a
//!   late fetch can never land under a newer registration of the same backend
//! - **Fail Loud on Protocol Errors**: An unknown event type stops the engine
//!   before anything is mutated
//!
//! # Modules
//!
//! - [`domain`] - Backends, change events, data points
//! - [`registry`] - Backend directory and overlay index
//! - [`sync`] - Reconciler, fetch coordinator and engine task
//! - [`transport`] - Gateway SSE/HTTP client and offline replay
//! - [`render`] - Renderer trait and the in-memory map model
//! - [`events`] - Diagnostic event bus
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod registry;
pub mod render;
pub mod sync;
pub mod transport;

// Re-export commonly used types
pub use config::{Config, GatewayConfig};
pub use domain::{Backend, BackendChangeEvent, BackendId, DataPoint, RegistryEventType};
pub use events::{EventBus, EventEmitter, SyncEvent};
pub use registry::{BackendDirectory, Generation, OverlayIndex, OverlayKeying};
pub use render::{MapModel, OverlayRenderer};
pub use sync::{RegistrySnapshot, SyncConfig, SyncEngine, SyncError, SyncHandle, SyncMetrics, SyncReport};
pub use transport::{DirectoryTransport, FeedError, FetchError, FetchTransport, GatewayClient};

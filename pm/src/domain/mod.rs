//! Domain types for poimap
//!
//! Backends, the change events the registry feed delivers about them, and the
//! opaque data points a backend serves. Nothing in here performs I/O.

mod backend;
mod event;
mod id;

pub use backend::{Backend, Coordinates, DataPoint};
pub use event::{BackendChangeEvent, RegistryEventType};
pub use id::BackendId;

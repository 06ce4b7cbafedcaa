//! Registry state owned by the sync engine
//!
//! - [`BackendDirectory`]: which backends are live, and under which registration
//! - [`OverlayIndex`]: which overlay currently occupies each presentation slot
//!
//! Both are plain in-memory maps with no locking. They are only ever touched
//! from the engine task, which serializes every mutation.

mod directory;
mod overlays;

pub use directory::{BackendDirectory, Generation, Registration};
pub use overlays::{OverlayEntry, OverlayIndex, OverlayKeying};

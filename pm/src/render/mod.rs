//! Rendering collaborator
//!
//! The engine asks a renderer to build an overlay from a data set, to show it,
//! and later to take it away. It never looks inside the handle it gets back.
//! [`MapModel`] is the bundled in-memory implementation.

use std::fmt::Debug;

use crate::domain::DataPoint;

mod map;

pub use map::{LayerId, MapModel, MapView, Marker, MarkerLayer};

/// Builds and displays overlays on behalf of the sync engine
///
/// Called only from the engine task, one call at a time.
pub trait OverlayRenderer: Send + 'static {
    /// Opaque reference to a built overlay
    type Handle: Clone + Debug + Send + 'static;

    /// Build an overlay from a backend's data set
    fn build_overlay(&mut self, points: &[DataPoint]) -> Self::Handle;

    /// Show a built overlay on the map
    fn add_overlay(&mut self, handle: &Self::Handle);

    /// Take an overlay off the map and release it
    fn remove_overlay(&mut self, handle: &Self::Handle);
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::{Arc, Mutex};

    /// One call the engine made on the renderer
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RenderOp {
        Build(u64),
        Add(u64),
        Remove(u64),
    }

    #[derive(Debug, Default)]
    struct RenderLog {
        next: u64,
        built: HashMap<u64, Vec<DataPoint>>,
        displayed: BTreeSet<u64>,
        ops: Vec<RenderOp>,
    }

    /// Renderer that records every call
    ///
    /// Clones share the same log, so a test can keep one clone and hand the
    /// other to the engine.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingRenderer {
        log: Arc<Mutex<RenderLog>>,
    }

    impl RecordingRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Handles currently on the map
        pub fn displayed(&self) -> Vec<u64> {
            self.log.lock().unwrap().displayed.iter().copied().collect()
        }

        /// Data set a handle was built from
        pub fn points_for(&self, handle: u64) -> Vec<DataPoint> {
            self.log.lock().unwrap().built.get(&handle).cloned().unwrap_or_default()
        }

        pub fn ops(&self) -> Vec<RenderOp> {
            self.log.lock().unwrap().ops.clone()
        }
    }

    impl OverlayRenderer for RecordingRenderer {
        type Handle = u64;

        fn build_overlay(&mut self, points: &[DataPoint]) -> u64 {
            let mut log = self.log.lock().unwrap();
            log.next += 1;
            let handle = log.next;
            log.built.insert(handle, points.to_vec());
            log.ops.push(RenderOp::Build(handle));
            handle
        }

        fn add_overlay(&mut self, handle: &u64) {
            let mut log = self.log.lock().unwrap();
            assert!(log.displayed.insert(*handle), "overlay {} added twice", handle);
            log.ops.push(RenderOp::Add(*handle));
        }

        fn remove_overlay(&mut self, handle: &u64) {
            let mut log = self.log.lock().unwrap();
            assert!(log.displayed.remove(handle), "overlay {} removed but not displayed", handle);
            log.ops.push(RenderOp::Remove(*handle));
        }
    }
}

//! OverlayIndex - presentation slot to overlay handle

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::directory::Generation;
use crate::domain::{Backend, BackendId};

/// How a backend's presentation key is derived
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayKeying {
    /// Key by `displayName`. Backends sharing a name share one slot.
    #[default]
    DisplayName,
    /// Key by backend id. Every live backend gets its own slot.
    BackendId,
}

impl OverlayKeying {
    /// Presentation key for `backend` under this keying
    pub fn key_for(&self, backend: &Backend) -> String {
        match self {
            OverlayKeying::DisplayName => backend.display_name.clone(),
            OverlayKeying::BackendId => backend.id.to_string(),
        }
    }
}

/// A displayed overlay and the registration it was built for
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayEntry<H> {
    pub handle: H,
    pub backend_id: BackendId,
    pub generation: Generation,
}

/// Authoritative mapping of presentation key to the overlay displayed there
///
/// Handles are owned by the renderer; the index only references them.
#[derive(Debug)]
pub struct OverlayIndex<H> {
    slots: HashMap<String, OverlayEntry<H>>,
}

impl<H> Default for OverlayIndex<H> {
    fn default() -> Self {
        Self { slots: HashMap::new() }
    }
}

impl<H> OverlayIndex<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `entry` in slot `key`
    ///
    /// Returns the entry that previously occupied the slot. The caller owns
    /// tearing that overlay down.
    pub fn put(&mut self, key: impl Into<String>, entry: OverlayEntry<H>) -> Option<OverlayEntry<H>> {
        let key = key.into();
        debug!(%key, backend_id = %entry.backend_id, "OverlayIndex::put: called");
        self.slots.insert(key, entry)
    }

    pub fn get(&self, key: &str) -> Option<&OverlayEntry<H>> {
        self.slots.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<OverlayEntry<H>> {
        debug!(%key, "OverlayIndex::remove: called");
        self.slots.remove(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OverlayEntry<H>)> {
        self.slots.iter()
    }
}

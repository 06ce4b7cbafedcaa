//! BackendDirectory - live backends keyed by id

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::domain::{Backend, BackendId};

/// Registration counter, unique across the lifetime of one engine
///
/// Every processed REGISTERED event gets a fresh value, so a fetch started for
/// an older registration of the same id can be told apart from the current one.
pub type Generation = u64;

/// One live registration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub backend: Backend,
    pub generation: Generation,
}

/// Authoritative mapping of live backend id to its current registration
#[derive(Debug, Default)]
pub struct BackendDirectory {
    entries: HashMap<BackendId, Registration>,
}

impl BackendDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the registration for `backend.id`
    ///
    /// Returns the registration that was replaced, if any.
    pub fn put(&mut self, backend: Backend, generation: Generation) -> Option<Registration> {
        debug!(backend_id = %backend.id, generation, "BackendDirectory::put: called");
        self.entries
            .insert(backend.id.clone(), Registration { backend, generation })
    }

    pub fn get(&self, id: &BackendId) -> Option<&Registration> {
        self.entries.get(id)
    }

    pub fn remove(&mut self, id: &BackendId) -> Option<Registration> {
        debug!(backend_id = %id, "BackendDirectory::remove: called");
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &BackendId) -> bool {
        self.entries.contains_key(id)
    }

    /// True if `id` is live and still holds registration `generation`
    pub fn is_current(&self, id: &BackendId, generation: Generation) -> bool {
        self.entries.get(id).is_some_and(|r| r.generation == generation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BackendId, &Registration)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let mut dir = BackendDirectory::new();
        assert!(dir.is_empty());

        assert!(dir.put(Backend::new("1", "A"), 1).is_none());
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.get(&"1".into()).unwrap().backend.display_name, "A");

        let removed = dir.remove(&"1".into()).unwrap();
        assert_eq!(removed.generation, 1);
        assert!(!dir.contains(&"1".into()));
        assert!(dir.remove(&"1".into()).is_none());
    }

    #[test]
    fn test_put_replaces_whole_registration() {
        let mut dir = BackendDirectory::new();
        dir.put(Backend::new("1", "A"), 1);

        let old = dir.put(Backend::new("1", "B"), 2).unwrap();
        assert_eq!(old.backend.display_name, "A");
        assert_eq!(dir.len(), 1);

        let current = dir.get(&"1".into()).unwrap();
        assert_eq!(current.backend.display_name, "B");
        assert_eq!(current.generation, 2);
    }

    #[test]
    fn test_is_current_tracks_generation() {
        let mut dir = BackendDirectory::new();
        let id = BackendId::from("1");
        assert!(!dir.is_current(&id, 1));

        dir.put(Backend::new("1", "A"), 1);
        assert!(dir.is_current(&id, 1));

        dir.put(Backend::new("1", "A"), 2);
        assert!(!dir.is_current(&id, 1));
        assert!(dir.is_current(&id, 2));

        dir.remove(&id);
        assert!(!dir.is_current(&id, 2));
    }
}

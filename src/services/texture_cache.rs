//! Session-scoped in-memory cache of head chunks
//!
//! Maps texture identifiers to the 600-byte head chunk already read from
//! the blob file, so repeat requests never touch the blob buffer again.
//! Grows monotonically across incremental scans; no eviction. A miss is a
//! normal transient state during incremental population, not corruption.

use std::collections::HashMap;

use bytes::Bytes;
use tracing::{debug, trace};
use uuid::Uuid;

/// Identifier-keyed lookup table of head chunks
#[derive(Debug, Default)]
pub struct TextureCacheMap {
    chunks: HashMap<Uuid, Bytes>,
}

impl TextureCacheMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a head chunk; last writer wins.
    pub fn add(&mut self, id: Uuid, head_chunk: Bytes) {
        if self.chunks.insert(id, head_chunk).is_some() {
            trace!("Replaced cached head chunk for {}", id);
        }
    }

    /// Cheaply cloned head chunk, or a logged miss.
    pub fn get(&self, id: &Uuid) -> Option<Bytes> {
        let found = self.chunks.get(id).cloned();
        if found.is_none() {
            debug!("Texture {} not yet fetched", id);
        }
        found
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.chunks.contains_key(id)
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Bytes> {
        self.chunks.remove(id)
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_get_roundtrip() {
        let mut map = TextureCacheMap::new();
        let id = Uuid::new_v4();
        map.add(id, Bytes::from_static(b"head"));
        assert!(map.contains(&id));
        assert_eq!(map.get(&id).unwrap(), Bytes::from_static(b"head"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_miss_is_none() {
        let map = TextureCacheMap::new();
        assert!(map.get(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_last_writer_wins() {
        let mut map = TextureCacheMap::new();
        let id = Uuid::new_v4();
        map.add(id, Bytes::from_static(b"old"));
        map.add(id, Bytes::from_static(b"new"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&id).unwrap(), Bytes::from_static(b"new"));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut map = TextureCacheMap::new();
        let id = Uuid::new_v4();
        map.add(id, Bytes::new());
        assert!(map.remove(&id).is_some());
        assert!(map.remove(&id).is_none());

        map.add(Uuid::new_v4(), Bytes::new());
        map.add(Uuid::new_v4(), Bytes::new());
        map.clear();
        assert!(map.is_empty());
    }
}

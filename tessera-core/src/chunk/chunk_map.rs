//! The in-memory chunk map.
//!
//! Keyed by the packed chunk position; safe for concurrent readers and
//! writers. Lookups never wait on generation — a fresh entry is
//! inserted empty and filled in by whoever generated it. The map knows
//! nothing about persistence.

use std::sync::Arc;

use parking_lot::RwLock;
use tessera_utils::ChunkPos;

use super::Chunk;

/// A shared handle to a cached chunk. The map is the sole mutator;
/// response encoders take read guards.
pub type ChunkHandle = Arc<RwLock<Chunk>>;

/// Thread-safe chunk cache.
pub struct ChunkMap {
    chunks: scc::HashMap<ChunkPos, ChunkHandle>,
}

impl Default for ChunkMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunks: scc::HashMap::new(),
        }
    }

    /// Returns the cached handle, if any.
    #[must_use]
    pub fn get(&self, pos: ChunkPos) -> Option<ChunkHandle> {
        self.chunks.read_sync(&pos, |_, handle| handle.clone())
    }

    /// Returns the existing handle or atomically inserts a fresh,
    /// ungenerated chunk.
    #[must_use]
    pub fn get_or_create(&self, pos: ChunkPos) -> ChunkHandle {
        self.chunks
            .entry_sync(pos)
            .or_insert_with(|| Arc::new(RwLock::new(Chunk::new(pos))))
            .get()
            .clone()
    }

    /// Replaces the entry for the chunk's position. Existing handles
    /// observe the new contents through their shared lock.
    pub fn put(&self, chunk: Chunk) {
        let pos = chunk.pos();
        let entry = self
            .chunks
            .entry_sync(pos)
            .or_insert_with(|| Arc::new(RwLock::new(Chunk::new(pos))));
        *entry.get().write() = chunk;
    }

    /// Removes the entry, if present.
    pub fn remove(&self, pos: ChunkPos) {
        let _ = self.chunks.remove_sync(&pos);
    }

    /// Drops every entry whose Chebyshev distance from `center`
    /// exceeds `radius`. Returns the number of evicted chunks.
    pub fn evict_outside(&self, center: ChunkPos, radius: i32) -> usize {
        let before = self.chunks.len();
        self.chunks
            .retain_sync(|pos, _| pos.chebyshev_distance(center) <= radius);
        before.saturating_sub(self.chunks.len())
    }

    /// The number of cached chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Takes a snapshot of every entry for iteration. Mutations during
    /// the scan may or may not be reflected.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(ChunkPos, ChunkHandle)> {
        let mut entries = Vec::with_capacity(self.chunks.len());
        self.chunks.iter_sync(|pos, handle| {
            entries.push((*pos, handle.clone()));
            true
        });
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_inserts_once() {
        let map = ChunkMap::new();
        let pos = ChunkPos::new(2, 3);
        let a = map.get_or_create(pos);
        let b = map.get_or_create(pos);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(map.len(), 1);
        assert!(!a.read().generated());
    }

    #[test]
    fn put_replaces_contents_in_place() {
        let map = ChunkMap::new();
        let pos = ChunkPos::new(0, 0);
        let handle = map.get_or_create(pos);

        let mut replacement = Chunk::new(pos);
        replacement.set_generated(true);
        map.put(replacement);

        // The pre-existing handle observes the replacement.
        assert!(handle.read().generated());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn evict_outside_uses_chebyshev_distance() {
        let map = ChunkMap::new();
        for x in -5..=5 {
            for y in -5..=5 {
                let _ = map.get_or_create(ChunkPos::new(x, y));
            }
        }
        assert_eq!(map.len(), 121);

        let evicted = map.evict_outside(ChunkPos::new(0, 0), 2);
        assert_eq!(map.len(), 25);
        assert_eq!(evicted, 121 - 25);
        assert!(map.get(ChunkPos::new(2, -2)).is_some());
        assert!(map.get(ChunkPos::new(3, 0)).is_none());
    }

    #[test]
    fn remove_discards_entry() {
        let map = ChunkMap::new();
        let pos = ChunkPos::new(7, -7);
        let _ = map.get_or_create(pos);
        map.remove(pos);
        assert!(map.get(pos).is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn snapshot_covers_all_entries() {
        let map = ChunkMap::new();
        for i in 0..10 {
            let _ = map.get_or_create(ChunkPos::new(i, -i));
        }
        let snapshot = map.snapshot();
        assert_eq!(snapshot.len(), 10);
    }
}

//! Sorted Batch - a skip list bundled with the arenas it lives in.
//!
//! Intended for per-frame work such as ordering draw calls by distance:
//! fill the batch with `submit`, read it back in order, then `clear` it for
//! the next frame. Clearing rewinds both arenas; no memory is returned to
//! the system until the batch is dropped.

use tracing::debug;

use crate::config::SkipListConfig;
use crate::error::MapError;
use crate::node::NodeArena;
use crate::skiplist::{Insertion, Iter, ScratchArena, SkipList};

/// A skip list that owns its node and scratch arenas.
pub struct SortedBatch<K, V> {
    /// Permanent node storage for the current batch
    nodes: NodeArena<K, V>,
    /// Transient storage for update traces
    scratch: ScratchArena,
    /// The ordered map
    map: SkipList<K, V>,
    /// Number of completed batches (clears)
    generation: u64,
}

impl<K, V> SortedBatch<K, V>
where
    K: Copy + PartialOrd,
    V: Copy,
{
    /// Create a batch with arenas sized from `config`.
    ///
    /// Capacities that cannot be addressed by a `u32` index are rejected
    /// with `ArenaError::CapacityTooLarge`.
    pub fn new(config: &SkipListConfig) -> Result<Self, MapError> {
        let mut nodes = NodeArena::try_new(config.node_capacity, config.link_capacity)?;
        let scratch = ScratchArena::try_new(config.scratch_capacity)?;
        let map = SkipList::new(&mut nodes, config)?;

        Ok(Self {
            nodes,
            scratch,
            map,
            generation: 0,
        })
    }

    /// Insert or overwrite an entry.
    #[inline]
    pub fn submit(&mut self, key: K, value: V) -> Result<Insertion, MapError> {
        self.map
            .insert_with_scratch(key, value, &mut self.nodes, &mut self.scratch)
    }

    /// Value stored under `key`.
    #[inline]
    pub fn get(&self, key: K) -> Option<V> {
        self.map.search(&self.nodes, key)
    }

    /// Key at position `index` in batch order.
    #[inline]
    pub fn key_at(&self, index: usize) -> Result<K, MapError> {
        self.map.key_at(&self.nodes, index)
    }

    /// Value at position `index` in batch order.
    #[inline]
    pub fn value_at(&self, index: usize) -> Result<V, MapError> {
        self.map.value_at(&self.nodes, index)
    }

    /// Iterate over entries in batch order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.map.iter(&self.nodes)
    }

    /// Drop every entry and rewind both arenas.
    pub fn clear(&mut self) -> Result<(), MapError> {
        debug_assert!(self.map.check_invariants(&self.nodes), "skip list invariants broken");
        let dropped = self.map.len();
        self.nodes.clear();
        self.scratch.clear();
        self.map.reset(&mut self.nodes)?;
        self.generation += 1;
        debug!(generation = self.generation, dropped, "sorted batch cleared");
        Ok(())
    }

    /// Pre-fault both arenas.
    pub fn warm_up(&mut self) {
        self.nodes.warm_up();
        self.scratch.warm_up();
    }

    /// Number of entries in the current batch
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the current batch is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of completed batches
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Node storage bytes used and reserved.
    #[inline]
    pub fn node_usage(&self) -> (usize, usize) {
        (self.nodes.bytes_used(), self.nodes.byte_capacity())
    }

    /// The underlying skip list
    #[inline]
    pub fn map(&self) -> &SkipList<K, V> {
        &self.map
    }

    /// The node arena backing the skip list
    #[inline]
    pub fn nodes(&self) -> &NodeArena<K, V> {
        &self.nodes
    }
}

impl<K, V> std::fmt::Debug for SortedBatch<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortedBatch")
            .field("map", &self.map)
            .field("nodes", &self.nodes)
            .field("scratch", &self.scratch)
            .field("generation", &self.generation)
            .finish()
    }
}

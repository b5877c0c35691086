//! Skip list node storage.
//!
//! A node is split in two: a fixed-size record in the record arena and a
//! tower of `height` forward links in the link arena. Links are plain `u32`
//! words, so a node of height `h` costs one record plus `h` words:
//!
//! ```text
//! records: [ Header { links: 0, height: 10 } | Entry { k, v, links: 10, height: 2 } | ... ]
//! links:   [ l0 l1 .. l9                     | l0 l1                               | ... ]
//! ```
//!
//! Node handles are record indices. Forward links are record indices too,
//! `NULL_INDEX` meaning "none".

use std::fmt;
use std::mem::size_of;

use crate::arena::{Arena, ArenaIndex, NULL_INDEX};
use crate::config::MAX_LEVEL;
use crate::error::ArenaError;

/// Links owned by the header sentinel.
pub const HEADER_LINKS: u32 = MAX_LEVEL as u32;

/// Mean drawn node height, used to split a byte budget between records
/// and links.
pub const AVERAGE_HEIGHT: u32 = 2;

/// One record of the record arena.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Node<K, V> {
    /// Never written since the last push reset it.
    Vacant,
    /// The header sentinel.
    Header {
        /// First link of the tower in the link arena.
        links: ArenaIndex,
        /// Number of links in the tower.
        height: u8,
    },
    /// A live entry.
    Entry {
        /// Ordering key.
        key: K,
        /// Payload.
        value: V,
        /// First link of the tower in the link arena.
        links: ArenaIndex,
        /// Number of links in the tower.
        height: u8,
    },
}

impl<K, V> Default for Node<K, V> {
    fn default() -> Self {
        Node::Vacant
    }
}

impl<K, V> Node<K, V> {
    /// Start and length of this node's tower. Vacant records have none.
    #[inline]
    fn tower(&self) -> (ArenaIndex, usize) {
        match *self {
            Node::Header { links, height } | Node::Entry { links, height, .. } => (links, height as usize),
            Node::Vacant => (NULL_INDEX, 0),
        }
    }
}

/// Storage for skip list nodes: a record arena plus a link arena.
pub struct NodeArena<K, V> {
    records: Arena<Node<K, V>>,
    links: Arena<ArenaIndex>,
}

impl<K: Copy, V: Copy> NodeArena<K, V> {
    /// Create storage for `records` nodes (header included) and `links`
    /// forward links in total.
    ///
    /// # Panics
    /// Panics if either capacity is not below `NULL_INDEX`.
    pub fn new(records: u32, links: u32) -> Self {
        Self {
            records: Arena::new(records),
            links: Arena::new(links),
        }
    }

    /// Fallible [`NodeArena::new`].
    pub fn try_new(records: u32, links: u32) -> Result<Self, ArenaError> {
        Ok(Self {
            records: Arena::try_new(records)?,
            links: Arena::try_new(links)?,
        })
    }

    /// Size both arenas from a byte budget.
    ///
    /// The header's links come off the top; the rest is split assuming
    /// nodes of `AVERAGE_HEIGHT`. Taller-than-average batches run out of
    /// links before records.
    pub fn with_byte_capacity(bytes: usize) -> Self {
        let link_size = size_of::<ArenaIndex>();
        let per_node = size_of::<Node<K, V>>() + AVERAGE_HEIGHT as usize * link_size;
        let spare = bytes.saturating_sub(HEADER_LINKS as usize * link_size);
        let max_records = (NULL_INDEX - 1 - HEADER_LINKS) / AVERAGE_HEIGHT;
        let records = (spare / per_node).min(max_records as usize) as u32;
        Self::new(records, records * AVERAGE_HEIGHT + HEADER_LINKS)
    }

    /// Allocate the header sentinel with `height` null links.
    pub(crate) fn alloc_header(&mut self, height: usize) -> Result<ArenaIndex, ArenaError> {
        self.alloc(height, |links| Node::Header {
            links,
            height: height as u8,
        })
    }

    /// Allocate an entry with `height` null links.
    pub(crate) fn alloc_entry(&mut self, key: K, value: V, height: usize) -> Result<ArenaIndex, ArenaError> {
        self.alloc(height, |links| Node::Entry {
            key,
            value,
            links,
            height: height as u8,
        })
    }

    /// Reserve the tower, then the record. If the record does not fit the
    /// tower is popped again, so a failure leaves both arenas as they were.
    fn alloc<F>(&mut self, height: usize, record: F) -> Result<ArenaIndex, ArenaError>
    where
        F: FnOnce(ArenaIndex) -> Node<K, V>,
    {
        let height = height as u32;
        let tower = self.links.push(height)?;
        let index = match self.records.push(1) {
            Ok(index) => index,
            Err(err) => {
                self.links.pop(height)?;
                return Err(err);
            }
        };

        self.links.slice_mut(tower, height).fill(NULL_INDEX);
        *self.records.get_mut(index) = record(tower);
        Ok(index)
    }

    /// Number of forward links of `node`.
    #[inline]
    pub fn height_of(&self, node: ArenaIndex) -> usize {
        self.records.get(node).tower().1
    }

    /// Forward link of `node` at `level`.
    ///
    /// Reading from a vacant record or above the node's height is a logic
    /// error (typically a map used after its arena was cleared without
    /// `reset`). Debug builds panic; release builds read "none".
    #[inline]
    pub fn forward(&self, node: ArenaIndex, level: usize) -> ArenaIndex {
        let (links, height) = self.records.get(node).tower();
        debug_assert!(level < height, "link {} read from node {} of height {}", level, node, height);
        if level < height {
            *self.links.get(links + level as u32)
        } else {
            NULL_INDEX
        }
    }

    /// Point `node`'s link at `level` to `next`.
    #[inline]
    pub(crate) fn set_forward(&mut self, node: ArenaIndex, level: usize, next: ArenaIndex) {
        let (links, height) = self.records.get(node).tower();
        debug_assert!(level < height, "link {} written to node {} of height {}", level, node, height);
        *self.links.get_mut(links + level as u32) = next;
    }

    /// Key and value of the entry at `node`, or `None` for the header.
    #[inline]
    pub fn entry(&self, node: ArenaIndex) -> Option<(K, V)> {
        match *self.records.get(node) {
            Node::Entry { key, value, .. } => Some((key, value)),
            _ => None,
        }
    }

    /// Key of the entry at `node`.
    #[inline]
    pub fn key_of(&self, node: ArenaIndex) -> Option<K> {
        self.entry(node).map(|(key, _)| key)
    }

    /// Overwrite the value of the entry at `node` in place.
    #[inline]
    pub(crate) fn set_value(&mut self, node: ArenaIndex, new_value: V) {
        if let Node::Entry { value, .. } = self.records.get_mut(node) {
            *value = new_value;
        }
    }

    /// Rewind both arenas. Every node handle is invalid afterwards.
    pub fn clear(&mut self) {
        self.records.clear();
        self.links.clear();
    }

    /// Pre-fault both arenas.
    pub fn warm_up(&mut self) {
        self.records.warm_up();
        self.links.warm_up();
    }

    /// Bytes of node storage in use.
    #[inline]
    pub fn bytes_used(&self) -> usize {
        self.records.offset() as usize * size_of::<Node<K, V>>()
            + self.links.offset() as usize * size_of::<ArenaIndex>()
    }

    /// Bytes of node storage reserved.
    #[inline]
    pub fn byte_capacity(&self) -> usize {
        self.records.capacity() as usize * size_of::<Node<K, V>>()
            + self.links.capacity() as usize * size_of::<ArenaIndex>()
    }
}

impl<K, V> NodeArena<K, V> {
    /// The record arena.
    #[inline]
    pub fn records(&self) -> &Arena<Node<K, V>> {
        &self.records
    }

    /// The link arena.
    #[inline]
    pub fn links(&self) -> &Arena<ArenaIndex> {
        &self.links
    }

    /// Returns true if nothing is allocated, header included.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<K, V> fmt::Debug for NodeArena<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeArena")
            .field("records", &self.records)
            .field("links", &self.links)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Nodes = NodeArena<f32, u32>;

    #[test]
    fn test_alloc_entry_layout() {
        let mut arena = Nodes::new(4, 16);
        let idx = arena.alloc_entry(1.5, 9, 3).unwrap();

        assert_eq!(idx, 0);
        assert_eq!(arena.records().offset(), 1);
        assert_eq!(arena.links().offset(), 3);
        assert_eq!(arena.height_of(idx), 3);
        assert_eq!(arena.entry(idx), Some((1.5, 9)));
        for level in 0..3 {
            assert_eq!(arena.forward(idx, level), NULL_INDEX);
        }
    }

    #[test]
    fn test_header_has_no_entry() {
        let mut arena = Nodes::new(4, 16);
        let header = arena.alloc_header(4).unwrap();
        assert_eq!(arena.height_of(header), 4);
        assert_eq!(arena.entry(header), None);
        assert_eq!(arena.key_of(header), None);
    }

    #[test]
    fn test_link_and_value_updates() {
        let mut arena = Nodes::new(4, 16);
        let a = arena.alloc_entry(2.0, 1, 2).unwrap();
        let b = arena.alloc_entry(1.0, 2, 1).unwrap();

        arena.set_forward(a, 0, b);
        assert_eq!(arena.forward(a, 0), b);
        assert_eq!(arena.forward(a, 1), NULL_INDEX);
        assert_eq!(arena.forward(b, 0), NULL_INDEX);

        arena.set_value(b, 42);
        assert_eq!(arena.entry(b), Some((1.0, 42)));
    }

    #[test]
    fn test_failed_alloc_leaves_arena_untouched() {
        // Not enough links
        let mut arena = Nodes::new(4, 2);
        let err = arena.alloc_entry(0.0, 0, 3).unwrap_err();
        assert!(matches!(err, ArenaError::CapacityExhausted { requested: 3, .. }));
        assert!(arena.is_empty());
        assert_eq!(arena.links().offset(), 0);

        // Links fit but the record does not: the tower is given back
        let mut arena = Nodes::new(1, 8);
        arena.alloc_entry(0.0, 0, 1).unwrap();
        let err = arena.alloc_entry(1.0, 1, 2).unwrap_err();
        assert!(matches!(err, ArenaError::CapacityExhausted { requested: 1, .. }));
        assert_eq!(arena.records().offset(), 1);
        assert_eq!(arena.links().offset(), 1);
    }

    #[test]
    fn test_link_costs_one_word() {
        let mut arena: NodeArena<f64, u64> = NodeArena::new(8, 32);
        let record = size_of::<Node<f64, u64>>();
        let word = size_of::<ArenaIndex>();

        arena.alloc_entry(1.0, 7, 1).unwrap();
        assert_eq!(arena.bytes_used(), record + word);

        arena.alloc_entry(2.0, 8, 4).unwrap();
        assert_eq!(arena.bytes_used(), 2 * record + 5 * word);

        // Key, value, tower start and height share one record
        assert!(record <= 3 * size_of::<u64>(), "record is {} bytes", record);
    }

    #[test]
    fn test_byte_capacity_split() {
        let arena: NodeArena<f64, u64> = NodeArena::with_byte_capacity(1024);
        let records = arena.records().capacity();

        assert!(arena.byte_capacity() <= 1024);
        assert_eq!(arena.links().capacity(), records * AVERAGE_HEIGHT + HEADER_LINKS);
        assert!(records > 15, "only {} records in 1 KiB", records);
    }

    #[test]
    fn test_try_new_rejects_null_index() {
        let err = Nodes::try_new(NULL_INDEX, 8).unwrap_err();
        assert_eq!(err, ArenaError::CapacityTooLarge { capacity: NULL_INDEX });
        assert!(Nodes::try_new(8, NULL_INDEX).is_err());
        assert!(Nodes::try_new(8, 8).is_ok());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "of height 0")]
    fn test_vacant_record_link_read_panics_in_debug() {
        let mut arena = Nodes::new(4, 4);
        arena.records.push(1).unwrap();
        arena.forward(0, 0);
    }

    #[test]
    fn test_clear_rewinds_both_arenas() {
        let mut arena = Nodes::new(4, 16);
        arena.alloc_header(4).unwrap();
        arena.alloc_entry(1.0, 1, 2).unwrap();

        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.links().offset(), 0);
        assert_eq!(arena.bytes_used(), 0);
    }
}

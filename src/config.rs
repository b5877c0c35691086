//! Configuration for skip lists and sorted batches.

use std::cmp::Ordering;

/// Maximum number of forward links per node (height of the header).
///
/// Drawn node heights are capped at `MAX_LEVEL - 1`.
pub const MAX_LEVEL: usize = 10;

/// Direction in which a skip list keeps its keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum KeyOrder {
    /// Smallest key first.
    Ascending,
    /// Largest key first (back-to-front for depth sorting).
    #[default]
    Descending,
}

impl KeyOrder {
    /// Returns true if `a` sorts strictly before `b` under this order.
    ///
    /// Incomparable pairs (NaN) never precede anything.
    #[inline]
    pub fn precedes<K: PartialOrd>(self, a: &K, b: &K) -> bool {
        match (self, a.partial_cmp(b)) {
            (KeyOrder::Ascending, Some(Ordering::Less)) => true,
            (KeyOrder::Descending, Some(Ordering::Greater)) => true,
            _ => false,
        }
    }
}

/// Configuration for a [`SkipList`](crate::SkipList) and the arenas a
/// [`SortedBatch`](crate::SortedBatch) builds for it.
#[derive(Clone, Debug)]
pub struct SkipListConfig {
    /// Key ordering.
    pub order: KeyOrder,

    /// Seed for the leveling generator. `None` seeds once from OS entropy.
    pub seed: Option<u64>,

    /// Node records, header included.
    pub node_capacity: u32,

    /// Forward links across all nodes. The header takes `MAX_LEVEL`; each
    /// entry takes its height, about 2 on average.
    pub link_capacity: u32,

    /// Scratch arena capacity in slots. One insertion needs at most
    /// `MAX_LEVEL` slots, released when the insertion returns.
    pub scratch_capacity: u32,
}

impl SkipListConfig {
    /// Default record capacity.
    pub const DEFAULT_NODE_CAPACITY: u32 = 1 << 18;

    /// Default link capacity (two per default record).
    pub const DEFAULT_LINK_CAPACITY: u32 = 1 << 19;

    /// Default scratch arena capacity.
    pub const DEFAULT_SCRATCH_CAPACITY: u32 = MAX_LEVEL as u32;

    /// Create a config for the given order with default capacities and an
    /// entropy seed.
    pub fn new(order: KeyOrder) -> Self {
        Self {
            order,
            seed: None,
            node_capacity: Self::DEFAULT_NODE_CAPACITY,
            link_capacity: Self::DEFAULT_LINK_CAPACITY,
            scratch_capacity: Self::DEFAULT_SCRATCH_CAPACITY,
        }
    }

    /// Set a fixed seed for reproducible structure.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the record capacity.
    pub fn with_node_capacity(mut self, records: u32) -> Self {
        self.node_capacity = records;
        self
    }

    /// Set the link capacity.
    pub fn with_link_capacity(mut self, links: u32) -> Self {
        self.link_capacity = links;
        self
    }

    /// Size the node storage so that `entries` nodes fit whatever heights
    /// they draw. Saturates instead of overflowing; an oversized result is
    /// rejected when the arenas are built.
    pub fn with_entry_capacity(mut self, entries: u32) -> Self {
        self.node_capacity = entries.saturating_add(1);
        self.link_capacity = entries
            .saturating_mul(MAX_LEVEL as u32 - 1)
            .saturating_add(MAX_LEVEL as u32);
        self
    }
}

impl Default for SkipListConfig {
    fn default() -> Self {
        Self::new(KeyOrder::default())
    }
}

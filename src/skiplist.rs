//! Skip List - a probabilistically balanced ordered map inside an arena.
//!
//! Every node, the header sentinel included, lives in a caller-owned
//! [`NodeArena`] and is linked by arena indices. Search and insert descend
//! from the highest populated level to level 0 in expected O(log n); rank
//! access walks level 0.
//!
//! The map never deletes. Inserting an existing key overwrites its value in
//! place.

use std::fmt;
use std::marker::PhantomData;

use arrayvec::ArrayVec;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::arena::{Arena, ArenaIndex, ArenaScope, NULL_INDEX};
use crate::config::{KeyOrder, SkipListConfig, MAX_LEVEL};
use crate::error::MapError;
use crate::level::random_level;
use crate::node::NodeArena;

/// Arena holding transient update traces.
pub type ScratchArena = Arena<ArenaIndex>;

/// What an insert did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insertion {
    /// A new node of the given height was linked in.
    Inserted {
        /// Number of levels the node was spliced into.
        height: usize,
    },
    /// The key existed; its value was overwritten.
    Replaced,
}

/// Predecessor-per-level storage filled during an insertion descent.
///
/// The trace starts empty. `extend_to` grows it to the requested number of
/// levels, filling new entries with the header.
trait UpdateTrace {
    fn extend_to(&mut self, levels: usize, fill: ArenaIndex) -> Result<(), MapError>;
    fn links(&self) -> &[ArenaIndex];
    fn links_mut(&mut self) -> &mut [ArenaIndex];
}

impl UpdateTrace for ArrayVec<ArenaIndex, MAX_LEVEL> {
    fn extend_to(&mut self, levels: usize, fill: ArenaIndex) -> Result<(), MapError> {
        while self.len() < levels {
            self.push(fill);
        }
        Ok(())
    }

    fn links(&self) -> &[ArenaIndex] {
        self
    }

    fn links_mut(&mut self) -> &mut [ArenaIndex] {
        self
    }
}

/// Update trace carved out of a scratch arena. The scope rewinds the
/// scratch arena when the trace is dropped.
struct ScratchTrace<'a> {
    scope: ArenaScope<'a, ArenaIndex>,
    len: u32,
}

impl<'a> ScratchTrace<'a> {
    fn new(scratch: &'a mut ScratchArena) -> Self {
        Self {
            scope: scratch.scope(),
            len: 0,
        }
    }
}

impl UpdateTrace for ScratchTrace<'_> {
    fn extend_to(&mut self, levels: usize, fill: ArenaIndex) -> Result<(), MapError> {
        let levels = levels as u32;
        if levels > self.len {
            let extra = levels - self.len;
            let start = self.scope.push(extra)?;
            debug_assert_eq!(start, self.scope.mark() + self.len, "trace must stay contiguous");
            self.scope.slice_mut(start, extra).fill(fill);
            self.len = levels;
        }
        Ok(())
    }

    fn links(&self) -> &[ArenaIndex] {
        self.scope.slice(self.scope.mark(), self.len)
    }

    fn links_mut(&mut self) -> &mut [ArenaIndex] {
        let mark = self.scope.mark();
        self.scope.slice_mut(mark, self.len)
    }
}

/// Ordered map from `K` to `V` stored in a [`NodeArena`].
///
/// The map holds indices only; every operation takes the node arena it was
/// created on. Using a different arena is a logic error.
///
/// `R` is the leveling generator. It is seeded once at construction and
/// reused for every draw.
pub struct SkipList<K, V, R = ChaCha8Rng> {
    /// Header sentinel (height `MAX_LEVEL`, no key/value)
    header: ArenaIndex,
    /// Number of levels in use, `0..=MAX_LEVEL`
    level: usize,
    /// Number of live entries
    len: usize,
    order: KeyOrder,
    rng: R,
    _entries: PhantomData<(K, V)>,
}

impl<K, V> SkipList<K, V, ChaCha8Rng>
where
    K: Copy + PartialOrd,
    V: Copy,
{
    /// Create a map on `nodes` using the order and seed from `config`.
    ///
    /// Without a configured seed the generator is seeded from OS entropy,
    /// once, here.
    pub fn new(nodes: &mut NodeArena<K, V>, config: &SkipListConfig) -> Result<Self, MapError> {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(nodes, config.order, rng)
    }
}

impl<K, V, R> SkipList<K, V, R>
where
    K: Copy + PartialOrd,
    V: Copy,
    R: RngCore,
{
    /// Create a map on `nodes` with an injected generator.
    ///
    /// Allocates the header sentinel, so this fails if `nodes` has no free
    /// record or fewer than `MAX_LEVEL` free links.
    pub fn with_rng(nodes: &mut NodeArena<K, V>, order: KeyOrder, rng: R) -> Result<Self, MapError> {
        let header = nodes.alloc_header(MAX_LEVEL)?;
        Ok(Self {
            header,
            level: 0,
            len: 0,
            order,
            rng,
            _entries: PhantomData,
        })
    }

    /// Re-root the map on `nodes` after that arena was cleared.
    ///
    /// The map becomes empty. The generator keeps its state; it is not
    /// reseeded.
    pub fn reset(&mut self, nodes: &mut NodeArena<K, V>) -> Result<(), MapError> {
        self.header = nodes.alloc_header(MAX_LEVEL)?;
        debug!(header = self.header, dropped = self.len, "skip list re-rooted");
        self.level = 0;
        self.len = 0;
        Ok(())
    }

    /// Draw a node height from this map's generator.
    #[inline]
    pub fn random_level(&mut self) -> usize {
        random_level(&mut self.rng)
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Insert or overwrite `key`, keeping the update trace on the stack.
    pub fn insert(&mut self, key: K, value: V, nodes: &mut NodeArena<K, V>) -> Result<Insertion, MapError> {
        let mut trace = ArrayVec::<ArenaIndex, MAX_LEVEL>::new();
        self.insert_traced(key, value, nodes, &mut trace)
    }

    /// Insert or overwrite `key`, keeping the update trace in `scratch`.
    ///
    /// The trace takes up to `MAX_LEVEL` slots of `scratch` and is released
    /// before this returns, on success and on error alike.
    pub fn insert_with_scratch(
        &mut self,
        key: K,
        value: V,
        nodes: &mut NodeArena<K, V>,
        scratch: &mut ScratchArena,
    ) -> Result<Insertion, MapError> {
        let mut trace = ScratchTrace::new(scratch);
        self.insert_traced(key, value, nodes, &mut trace)
    }

    fn insert_traced<T: UpdateTrace>(
        &mut self,
        key: K,
        value: V,
        nodes: &mut NodeArena<K, V>,
        trace: &mut T,
    ) -> Result<Insertion, MapError> {
        if !is_ordered(&key) {
            return Err(MapError::UnorderedKey);
        }

        trace.extend_to(self.level, self.header)?;
        let links = trace.links_mut();
        let pred = self.descend(nodes, &key, |level, node| links[level] = node);

        if let Some(existing) = self.find_at(nodes, pred, &key) {
            nodes.set_value(existing, value);
            return Ok(Insertion::Replaced);
        }

        let height = self.random_level();
        if height > self.level {
            trace.extend_to(height, self.header)?;
        }

        // Allocate before touching any link: on failure nothing is visible.
        let node = nodes.alloc_entry(key, value, height)?;

        for (level, &pred) in trace.links()[..height].iter().enumerate() {
            let next = nodes.forward(pred, level);
            nodes.set_forward(node, level, next);
            nodes.set_forward(pred, level, node);
        }

        if height > self.level {
            debug!(from = self.level, to = height, "skip list level raised");
            self.level = height;
        }
        self.len += 1;

        Ok(Insertion::Inserted { height })
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Value stored under `key`, or `None` if absent.
    pub fn search(&self, nodes: &NodeArena<K, V>, key: K) -> Option<V> {
        if !is_ordered(&key) {
            return None;
        }
        let pred = self.descend(nodes, &key, |_, _| {});
        self.find_at(nodes, pred, &key)
            .and_then(|node| nodes.entry(node))
            .map(|(_, value)| value)
    }

    /// Returns true if `key` is present.
    #[inline]
    pub fn contains_key(&self, nodes: &NodeArena<K, V>, key: K) -> bool {
        self.search(nodes, key).is_some()
    }

    /// Key at position `index` in map order.
    pub fn key_at(&self, nodes: &NodeArena<K, V>, index: usize) -> Result<K, MapError> {
        self.entry_at(nodes, index).map(|(key, _)| key)
    }

    /// Value at position `index` in map order.
    pub fn value_at(&self, nodes: &NodeArena<K, V>, index: usize) -> Result<V, MapError> {
        self.entry_at(nodes, index).map(|(_, value)| value)
    }

    /// Key and value at position `index` in map order.
    ///
    /// Walks level 0, so this is O(index).
    pub fn entry_at(&self, nodes: &NodeArena<K, V>, index: usize) -> Result<(K, V), MapError> {
        let out_of_range = MapError::RankOutOfRange { index, len: self.len };
        if index >= self.len {
            return Err(out_of_range);
        }
        self.iter(nodes).nth(index).ok_or(out_of_range)
    }

    /// First entry in map order.
    #[inline]
    pub fn first(&self, nodes: &NodeArena<K, V>) -> Option<(K, V)> {
        self.iter(nodes).next()
    }

    /// Iterate over entries in map order.
    pub fn iter<'a>(&self, nodes: &'a NodeArena<K, V>) -> Iter<'a, K, V> {
        Iter {
            nodes,
            next: nodes.forward(self.header, 0),
            remaining: self.len,
        }
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Walk from the header down to level 0, advancing at each level while
    /// the next key precedes `key`. `visit(level, node)` receives the last
    /// node visited at every populated level. Returns the level-0
    /// predecessor.
    fn descend<F>(&self, nodes: &NodeArena<K, V>, key: &K, mut visit: F) -> ArenaIndex
    where
        F: FnMut(usize, ArenaIndex),
    {
        let mut node = self.header;
        for level in (0..self.level).rev() {
            loop {
                let next = nodes.forward(node, level);
                if next == NULL_INDEX {
                    break;
                }
                match nodes.key_of(next) {
                    Some(next_key) if self.order.precedes(&next_key, key) => node = next,
                    _ => break,
                }
            }
            visit(level, node);
        }
        node
    }

    /// The level-0 successor of `pred`, if its key equals `key`.
    #[inline]
    fn find_at(&self, nodes: &NodeArena<K, V>, pred: ArenaIndex, key: &K) -> Option<ArenaIndex> {
        let candidate = nodes.forward(pred, 0);
        if candidate == NULL_INDEX {
            return None;
        }
        match nodes.key_of(candidate) {
            Some(found) if found == *key => Some(candidate),
            _ => None,
        }
    }

    /// Verify the structural invariants against `nodes`.
    ///
    /// Checks that level 0 holds exactly `len` entries in strict map order,
    /// that every level above is strictly ordered and contains only nodes
    /// tall enough to be there, that no level holds more nodes than the one
    /// below, and that the header has no links at or above `level`.
    pub fn check_invariants(&self, nodes: &NodeArena<K, V>) -> bool {
        let mut below = usize::MAX;

        for level in 0..MAX_LEVEL {
            let mut count = 0usize;
            let mut prev: Option<K> = None;
            let mut node = nodes.forward(self.header, level);

            if level >= self.level && node != NULL_INDEX {
                return false;
            }

            while node != NULL_INDEX {
                if nodes.height_of(node) <= level {
                    return false;
                }
                let key = match nodes.key_of(node) {
                    Some(key) => key,
                    None => return false,
                };
                if let Some(prev) = prev {
                    if !self.order.precedes(&prev, &key) {
                        return false;
                    }
                }
                prev = Some(key);
                count += 1;
                if count > self.len {
                    return false;
                }
                node = nodes.forward(node, level);
            }

            if level == 0 && count != self.len {
                return false;
            }
            if count > below {
                return false;
            }
            below = count;
        }

        true
    }

    // ========================================================================
    // Utility Methods
    // ========================================================================

    /// Number of live entries
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the map holds no entries
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels in use
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Key order of this map
    #[inline]
    pub fn order(&self) -> KeyOrder {
        self.order
    }

    /// Arena index of the header sentinel
    #[inline]
    pub fn header(&self) -> ArenaIndex {
        self.header
    }
}

/// NaN-like keys are not comparable with themselves.
#[inline]
fn is_ordered<K: PartialOrd>(key: &K) -> bool {
    key.partial_cmp(key).is_some()
}

impl<K, V, R> fmt::Debug for SkipList<K, V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipList")
            .field("header", &self.header)
            .field("level", &self.level)
            .field("len", &self.len)
            .field("order", &self.order)
            .finish()
    }
}

/// Iterator over a [`SkipList`] in map order.
pub struct Iter<'a, K, V> {
    nodes: &'a NodeArena<K, V>,
    next: ArenaIndex,
    remaining: usize,
}

impl<K: Copy, V: Copy> Iterator for Iter<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        if self.next == NULL_INDEX {
            return None;
        }
        let entry = self.nodes.entry(self.next)?;
        self.next = self.nodes.forward(self.next, 0);
        self.remaining = self.remaining.saturating_sub(1);
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Copy, V: Copy> ExactSizeIterator for Iter<'_, K, V> {}

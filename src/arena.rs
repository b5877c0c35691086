//! Arena Allocator - fixed-capacity, stack-disciplined slot allocator.
//!
//! The arena reserves one contiguous block at creation and hands out
//! ranges of slots by bumping an offset. Space is returned only in LIFO
//! order (`pop`) or all at once (`clear`). Nothing is ever freed
//! individually and the region never grows past its initial reservation.
//!
//! Handles are `u32` indices into the block rather than pointers, so
//! structures linked through the arena are relocatable and borrow-checked.

use std::fmt;
use std::ops::{Deref, DerefMut};

use tracing::trace;

use crate::error::ArenaError;

/// Sentinel value representing a null/invalid index (like nullptr)
pub const NULL_INDEX: u32 = u32::MAX;

/// Type alias for arena indices - our "compressed pointers"
pub type ArenaIndex = u32;

/// Pre-reserved region with stack-discipline allocation.
///
/// `T` is the slot type. The skip list keeps node records in an
/// `Arena<Node<K, V>>`, their link towers in an `Arena<ArenaIndex>`, and
/// its transient update trace in another `Arena<ArenaIndex>`.
///
/// # Invariant
/// `0 <= offset <= capacity` at all times.
pub struct Arena<T> {
    /// Backing block. Its length is the high-water mark of slots ever
    /// touched; its capacity is reserved once and never reallocated.
    slots: Vec<T>,

    /// Current stack offset (next free slot)
    offset: u32,

    /// Total capacity in slots
    capacity: u32,
}

impl<T: Copy + Default> Arena<T> {
    /// Create a new arena holding `capacity` slots.
    ///
    /// The whole reservation is made up front. If the allocator cannot
    /// satisfy it the process aborts; there is no partial-capacity fallback.
    ///
    /// # Panics
    /// Panics if capacity is not below `NULL_INDEX` (reserved for "no link").
    /// Use [`Arena::try_new`] when the capacity comes from user input.
    pub fn new(capacity: u32) -> Self {
        assert!(capacity < NULL_INDEX, "Capacity must be less than NULL_INDEX");

        Self {
            slots: Vec::with_capacity(capacity as usize),
            offset: 0,
            capacity,
        }
    }

    /// Create a new arena, rejecting capacities that collide with `NULL_INDEX`.
    ///
    /// # Errors
    /// `ArenaError::CapacityTooLarge` if `capacity >= NULL_INDEX`.
    pub fn try_new(capacity: u32) -> Result<Self, ArenaError> {
        if capacity >= NULL_INDEX {
            return Err(ArenaError::CapacityTooLarge { capacity });
        }
        Ok(Self::new(capacity))
    }

    /// Create an arena sized from a byte budget.
    ///
    /// The capacity is the number of whole slots of `T` that fit in `bytes`.
    pub fn with_byte_capacity(bytes: usize) -> Self {
        let slot_size = std::mem::size_of::<T>().max(1);
        let slots = (bytes / slot_size).min(NULL_INDEX as usize - 1);
        Self::new(slots as u32)
    }

    /// Allocate `count` consecutive slots at the current offset.
    ///
    /// Returns the index of the first slot. The slots are reset to
    /// `T::default()` so stale data from earlier pops or clears never leaks.
    ///
    /// # Errors
    /// `ArenaError::CapacityExhausted` if `offset + count > capacity`.
    /// The arena is left untouched in that case.
    pub fn push(&mut self, count: u32) -> Result<ArenaIndex, ArenaError> {
        let start = self.offset;
        let end = match start.checked_add(count) {
            Some(end) if end <= self.capacity => end,
            _ => {
                trace!(requested = count, offset = start, capacity = self.capacity, "arena push rejected");
                return Err(ArenaError::CapacityExhausted {
                    requested: count,
                    offset: start,
                    capacity: self.capacity,
                });
            }
        };

        let (lo, hi) = (start as usize, end as usize);
        if hi > self.slots.len() {
            // Stays within the reservation made in `new`, so no reallocation.
            self.slots.resize(hi, T::default());
        }
        self.slots[lo..hi].fill(T::default());
        self.offset = end;

        Ok(start)
    }

    /// Rewind the offset by `count` slots.
    ///
    /// The caller must pop exactly what it most recently pushed; only the
    /// lower bound is checked.
    ///
    /// # Errors
    /// `ArenaError::Underflow` if `count > offset`.
    pub fn pop(&mut self, count: u32) -> Result<(), ArenaError> {
        if count > self.offset {
            trace!(requested = count, offset = self.offset, "arena pop rejected");
            return Err(ArenaError::Underflow {
                requested: count,
                offset: self.offset,
            });
        }
        self.offset -= count;
        Ok(())
    }

    /// Reset the offset to zero. Every previously issued index is invalid.
    #[inline]
    pub fn clear(&mut self) {
        self.offset = 0;
    }

    /// Open a scope that rewinds the arena to its current offset when the
    /// returned guard is dropped.
    ///
    /// Allocations made through the guard are released on every exit path,
    /// including early returns via `?`.
    pub fn scope(&mut self) -> ArenaScope<'_, T> {
        let mark = self.offset;
        ArenaScope { arena: self, mark }
    }

    /// Pre-fault all memory pages (warm-up routine).
    ///
    /// Touches every slot of the reservation so the first real allocations
    /// do not page-fault. Does not change the offset.
    pub fn warm_up(&mut self) {
        self.slots.resize(self.capacity as usize, T::default());
    }
}

impl<T> Arena<T> {
    /// Get an immutable reference to a slot.
    #[inline]
    pub fn get(&self, index: ArenaIndex) -> &T {
        debug_assert!(index < self.offset, "Index beyond arena offset");
        &self.slots[index as usize]
    }

    /// Get a mutable reference to a slot.
    #[inline]
    pub fn get_mut(&mut self, index: ArenaIndex) -> &mut T {
        debug_assert!(index < self.offset, "Index beyond arena offset");
        &mut self.slots[index as usize]
    }

    /// Borrow `len` slots starting at `start`.
    #[inline]
    pub fn slice(&self, start: ArenaIndex, len: u32) -> &[T] {
        debug_assert!(start as u64 + len as u64 <= self.offset as u64);
        &self.slots[start as usize..(start + len) as usize]
    }

    /// Mutably borrow `len` slots starting at `start`.
    #[inline]
    pub fn slice_mut(&mut self, start: ArenaIndex, len: u32) -> &mut [T] {
        debug_assert!(start as u64 + len as u64 <= self.offset as u64);
        &mut self.slots[start as usize..(start + len) as usize]
    }

    /// Current stack offset (slots in use).
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Returns the total capacity of the arena in slots.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Slots still available for pushing.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.capacity - self.offset
    }

    /// Returns true if nothing is allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }

    /// Returns true if no slot is left.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.offset == self.capacity
    }
}

impl<T> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity)
            .field("offset", &self.offset)
            .field("touched", &self.slots.len())
            .finish()
    }
}

/// Guard returned by [`Arena::scope`].
///
/// Dereferences to the arena. On drop the offset goes back to where it was
/// when the scope opened (or stays lower, if the arena was cleared inside).
pub struct ArenaScope<'a, T: Copy + Default> {
    arena: &'a mut Arena<T>,
    mark: u32,
}

impl<T: Copy + Default> ArenaScope<'_, T> {
    /// Offset at which the scope was opened.
    #[inline]
    pub fn mark(&self) -> u32 {
        self.mark
    }
}

impl<T: Copy + Default> Deref for ArenaScope<'_, T> {
    type Target = Arena<T>;

    fn deref(&self) -> &Arena<T> {
        self.arena
    }
}

impl<T: Copy + Default> DerefMut for ArenaScope<'_, T> {
    fn deref_mut(&mut self) -> &mut Arena<T> {
        self.arena
    }
}

impl<T: Copy + Default> Drop for ArenaScope<'_, T> {
    fn drop(&mut self) {
        self.arena.offset = self.arena.offset.min(self.mark);
    }
}

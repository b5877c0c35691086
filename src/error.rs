//! Error types for arena allocation and ordered-map access.

use thiserror::Error;

/// Errors raised at the arena boundary.
///
/// These are programmer errors rather than transient conditions:
/// there is nothing to retry. They are surfaced as values so the caller can
/// abort, log, or build a larger replacement arena.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// A push would move the offset past the end of the region.
    #[error("arena capacity exhausted: requested {requested} slots at offset {offset}, capacity {capacity}")]
    CapacityExhausted {
        /// Number of slots requested.
        requested: u32,
        /// Offset at the time of the request.
        offset: u32,
        /// Total capacity of the arena.
        capacity: u32,
    },

    /// The requested capacity would make `NULL_INDEX` a valid slot.
    #[error("arena capacity {capacity} must be below {}", u32::MAX)]
    CapacityTooLarge {
        /// The rejected capacity.
        capacity: u32,
    },

    /// A pop would move the offset below zero.
    #[error("arena underflow: popping {requested} slots from offset {offset}")]
    Underflow {
        /// Number of slots the caller tried to pop.
        requested: u32,
        /// Offset at the time of the request.
        offset: u32,
    },
}

/// Errors raised by [`SkipList`](crate::SkipList) operations.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapError {
    /// The node arena or the scratch arena ran out of room.
    #[error(transparent)]
    Arena(#[from] ArenaError),

    /// A rank accessor was given an index past the last live entry.
    #[error("rank {index} out of range for map of {len} entries")]
    RankOutOfRange {
        /// The requested rank.
        index: usize,
        /// Number of live entries.
        len: usize,
    },

    /// The key does not compare equal to itself (e.g. a NaN float).
    #[error("key is not totally ordered")]
    UnorderedKey,
}

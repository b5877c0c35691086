//! Geometric node leveling.
//!
//! A node's height is 1 plus the number of consecutive fair-coin
//! "continue" outcomes, capped at `MAX_LEVEL - 1`, so
//! `P(height = k) = 2^-k` up to the cap.

use rand::RngCore;

use crate::config::MAX_LEVEL;

/// Highest height [`random_level`] can return.
pub const MAX_DRAWN_LEVEL: usize = MAX_LEVEL - 1;

/// One fair coin flip: the low bit of the next word.
#[inline]
fn coin_flip<R: RngCore + ?Sized>(rng: &mut R) -> bool {
    rng.next_u32() & 1 == 1
}

/// Draw a node height from `rng`.
///
/// The generator is borrowed, never reseeded: callers seed it once and
/// keep reusing it, which is what keeps successive draws independent.
pub fn random_level<R: RngCore + ?Sized>(rng: &mut R) -> usize {
    let mut level = 1;
    while level < MAX_DRAWN_LEVEL && coin_flip(rng) {
        level += 1;
    }
    level
}

//! # arena-skiplist
//!
//! A stack-disciplined arena allocator and a probabilistic ordered map
//! (skip list) built entirely inside it.
//!
//! ## Design Principles
//!
//! - **Single-Owner**: Arenas and maps are used by one owner at a time (no locks)
//! - **Index Links**: Nodes link through 32-bit arena indices, never pointers
//! - **No Per-Object Free**: Storage is reclaimed by popping or clearing an arena
//! - **Explicit Failure**: Exhaustion, misses and bad ranks are values, not aborts
//!
//! ## Architecture
//!
//! ```text
//! [SortedBatch] --> [SkipList] --> [NodeArena] --> [Arena<Node<K, V>>]  (records)
//!                        |                  +--> [Arena<ArenaIndex>]  (link towers)
//!                        |
//!                        +-------> [Arena<ArenaIndex>]   (update trace, per insert)
//! ```

pub mod arena;
pub mod batch;
pub mod config;
pub mod error;
pub mod level;
pub mod node;
pub mod record;
pub mod skiplist;

// Re-exports for convenience
pub use arena::{Arena, ArenaIndex, ArenaScope, NULL_INDEX};
pub use batch::SortedBatch;
pub use config::{KeyOrder, SkipListConfig, MAX_LEVEL};
pub use error::{ArenaError, MapError};
pub use level::random_level;
pub use node::{Node, NodeArena, HEADER_LINKS};
pub use record::Record;
pub use skiplist::{Insertion, Iter, ScratchArena, SkipList};

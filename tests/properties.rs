//! Property tests for arena stack discipline and skip list behaviour.

use arena_skiplist::{
    Arena, ArenaError, Insertion, KeyOrder, MapError, NodeArena, ScratchArena, SkipList,
    SkipListConfig, HEADER_LINKS, MAX_LEVEL,
};
use proptest::prelude::*;
use std::collections::HashMap;

fn order_strategy() -> impl Strategy<Value = KeyOrder> {
    prop_oneof![Just(KeyOrder::Ascending), Just(KeyOrder::Descending)]
}

proptest! {
    #[test]
    fn push_then_pop_in_reverse_restores_offset(
        prefix in 0u32..32,
        sizes in prop::collection::vec(0u32..64, 0..32),
    ) {
        let mut arena: Arena<u32> = Arena::new(4096);
        arena.push(prefix).unwrap();
        let before = arena.offset();

        for &size in &sizes {
            arena.push(size).unwrap();
        }
        for &size in sizes.iter().rev() {
            arena.pop(size).unwrap();
        }

        prop_assert_eq!(arena.offset(), before);
        arena.clear();
        prop_assert_eq!(arena.offset(), 0);
    }

    #[test]
    fn push_never_exceeds_capacity(
        capacity in 0u32..256,
        sizes in prop::collection::vec(0u32..128, 1..32),
    ) {
        let mut arena: Arena<u8> = Arena::new(capacity);
        for size in sizes {
            let before = arena.offset();
            match arena.push(size) {
                Ok(start) => {
                    prop_assert_eq!(start, before);
                    prop_assert_eq!(arena.offset(), before + size);
                }
                Err(err) => {
                    prop_assert!(before + size > capacity);
                    prop_assert_eq!(err, ArenaError::CapacityExhausted { requested: size, offset: before, capacity });
                    prop_assert_eq!(arena.offset(), before);
                }
            }
            prop_assert!(arena.offset() <= arena.capacity());
        }
    }

    #[test]
    fn map_matches_last_write_and_stays_ordered(
        entries in prop::collection::vec((-1000i32..1000, any::<u16>()), 0..300),
        order in order_strategy(),
        seed in any::<u64>(),
    ) {
        let config = SkipListConfig::new(order).with_seed(seed);
        let mut nodes = NodeArena::new(301, HEADER_LINKS + 300 * MAX_LEVEL as u32);
        let mut scratch = ScratchArena::new(MAX_LEVEL as u32);
        let mut map = SkipList::new(&mut nodes, &config).unwrap();
        let mut expected = HashMap::new();

        for &(key, value) in &entries {
            let outcome = map.insert_with_scratch(key, value, &mut nodes, &mut scratch).unwrap();
            let fresh = expected.insert(key, value).is_none();
            prop_assert_eq!(fresh, outcome != Insertion::Replaced);
        }

        // Round-trip and idempotence
        prop_assert_eq!(map.len(), expected.len());
        for (&key, &value) in &expected {
            prop_assert_eq!(map.search(&nodes, key), Some(value));
        }

        // Monotonic rank walk without duplicates
        let keys: Vec<i32> = (0..map.len()).map(|i| map.key_at(&nodes, i).unwrap()).collect();
        for pair in keys.windows(2) {
            prop_assert!(order.precedes(&pair[0], &pair[1]));
        }

        // Rank bounds
        prop_assert_eq!(
            map.value_at(&nodes, map.len()),
            Err(MapError::RankOutOfRange { index: map.len(), len: map.len() })
        );
        prop_assert!(map.check_invariants(&nodes));
    }
}

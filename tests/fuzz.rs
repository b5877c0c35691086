//! Fuzz Test - Compares the skip list against a reference implementation.
//!
//! Uses `BTreeMap` as a naive but correct reference to verify lookups,
//! rank access and ordering under random workloads.

use arena_skiplist::{
    Insertion, KeyOrder, MapError, NodeArena, ScratchArena, SkipList, SkipListConfig, HEADER_LINKS,
    MAX_LEVEL,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Reference map that presents entries in the configured order
struct ReferenceMap {
    entries: BTreeMap<i64, u32>,
    order: KeyOrder,
}

impl ReferenceMap {
    fn new(order: KeyOrder) -> Self {
        Self {
            entries: BTreeMap::new(),
            order,
        }
    }

    fn insert(&mut self, key: i64, value: u32) -> bool {
        self.entries.insert(key, value).is_none()
    }

    fn get(&self, key: i64) -> Option<u32> {
        self.entries.get(&key).copied()
    }

    fn ordered(&self) -> Vec<(i64, u32)> {
        let mut out: Vec<_> = self.entries.iter().map(|(&k, &v)| (k, v)).collect();
        if self.order == KeyOrder::Descending {
            out.reverse();
        }
        out
    }
}

/// Drive both maps with a random workload and compare after every step
fn run_fuzz(seed: u64, ops: usize, order: KeyOrder) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let key_space = (ops / 2) as i64;

    let mut nodes = NodeArena::new(ops as u32 + 1, HEADER_LINKS + ops as u32 * MAX_LEVEL as u32);
    let mut scratch = ScratchArena::new(MAX_LEVEL as u32);
    let config = SkipListConfig::new(order).with_seed(seed);
    let mut map = SkipList::new(&mut nodes, &config).unwrap();
    let mut reference = ReferenceMap::new(order);

    for i in 0..ops {
        let key = rng.gen_range(-key_space..key_space);
        let value: u32 = rng.gen();

        // Alternate between the two trace storages
        let outcome = if rng.gen_bool(0.5) {
            map.insert_with_scratch(key, value, &mut nodes, &mut scratch).unwrap()
        } else {
            map.insert(key, value, &mut nodes).unwrap()
        };
        let fresh = reference.insert(key, value);

        assert_eq!(
            matches!(outcome, Insertion::Inserted { .. }),
            fresh,
            "Insert outcome mismatch at op {} for key {}",
            i, key
        );
        assert_eq!(map.len(), reference.entries.len(), "Length mismatch at op {}", i);

        // Look up a random key, present or not
        let lookup = rng.gen_range(-key_space..key_space);
        assert_eq!(map.search(&nodes, lookup), reference.get(lookup), "Search mismatch for key {}", lookup);
    }

    assert_eq!(scratch.offset(), 0);
    assert!(map.check_invariants(&nodes));

    let expected = reference.ordered();
    let actual: Vec<_> = map.iter(&nodes).collect();
    assert_eq!(actual, expected);

    // Spot-check rank access
    for _ in 0..100 {
        let rank = rng.gen_range(0..expected.len());
        assert_eq!(map.key_at(&nodes, rank), Ok(expected[rank].0));
        assert_eq!(map.value_at(&nodes, rank), Ok(expected[rank].1));
    }
    assert_eq!(
        map.key_at(&nodes, expected.len()),
        Err(MapError::RankOutOfRange { index: expected.len(), len: expected.len() })
    );
}

#[test]
fn test_fuzz_descending() {
    run_fuzz(0xFEEDFACE, 10_000, KeyOrder::Descending);
}

#[test]
fn test_fuzz_ascending() {
    run_fuzz(0xBADC0DE, 10_000, KeyOrder::Ascending);
}

#[test]
fn test_fuzz_many_seeds_small() {
    for seed in 0..50 {
        run_fuzz(seed, 200, if seed % 2 == 0 { KeyOrder::Ascending } else { KeyOrder::Descending });
    }
}

#[test]
fn test_fuzz_float_keys() {
    const SEED: u64 = 0x12345678;
    const OPS: usize = 5_000;

    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let config = SkipListConfig::new(KeyOrder::Descending).with_seed(SEED);
    let mut nodes = NodeArena::new(OPS as u32 + 1, HEADER_LINKS + OPS as u32 * MAX_LEVEL as u32);
    let mut map = SkipList::new(&mut nodes, &config).unwrap();
    let mut reference: Vec<(f64, u32)> = Vec::new();

    for i in 0..OPS {
        // Quantised so that repeats happen
        let key = (rng.gen_range(0.0..100.0f64) * 8.0).round() / 8.0;
        map.insert(key, i as u32, &mut nodes).unwrap();
        match reference.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = i as u32,
            None => reference.push((key, i as u32)),
        }
    }

    reference.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
    let actual: Vec<_> = map.iter(&nodes).collect();
    assert_eq!(actual, reference);
}

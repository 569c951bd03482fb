//! Integration tests for sharing OrderedMap versions across threads.
//!
//! These tests verify that maps work correctly with the `arc` feature
//! enabled, providing thread-safe access to immutable data across
//! multiple threads.

#![cfg(feature = "arc")]
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use avl_map::persistent::OrderedMap;
use rstest::rstest;
use std::sync::Arc;
use std::thread;

#[rstest]
fn test_map_cross_thread_structural_sharing() {
    let original: Arc<OrderedMap<i32, String>> =
        Arc::new((0..100).map(|key| (key, format!("v{key}"))).collect());

    let handles: Vec<_> = (0..4)
        .map(|index| {
            let map_clone = Arc::clone(&original);
            thread::spawn(move || {
                // Each thread derives its own version
                let key = 1000 + index;
                let extended = map_clone.add(key, format!("thread{index}")).unwrap();
                assert_eq!(extended.len(), 101);
                assert_eq!(extended.find(&key), Some(&format!("thread{index}")));
                // Original should be unchanged
                assert_eq!(map_clone.len(), 100);
                assert_eq!(map_clone.find(&key), None);
                extended
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(original.len(), 100);
    for (index, result) in results.iter().enumerate() {
        let key = 1000 + index as i32;
        assert!(result.contains_key(&key));
        assert_eq!(result.remove(&key), *original);
    }
}

#[rstest]
fn test_map_moved_between_threads() {
    let map = OrderedMap::new().try_add(1, "one").try_add(2, "two");

    let handle = thread::spawn(move || map.remove(&1));
    let result = handle.join().unwrap();

    assert_eq!(result.keys().collect::<Vec<_>>(), vec![&2]);
}

#[rstest]
fn test_concurrent_readers_see_same_hash() {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let map: Arc<OrderedMap<i32, i32>> = Arc::new((0..500).map(|key| (key, key * key)).collect());

    let hashes: Vec<u64> = (0..8)
        .map(|_| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let mut hasher = DefaultHasher::new();
                map.hash(&mut hasher);
                hasher.finish()
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert!(hashes.windows(2).all(|pair| pair[0] == pair[1]));
}

#[rstest]
fn test_range_queries_from_many_threads() {
    let map: Arc<OrderedMap<i32, i32>> = Arc::new((0..1000).map(|key| (key, key)).collect());

    let handles: Vec<_> = (0..4)
        .map(|index| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let low = index * 250;
                let high = low + 249;
                map.find_range(&low, &high).copied().sum::<i32>()
            })
        })
        .collect();

    let total: i32 = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .sum();

    assert_eq!(total, (0..1000).sum::<i32>());
}

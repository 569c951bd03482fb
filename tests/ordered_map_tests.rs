//! Unit tests for OrderedMap.
//!
//! Covers the insert/update policies, failure reporting, ordering
//! strategies, range queries and whole-map operations.

use avl_map::comparer::{ReverseOrder, by};
use avl_map::error::MapError;
use avl_map::persistent::OrderedMap;
use avl_map::validity::Validity;
use rstest::rstest;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

fn calculate_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn numbers(range: std::ops::RangeInclusive<i32>) -> OrderedMap<i32, String> {
    range.map(|key| (key, format!("v{key}"))).collect()
}

// =============================================================================
// Versioning Scenario
// =============================================================================

#[rstest]
fn test_versioning_scenario() {
    let m0: OrderedMap<&str, i32> = OrderedMap::empty();

    let m1 = m0.add("a", 1).unwrap();
    assert_eq!(m1.len(), 1);
    assert_eq!(m1.find(&"a"), Some(&1));

    let m2 = m1.add("b", 2).unwrap();
    assert_eq!(m2.len(), 2);
    assert_eq!(m2.keys().collect::<Vec<_>>(), vec![&"a", &"b"]);

    assert_eq!(m2.add("a", 99), Err(MapError::KeyExists { operation: "add" }));
    let unchanged = m2.try_add("a", 99);
    assert_eq!(unchanged, m2);
    assert_eq!(unchanged.find(&"a"), Some(&1));

    let m3 = m2.set_item(&"a", 42).unwrap();
    assert_eq!(m3.find(&"a"), Some(&42));
    assert_eq!(m1.find(&"a"), Some(&1));

    let m4 = m3.remove(&"b");
    assert_eq!(m4.len(), 1);
    assert!(!m4.contains_key(&"b"));

    let expected = OrderedMap::new().add("b", 2).unwrap();
    assert_eq!(&m2 - &m1, expected);

    assert!(m0.is_empty());
    assert_eq!(m0.len(), 0);
}

// =============================================================================
// Empty Map Tests
// =============================================================================

#[rstest]
fn test_empty_identity() {
    let empty: OrderedMap<i32, i32> = OrderedMap::empty();
    assert!(empty.is_empty());
    assert_eq!(empty.len(), 0);
    assert_eq!(empty.height(), 0);
    assert_eq!(empty.find(&7), None);
    assert_eq!(empty.min(), None);
    assert_eq!(empty.max(), None);
    assert_eq!(empty.iter().next(), None);
    assert_eq!(empty, OrderedMap::new());
    assert_eq!(empty, OrderedMap::default());
}

#[rstest]
fn test_empty_maps_hash_equal() {
    let first: OrderedMap<i32, i32> = OrderedMap::empty();
    let second: OrderedMap<i32, i32> = OrderedMap::new().try_add(1, 1).remove(&1);
    assert_eq!(first, second);
    assert_eq!(calculate_hash(&first), calculate_hash(&second));
}

#[rstest]
fn test_singleton() {
    let map = OrderedMap::singleton("only", 1);
    assert_eq!(map.len(), 1);
    assert_eq!(map.min(), Some((&"only", &1)));
    assert_eq!(map.max(), Some((&"only", &1)));
}

#[rstest]
fn test_clear_returns_empty() {
    let map = numbers(1..=10);
    let cleared = map.clear();
    assert!(cleared.is_empty());
    assert_eq!(map.len(), 10);
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[rstest]
#[case(1, Some("v1"))]
#[case(50, Some("v50"))]
#[case(100, Some("v100"))]
#[case(0, None)]
#[case(101, None)]
fn test_find(#[case] key: i32, #[case] expected: Option<&str>) {
    let map = numbers(1..=100);
    assert_eq!(map.find(&key).map(String::as_str), expected);
    assert_eq!(map.contains_key(&key), expected.is_some());
    assert_eq!(map.find_seq(&key).count(), usize::from(expected.is_some()));
}

#[rstest]
fn test_find_match() {
    let map = OrderedMap::new().try_add("a", 1);
    let hit = map.find_match(&"a", |value| value * 10, || -1);
    let miss = map.find_match(&"z", |value| value * 10, || -1);
    assert_eq!(hit, 10);
    assert_eq!(miss, -1);
}

#[rstest]
fn test_contains_checks_value() {
    let map = OrderedMap::new().try_add("a", 1);
    assert!(map.contains(&"a", &1));
    assert!(!map.contains(&"a", &2));
    assert!(!map.contains(&"b", &1));
}

#[rstest]
fn test_min_and_max() {
    let map = OrderedMap::new()
        .try_add(5, "five")
        .try_add(-2, "minus two")
        .try_add(9, "nine");
    assert_eq!(map.min(), Some((&-2, &"minus two")));
    assert_eq!(map.max(), Some((&9, &"nine")));
}

// =============================================================================
// Insertion Policy Tests
// =============================================================================

#[rstest]
fn test_try_add_with_resolves_conflict() {
    let map = OrderedMap::new().try_add("a", 1);
    let resolved = map.try_add_with("a", 5, |current, existing| {
        current.add_or_update("a", existing + 5)
    });
    assert_eq!(resolved.find(&"a"), Some(&6));

    let inserted = map.try_add_with("b", 5, |_, _| panic!("no conflict expected"));
    assert_eq!(inserted.find(&"b"), Some(&5));
}

#[rstest]
fn test_add_or_update_overwrites() {
    let map = OrderedMap::new().add_or_update("a", 1).add_or_update("a", 2);
    assert_eq!(map.len(), 1);
    assert_eq!(map.find(&"a"), Some(&2));
}

#[rstest]
fn test_add_or_update_with_counts_words() {
    let words = ["apple", "fig", "apple", "pear", "apple", "fig"];
    let counts = words.iter().fold(OrderedMap::<&str, i32>::new(), |counts, word| {
        counts.add_or_update_with(*word, |count| count + 1, || 1)
    });
    assert_eq!(counts.find(&"apple"), Some(&3));
    assert_eq!(counts.find(&"fig"), Some(&2));
    assert_eq!(counts.find(&"pear"), Some(&1));
}

#[rstest]
fn test_add_or_update_with_default() {
    let map = OrderedMap::<&str, i32>::new()
        .add_or_update_with_default("a", |value| value * 2, 10)
        .add_or_update_with_default("a", |value| value * 2, 10);
    assert_eq!(map.find(&"a"), Some(&20));
}

#[rstest]
fn test_add_range_is_all_or_nothing() {
    let map = OrderedMap::new().try_add(2, "two");
    let error = map
        .add_range([(1, "one"), (2, "dup"), (3, "three")])
        .unwrap_err();
    assert_eq!(error, MapError::KeyExists { operation: "add_range" });
    assert_eq!(map.len(), 1);

    let extended = map.add_range([(1, "one"), (3, "three")]).unwrap();
    assert_eq!(extended.keys().collect::<Vec<_>>(), vec![&1, &2, &3]);
}

#[rstest]
fn test_try_add_range_skips_existing() {
    let map = OrderedMap::new().try_add(2, "two");
    let extended = map.try_add_range([(1, "one"), (2, "dup"), (3, "three")]);
    assert_eq!(extended.len(), 3);
    assert_eq!(extended.find(&2), Some(&"two"));
}

#[rstest]
fn test_add_or_update_range_last_wins() {
    let map = OrderedMap::new().add_or_update_range([(1, "a"), (1, "b"), (2, "c")]);
    assert_eq!(map.len(), 2);
    assert_eq!(map.find(&1), Some(&"b"));
}

#[rstest]
fn test_from_iterator_last_wins() {
    let map: OrderedMap<i32, &str> = vec![(1, "first"), (1, "second")].into_iter().collect();
    assert_eq!(map.len(), 1);
    assert_eq!(map.find(&1), Some(&"second"));
}

// =============================================================================
// Update Policy Tests
// =============================================================================

#[rstest]
fn test_set_item_on_absent_key_fails() {
    let map = OrderedMap::new().try_add("a", 1);
    assert_eq!(
        map.set_item(&"b", 2),
        Err(MapError::KeyNotFound { operation: "set_item" })
    );
    assert_eq!(
        map.set_item_with(&"b", |value| value + 1),
        Err(MapError::KeyNotFound { operation: "set_item_with" })
    );
}

#[rstest]
fn test_try_set_item_ignores_absent_key() {
    let map = OrderedMap::new().try_add("a", 1);
    assert_eq!(map.try_set_item(&"b", 2), map);
    assert_eq!(map.try_set_item(&"a", 2).find(&"a"), Some(&2));
    assert_eq!(map.try_set_item_with(&"a", |value| value + 10).find(&"a"), Some(&11));
    assert_eq!(map.try_set_item_with(&"z", |value| value + 10), map);
}

#[rstest]
fn test_try_set_item_or_else_runs_fallback() {
    let map = OrderedMap::new().try_add("a", 1);
    let fallback = map.try_set_item_or_else(&"b", |value| value + 1, |current| {
        current.add_or_update("b", 0)
    });
    assert_eq!(fallback.find(&"b"), Some(&0));

    let updated = map.try_set_item_or_else(&"a", |value| value + 1, |_| unreachable!());
    assert_eq!(updated.find(&"a"), Some(&2));
}

#[rstest]
fn test_set_items_is_all_or_nothing() {
    let map = numbers(1..=3);
    let error = map
        .set_items([(1, "x".to_string()), (9, "y".to_string())])
        .unwrap_err();
    assert_eq!(error, MapError::KeyNotFound { operation: "set_items" });

    let updated = map
        .set_items([(1, "x".to_string()), (3, "z".to_string())])
        .unwrap();
    assert_eq!(updated.values().collect::<Vec<_>>(), vec!["x", "v2", "z"]);
}

#[rstest]
fn test_try_set_items_skips_absent() {
    let map = numbers(1..=3);
    let updated = map.try_set_items([(2, "two".to_string()), (7, "seven".to_string())]);
    assert_eq!(updated.len(), 3);
    assert_eq!(updated.find(&2).map(String::as_str), Some("two"));
    assert!(!updated.contains_key(&7));
}

#[rstest]
fn test_set_item_keeps_shape() {
    let map = numbers(1..=100);
    let updated = map.set_item(&50, "fifty".to_string()).unwrap();
    assert_eq!(updated.height(), map.height());
    assert_eq!(updated.len(), map.len());
}

// =============================================================================
// Missing-value Tests
// =============================================================================

#[rstest]
fn test_add_rejects_missing_key() {
    let map: OrderedMap<Option<i32>, i32> = OrderedMap::new();
    assert_eq!(
        map.add(None, 1),
        Err(MapError::ValueMissing {
            operation: "add",
            argument: "key"
        })
    );
}

#[rstest]
fn test_add_rejects_missing_value() {
    let map: OrderedMap<i32, Option<i32>> = OrderedMap::new();
    assert_eq!(
        map.add(1, None),
        Err(MapError::ValueMissing {
            operation: "add",
            argument: "value"
        })
    );
    assert!(map.add(1, Some(1)).is_ok());
}

#[rstest]
fn test_set_item_with_rejects_missing_result() {
    let map = OrderedMap::new().try_add("ratio", 1.0_f64);
    assert_eq!(
        map.set_item_with(&"ratio", |_| f64::NAN),
        Err(MapError::MapperProducedInvalidValue {
            operation: "set_item_with"
        })
    );
}

#[rstest]
#[should_panic(expected = "try_add: required key is missing")]
fn test_try_add_panics_on_missing_key() {
    let map: OrderedMap<Option<i32>, i32> = OrderedMap::new();
    let _ = map.try_add(None, 1);
}

#[rstest]
#[should_panic(expected = "find: required key is missing")]
fn test_find_panics_on_missing_key() {
    let map: OrderedMap<f64, i32, _> = OrderedMap::with_comparer(by(|left: &f64, right: &f64| {
        left.total_cmp(right)
    }));
    let _ = map.find(&f64::NAN);
}

#[rstest]
#[should_panic(expected = "map_values: mapper produced a missing value")]
fn test_map_values_panics_on_missing_result() {
    let map = OrderedMap::new().try_add(1, 1);
    let _ = map.map_values(|_| None::<i32>);
}

#[derive(Clone, Debug, PartialEq)]
struct Reading(Option<u8>);

impl Validity for Reading {
    fn is_valid(&self) -> bool {
        self.0.is_some()
    }
}

#[rstest]
fn test_user_defined_validity() {
    let map: OrderedMap<i32, Reading> = OrderedMap::new();
    assert!(map.add(1, Reading(Some(3))).is_ok());
    assert!(map.add(1, Reading(None)).is_err());
}

#[rstest]
fn test_try_add_range_skips_invalid_entries() {
    let map = OrderedMap::<i32, Option<i32>>::new()
        .try_add_range([(1, Some(1)), (2, None), (3, Some(3))]);
    assert_eq!(map.len(), 2);
    assert!(!map.contains_key(&2));
}

#[rstest]
fn test_try_set_items_skips_invalid_entries() {
    let map = OrderedMap::<i32, Option<i32>>::new()
        .try_add_range([(1, Some(1)), (2, Some(2))])
        .try_set_items([(1, Some(10)), (2, None), (3, Some(30))]);
    assert_eq!(map.len(), 2);
    assert_eq!(map.find(&1), Some(&Some(10)));
    assert_eq!(map.find(&2), Some(&Some(2)));
}

#[rstest]
fn test_try_set_items_with_skips_invalid_results() {
    let map: OrderedMap<i32, Option<i32>> = (1..=3).map(|key| (key, Some(key))).collect();
    let updated = map.try_set_items_with([1, 2, 3], |value| value.filter(|inner| inner % 2 == 1));
    assert_eq!(updated, map);

    let doubled = map.try_set_items_with([2], |value| value.map(|inner| inner * 2));
    assert_eq!(doubled.find(&2), Some(&Some(4)));
}

#[rstest]
fn test_remove_range_skips_invalid_keys() {
    let map: OrderedMap<f64, i32, _> =
        OrderedMap::with_comparer(by(|left: &f64, right: &f64| left.total_cmp(right)))
            .try_add_range([(1.0, 1), (2.0, 2)]);
    let removed = map.remove_range([f64::NAN, 1.0]);
    assert_eq!(removed.keys().copied().collect::<Vec<_>>(), vec![2.0]);
}

// =============================================================================
// Removal Tests
// =============================================================================

#[rstest]
fn test_remove_absent_key_is_noop() {
    let map = numbers(1..=5);
    assert_eq!(map.remove(&42), map);
}

#[rstest]
fn test_remove_range() {
    let map = numbers(1..=10);
    let removed = map.remove_range([2, 4, 6, 99]);
    assert_eq!(removed.len(), 7);
    assert_eq!(
        removed.keys().copied().collect::<Vec<_>>(),
        vec![1, 3, 5, 7, 8, 9, 10]
    );

    let by_reference = map.remove_range(&[1, 10]);
    assert_eq!(by_reference.len(), 8);
}

#[rstest]
fn test_remove_everything() {
    let map = numbers(1..=64);
    let drained = map.remove_range(1..=64);
    assert!(drained.is_empty());
    assert_eq!(drained.height(), 0);
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[rstest]
fn test_reverse_comparer() {
    let map: OrderedMap<i32, i32, ReverseOrder> = (1..=5).map(|key| (key, key)).collect();
    assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![5, 4, 3, 2, 1]);
    assert_eq!(map.min(), Some((&5, &5)));
}

#[rstest]
fn test_custom_comparer_collapses_equal_keys() {
    let map = OrderedMap::with_comparer(by(|left: &String, right: &String| {
        left.to_lowercase().cmp(&right.to_lowercase())
    }))
    .try_add("Apple".to_string(), 1)
    .try_add("apple".to_string(), 2)
    .try_add("Banana".to_string(), 3);

    assert_eq!(map.len(), 2);
    assert_eq!(map.find(&"APPLE".to_string()), Some(&1));
}

#[rstest]
fn test_reversed_view() {
    let map = numbers(1..=5);
    let reversed = map.reversed();
    assert!(reversed.is_reversed());
    assert!(!map.is_reversed());
    assert_eq!(
        reversed.keys().copied().collect::<Vec<_>>(),
        vec![5, 4, 3, 2, 1]
    );
    assert_eq!(reversed.reversed().keys().next(), Some(&1));
    assert_eq!(reversed, map);
    assert_eq!(calculate_hash(&reversed), calculate_hash(&map));
}

#[rstest]
fn test_derived_maps_keep_direction() {
    let reversed = numbers(1..=3).reversed();
    let extended = reversed.try_add(4, "v4".to_string());
    assert_eq!(extended.keys().next(), Some(&4));
}

#[rstest]
fn test_iterators_are_exact_size() {
    let map = numbers(1..=20);
    let mut iterator = map.iter();
    assert_eq!(iterator.len(), 20);
    iterator.next();
    assert_eq!(iterator.len(), 19);
    assert_eq!(map.keys().len(), 20);
    assert_eq!(map.values().len(), 20);
    assert_eq!(map.clone().into_iter().len(), 20);
}

#[rstest]
fn test_owned_iteration() {
    let map = OrderedMap::new().try_add(2, "b").try_add(1, "a");
    let entries: Vec<(i32, &str)> = map.into_iter().collect();
    assert_eq!(entries, vec![(1, "a"), (2, "b")]);
}

#[rstest]
fn test_skip() {
    let map = numbers(1..=10);
    let keys: Vec<i32> = map.skip(7).map(|(key, _)| *key).collect();
    assert_eq!(keys, vec![8, 9, 10]);
    assert_eq!(map.skip(100).count(), 0);
}

// =============================================================================
// Range Tests
// =============================================================================

#[rstest]
#[case(3, 6, vec![3, 4, 5, 6])]
#[case(0, 2, vec![1, 2])]
#[case(9, 20, vec![9, 10])]
#[case(5, 5, vec![5])]
#[case(6, 3, vec![])]
#[case(11, 20, vec![])]
fn test_range_is_inclusive(#[case] low: i32, #[case] high: i32, #[case] expected: Vec<i32>) {
    let map = numbers(1..=10);
    let keys: Vec<i32> = map.range(&low, &high).map(|(key, _)| *key).collect();
    assert_eq!(keys, expected);
}

#[rstest]
fn test_range_on_sparse_keys() {
    let map: OrderedMap<i32, i32> = (0..50).map(|key| (key * 10, key)).collect();
    let keys: Vec<i32> = map.range(&15, &45).map(|(key, _)| *key).collect();
    assert_eq!(keys, vec![20, 30, 40]);
}

#[rstest]
fn test_find_range_values() {
    let map = numbers(1..=10);
    let values: Vec<&String> = map.find_range(&4, &6).collect();
    assert_eq!(values, vec!["v4", "v5", "v6"]);
}

#[rstest]
fn test_find_range_follows_direction() {
    let map = numbers(1..=10).reversed();
    let values: Vec<&String> = map.find_range(&4, &6).collect();
    assert_eq!(values, vec!["v6", "v5", "v4"]);
}

// =============================================================================
// Whole-map Operation Tests
// =============================================================================

#[rstest]
fn test_union_right_wins() {
    let left = OrderedMap::new().try_add(1, "left").try_add(2, "left");
    let right = OrderedMap::new().try_add(2, "right").try_add(3, "right");
    let merged = &left + &right;
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.find(&1), Some(&"left"));
    assert_eq!(merged.find(&2), Some(&"right"));
    assert_eq!(merged.find(&3), Some(&"right"));
}

#[rstest]
fn test_union_right_wins_when_right_is_larger() {
    let left = OrderedMap::new().try_add(2, "left");
    let right: OrderedMap<i32, &str> = (1..=10).map(|key| (key, "right")).collect();
    let merged = left.clone() + right;
    assert_eq!(merged.len(), 10);
    assert_eq!(merged.find(&2), Some(&"right"));
}

#[rstest]
fn test_union_with_resolver() {
    let left = OrderedMap::new().try_add("a", 1).try_add("b", 2);
    let right = OrderedMap::new().try_add("b", 10).try_add("c", 20);
    let merged = left.union_with(&right, |_, mine, theirs| mine + theirs);
    assert_eq!(merged.find(&"a"), Some(&1));
    assert_eq!(merged.find(&"b"), Some(&12));
    assert_eq!(merged.find(&"c"), Some(&20));
}

#[rstest]
fn test_difference() {
    let left = numbers(1..=10);
    let right = numbers(5..=20);
    let only_left = left.clone() - right;
    assert_eq!(
        only_left.keys().copied().collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(&left - &OrderedMap::new(), left);
}

#[rstest]
fn test_map_values_keeps_keys() {
    let map = numbers(1..=5);
    let lengths = map.map_values(|value| value.len());
    assert_eq!(lengths.len(), 5);
    assert_eq!(lengths.find(&3), Some(&2));
    assert_eq!(lengths.height(), map.height());
}

#[rstest]
fn test_filter() {
    let map = numbers(1..=20);
    let even = map.filter(|key, _| key % 2 == 0);
    assert_eq!(even.len(), 10);
    assert!(even.keys().all(|key| key % 2 == 0));
    assert!(even.height() <= 4);
}

// =============================================================================
// Equality and Hash Tests
// =============================================================================

#[rstest]
fn test_equality_ignores_insertion_order() {
    let ascending: OrderedMap<i32, i32> = (1..=50).map(|key| (key, key * 2)).collect();
    let descending: OrderedMap<i32, i32> = (1..=50).rev().map(|key| (key, key * 2)).collect();
    assert_eq!(ascending, descending);
    assert_eq!(calculate_hash(&ascending), calculate_hash(&descending));
}

#[rstest]
fn test_equal_maps_hash_equal_under_custom_comparer() {
    let first = OrderedMap::with_comparer(by(|left: &i32, right: &i32| {
        left.abs().cmp(&right.abs())
    }))
    .try_add(-3, 1);
    let second = first.clear().try_add(3, 1);
    assert_eq!(first, second);
    assert_eq!(calculate_hash(&first), calculate_hash(&second));
}

#[rstest]
fn test_inequality_on_value() {
    let first = OrderedMap::new().try_add(1, 1);
    let second = OrderedMap::new().try_add(1, 2);
    assert_ne!(first, second);
}

#[rstest]
fn test_map_as_hash_map_key() {
    use std::collections::HashMap;

    let key = numbers(1..=3);
    let mut lookup = HashMap::new();
    lookup.insert(key.clone(), "small");
    let rebuilt = numbers(1..=3).remove(&2).try_add(2, "v2".to_string());
    assert_eq!(lookup.get(&rebuilt), Some(&"small"));
}

// =============================================================================
// Formatting Tests
// =============================================================================

#[rstest]
fn test_display() {
    let map = OrderedMap::new().try_add("b", 2).try_add("a", 1);
    assert_eq!(format!("{map}"), "{a: 1, b: 2}");
}

#[rstest]
fn test_debug() {
    let map = OrderedMap::new().try_add(1, "one");
    assert_eq!(format!("{map:?}"), r#"{1: "one"}"#);
}

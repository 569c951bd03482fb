//! Persistent (immutable) ordered map based on an AVL tree.
//!
//! This module provides [`OrderedMap`], an immutable ordered map that uses
//! structural sharing for efficient versioning.
//!
//! # Overview
//!
//! `OrderedMap` is a persistent AVL tree: every "mutating" operation returns
//! a new map in O(log N) time and O(log N) fresh allocation, while every
//! earlier version stays valid and unchanged. Versions share all subtrees
//! the operation did not touch.
//!
//! - O(log N) find, add, update, remove
//! - O(log N + k) range queries where k is the number of results
//! - O(1) len and `is_empty`
//! - O(1) reversal of the enumeration direction
//!
//! # Duplicate and Missing Keys
//!
//! Each operation picks a policy for keys that already exist (on insert) or
//! do not exist (on update):
//!
//! | Operation                   | Key exists            | Key absent              |
//! |-----------------------------|-----------------------|-------------------------|
//! | `add`                       | `Err(KeyExists)`      | inserted                |
//! | `try_add`                   | unchanged             | inserted                |
//! | `try_add_with`              | resolver decides      | inserted                |
//! | `add_or_update*`            | value replaced        | inserted                |
//! | `set_item*`                 | value replaced        | `Err(KeyNotFound)`      |
//! | `try_set_item*`             | value replaced        | unchanged               |
//! | `try_set_item_or_else`      | value replaced        | fallback decides        |
//!
//! # Examples
//!
//! ```rust
//! use avl_map::persistent::OrderedMap;
//!
//! let m1 = OrderedMap::new().add("a", 1).unwrap();
//! let m2 = m1.add("b", 2).unwrap();
//!
//! assert_eq!(m1.len(), 1); // Original unchanged
//! assert_eq!(m2.keys().collect::<Vec<_>>(), vec![&"a", &"b"]);
//!
//! assert!(m2.add("a", 99).is_err());
//! assert_eq!(m2.try_add("a", 99), m2);
//!
//! let m3 = m2.set_item(&"a", 42).unwrap();
//! assert_eq!(m3.find(&"a"), Some(&42));
//! assert_eq!(m1.find(&"a"), Some(&1));
//!
//! assert_eq!(&m2 - &m1, OrderedMap::new().add("b", 2).unwrap());
//! ```

use std::borrow::Borrow;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::{FromIterator, Skip};
use std::ops::{Add, Sub};
use std::sync::OnceLock;

use super::iter::{Cursor, IntoIter, Iter, Keys, Range, Values};
use super::node::{Link, height};
use super::tree::{self, DuplicatePolicy, Insertion};
use crate::comparer::{Comparer, NaturalOrder};
use crate::error::MapError;
use crate::validity::Validity;

// =============================================================================
// OrderedMap Definition
// =============================================================================

/// A persistent (immutable) ordered map based on an AVL tree.
///
/// Keys are ordered by the comparer `C`, chosen once when the empty map is
/// created ([`NaturalOrder`] unless [`with_comparer`](Self::with_comparer)
/// says otherwise). Keys and values must be [`Validity`]-valid; see the
/// `# Errors` and `# Panics` sections of each operation.
///
/// # Time Complexity
///
/// | Operation         | Complexity        |
/// |-------------------|-------------------|
/// | `new`             | O(1)              |
/// | `find`            | O(log N)          |
/// | `add`/`try_add`   | O(log N)          |
/// | `set_item`        | O(log N)          |
/// | `remove`          | O(log N)          |
/// | `range`           | O(log N + k)      |
/// | `union`           | O(m log(N + m))   |
/// | `len`             | O(1)              |
/// | `reversed`        | O(1)              |
/// | `hash`            | O(N) once, then O(1) |
///
/// # Examples
///
/// ```rust
/// use avl_map::persistent::OrderedMap;
///
/// let map = OrderedMap::new()
///     .try_add(3, "three")
///     .try_add(1, "one")
///     .try_add(2, "two");
///
/// let keys: Vec<&i32> = map.keys().collect();
/// assert_eq!(keys, vec![&1, &2, &3]);
///
/// let reversed = map.reversed();
/// let descending: Vec<&i32> = reversed.keys().collect();
/// assert_eq!(descending, vec![&3, &2, &1]);
/// ```
pub struct OrderedMap<K, V, C = NaturalOrder> {
    /// Root node of the tree
    root: Link<K, V>,
    /// Number of entries
    length: usize,
    /// Enumerate in descending key order
    reverse: bool,
    comparer: C,
    /// Memoized structural hash of this version
    hash: OnceLock<u64>,
}

impl<K, V, C: Clone> Clone for OrderedMap<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            length: self.length,
            reverse: self.reverse,
            comparer: self.comparer.clone(),
            hash: self.hash.clone(),
        }
    }
}

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(OrderedMap<i32, String>: Send, Sync);

#[cfg(not(feature = "arc"))]
static_assertions::assert_not_impl_any!(OrderedMap<i32, String>: Send, Sync);

impl<K, V> OrderedMap<K, V> {
    /// Creates a new empty map ordered by the keys' [`Ord`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map: OrderedMap<i32, String> = OrderedMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::with_comparer(NaturalOrder)
    }

    /// The zero-entry map.
    ///
    /// Empty maps allocate nothing, so every call yields the same value;
    /// all empty maps compare equal.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self::new()
    }
}

impl<K, V, C> OrderedMap<K, V, C> {
    /// Creates a new empty map ordered by `comparer`.
    ///
    /// Every map derived from the result keeps the same comparer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::comparer::ReverseOrder;
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map = OrderedMap::with_comparer(ReverseOrder)
    ///     .try_add(1, "one")
    ///     .try_add(2, "two");
    /// assert_eq!(map.keys().collect::<Vec<_>>(), vec![&2, &1]);
    /// ```
    #[inline]
    #[must_use]
    pub const fn with_comparer(comparer: C) -> Self {
        Self {
            root: None,
            length: 0,
            reverse: false,
            comparer,
            hash: OnceLock::new(),
        }
    }

    /// Returns the number of entries in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns `true` if this map enumerates in descending key order.
    #[inline]
    #[must_use]
    pub const fn is_reversed(&self) -> bool {
        self.reverse
    }

    /// Returns the comparer that orders this map's keys.
    #[inline]
    #[must_use]
    pub const fn comparer(&self) -> &C {
        &self.comparer
    }

    /// Returns the height of the underlying tree (0 for an empty map).
    ///
    /// An AVL tree of N entries is never taller than about 1.44 log2(N + 2).
    #[must_use]
    pub fn height(&self) -> u32 {
        height(self.root.as_ref())
    }

    /// Returns the same entries enumerated in the opposite direction.
    ///
    /// The tree is shared, not copied.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn reversed(&self) -> Self
    where
        C: Clone,
    {
        Self {
            root: self.root.clone(),
            length: self.length,
            reverse: !self.reverse,
            comparer: self.comparer.clone(),
            hash: self.hash.clone(),
        }
    }

    /// Returns a lazy iterator over entries in the map's direction.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map = OrderedMap::new().try_add(2, "two").try_add(1, "one");
    /// let entries: Vec<(&i32, &&str)> = map.iter().collect();
    /// assert_eq!(entries, vec![(&1, &"one"), (&2, &"two")]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.root, self.length, self.reverse)
    }

    /// Returns a lazy iterator over `(key, value)` pairs; alias for
    /// [`iter`](Self::iter).
    #[inline]
    #[must_use]
    pub fn tuples(&self) -> Iter<'_, K, V> {
        self.iter()
    }

    /// Returns a lazy iterator over keys in the map's direction.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Returns a lazy iterator over values in the map's key order.
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Returns the entries after the first `count`, in the map's direction.
    ///
    /// The tree is not rebuilt; skipped entries are stepped over lazily.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map: OrderedMap<i32, i32> = (1..=5).map(|key| (key, key * 10)).collect();
    /// let rest: Vec<&i32> = map.skip(3).map(|(key, _)| key).collect();
    /// assert_eq!(rest, vec![&4, &5]);
    /// ```
    #[must_use]
    pub fn skip(&self, count: usize) -> Skip<Iter<'_, K, V>> {
        self.iter().skip(count)
    }
}

// =============================================================================
// Validation Helpers
// =============================================================================

/// Logs a rejected operation and hands the error back.
fn reject(error: MapError) -> MapError {
    tracing::debug!(
        operation = error.operation(),
        error = %error,
        "ordered map operation rejected"
    );
    error
}

/// Unwraps a result whose error is a caller bug.
#[track_caller]
fn require<T>(result: Result<T, MapError>) -> T {
    match result {
        Ok(value) => value,
        Err(error) => panic!("{error}"),
    }
}

fn check_key<K: Validity>(operation: &'static str, key: &K) -> Result<(), MapError> {
    if key.is_valid() {
        Ok(())
    } else {
        Err(MapError::ValueMissing {
            operation,
            argument: "key",
        })
    }
}

fn check_value<V: Validity>(operation: &'static str, value: &V) -> Result<(), MapError> {
    if value.is_valid() {
        Ok(())
    } else {
        Err(MapError::ValueMissing {
            operation,
            argument: "value",
        })
    }
}

/// Logs an entry a lenient bulk operation leaves out.
fn skip_entry(index: usize, error: &MapError) {
    tracing::debug!(
        operation = error.operation(),
        index,
        error = %error,
        "bulk entry skipped"
    );
}

fn check_produced<V: Validity>(operation: &'static str, value: V) -> Result<V, MapError> {
    if value.is_valid() {
        Ok(value)
    } else {
        Err(MapError::MapperProducedInvalidValue { operation })
    }
}

// =============================================================================
// Core Operations
// =============================================================================

impl<K, V, C> OrderedMap<K, V, C>
where
    K: Clone + Validity,
    V: Clone + Validity,
    C: Comparer<K> + Clone,
{
    /// Wraps a new root in a map sharing this map's comparer and direction.
    fn derive(&self, root: Link<K, V>, length: usize) -> Self {
        Self {
            root,
            length,
            reverse: self.reverse,
            comparer: self.comparer.clone(),
            hash: OnceLock::new(),
        }
    }

    fn settle(&self, insertion: Insertion<'_, K, V>) -> Self {
        match insertion {
            Insertion::Added(root) => self.derive(Some(root), self.length + 1),
            Insertion::Replaced(root) => self.derive(Some(root), self.length),
            Insertion::Unchanged | Insertion::Collision(_) => self.clone(),
        }
    }

    fn insert(&self, key: K, value: V, policy: DuplicatePolicy) -> Insertion<'_, K, V> {
        tree::insert(self.root.as_ref(), key, value, policy, &self.comparer)
    }

    /// Replaces the value at `key` with `mapper(existing)`, or returns
    /// `Ok(None)` if the key is absent.
    fn replace_existing<F>(
        &self,
        operation: &'static str,
        key: &K,
        mapper: F,
    ) -> Result<Option<Self>, MapError>
    where
        F: FnOnce(&V) -> V,
    {
        check_key(operation, key)?;
        let root = tree::update(
            self.root.as_ref(),
            key,
            |existing| check_produced(operation, mapper(existing)),
            &self.comparer,
        )?;
        Ok(root.map(|root| self.derive(Some(root), self.length)))
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// Returns a reference to the value stored for `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not [`Validity`]-valid.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map = OrderedMap::new().try_add("a", 1);
    /// assert_eq!(map.find(&"a"), Some(&1));
    /// assert_eq!(map.find(&"b"), None);
    /// ```
    #[must_use]
    pub fn find(&self, key: &K) -> Option<&V> {
        require(check_key("find", key));
        tree::find(self.root.as_ref(), key, &self.comparer)
    }

    /// Returns the value stored for `key` as a sequence of zero or one
    /// element.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not [`Validity`]-valid.
    pub fn find_seq(&self, key: &K) -> std::option::IntoIter<&V> {
        self.find(key).into_iter()
    }

    /// Matches on the value stored for `key`: `some(value)` if present,
    /// `none()` otherwise.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not [`Validity`]-valid.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map = OrderedMap::new().try_add("a", 1);
    /// let described = map.find_match(&"a", |value| format!("got {value}"), || "nothing".to_string());
    /// assert_eq!(described, "got 1");
    /// ```
    pub fn find_match<R, S, N>(&self, key: &K, some: S, none: N) -> R
    where
        S: FnOnce(&V) -> R,
        N: FnOnce() -> R,
    {
        self.find(key).map_or_else(none, some)
    }

    /// Returns `true` if the map contains `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not [`Validity`]-valid.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Returns `true` if the map stores exactly `value` for `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not [`Validity`]-valid.
    #[must_use]
    pub fn contains(&self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.find(key).is_some_and(|stored| stored == value)
    }

    /// Returns the entry with the smallest key under the comparer.
    #[must_use]
    pub fn min(&self) -> Option<(&K, &V)> {
        self.root.as_ref().map(|root| {
            let node = tree::first(root);
            (&node.key, &node.value)
        })
    }

    /// Returns the entry with the largest key under the comparer.
    #[must_use]
    pub fn max(&self) -> Option<(&K, &V)> {
        self.root.as_ref().map(|root| {
            let node = tree::last(root);
            (&node.key, &node.value)
        })
    }

    /// Returns the entries whose keys lie in `low..=high`, in the map's
    /// direction.
    ///
    /// An inverted range (`low` after `high`) is empty.
    ///
    /// # Panics
    ///
    /// Panics if `low` or `high` is not [`Validity`]-valid.
    ///
    /// # Complexity
    ///
    /// O(log N + k) where k is the number of entries in the range
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map: OrderedMap<i32, &str> =
    ///     [(1, "one"), (2, "two"), (3, "three"), (4, "four")].into_iter().collect();
    ///
    /// let keys: Vec<&i32> = map.range(&2, &3).map(|(key, _)| key).collect();
    /// assert_eq!(keys, vec![&2, &3]);
    /// ```
    #[must_use]
    pub fn range(&self, low: &K, high: &K) -> Range<'_, K, V, C> {
        require(check_key("range", low));
        require(check_key("range", high));
        Range::new(
            &self.root,
            low.clone(),
            high.clone(),
            self.reverse,
            &self.comparer,
        )
    }

    /// Returns the values whose keys lie in `low..=high`, in the map's
    /// direction.
    ///
    /// # Ordering
    ///
    /// Ascending for a plain map, descending for a [`reversed`](Self::reversed) one.
    ///
    /// # Panics
    ///
    /// Panics if `low` or `high` is not [`Validity`]-valid.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map: OrderedMap<i32, &str> =
    ///     [(1, "one"), (2, "two"), (3, "three")].into_iter().collect();
    ///
    /// let values: Vec<&&str> = map.find_range(&2, &9).collect();
    /// assert_eq!(values, vec![&"two", &"three"]);
    /// ```
    pub fn find_range<'a>(
        &'a self,
        low: &K,
        high: &K,
    ) -> impl Iterator<Item = &'a V> + use<'a, K, V, C> {
        self.range(low, high).map(|(_, value)| value)
    }

    // -------------------------------------------------------------------------
    // Insertion
    // -------------------------------------------------------------------------

    fn add_entry(&self, operation: &'static str, key: K, value: V) -> Result<Self, MapError> {
        check_key(operation, &key)
            .and_then(|()| check_value(operation, &value))
            .map_err(reject)?;
        match self.insert(key, value, DuplicatePolicy::Fail) {
            Insertion::Collision(_) => Err(reject(MapError::KeyExists { operation })),
            insertion => Ok(self.settle(insertion)),
        }
    }

    /// Adds a new entry.
    ///
    /// # Errors
    ///
    /// - [`MapError::KeyExists`] if `key` is already present
    /// - [`MapError::ValueMissing`] if `key` or `value` is not valid
    ///
    /// `self` is never modified.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::error::MapError;
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map = OrderedMap::new().add(1, "one").unwrap();
    /// assert_eq!(map.add(1, "uno"), Err(MapError::KeyExists { operation: "add" }));
    /// ```
    pub fn add(&self, key: K, value: V) -> Result<Self, MapError> {
        self.add_entry("add", key, value)
    }

    /// Adds a new entry, or returns the map unchanged if `key` exists.
    ///
    /// # Panics
    ///
    /// Panics if `key` or `value` is not [`Validity`]-valid.
    #[must_use]
    pub fn try_add(&self, key: K, value: V) -> Self {
        require(check_key("try_add", &key));
        require(check_value("try_add", &value));
        self.settle(self.insert(key, value, DuplicatePolicy::Keep))
    }

    /// Adds a new entry; if `key` exists, returns
    /// `on_conflict(self, existing_value)` instead.
    ///
    /// # Panics
    ///
    /// Panics if `key` or `value` is not [`Validity`]-valid.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map = OrderedMap::new().try_add("hits", 1);
    /// let bumped = map.try_add_with("hits", 1, |map, existing| {
    ///     map.add_or_update("hits", existing + 1)
    /// });
    /// assert_eq!(bumped.find(&"hits"), Some(&2));
    /// ```
    #[must_use]
    pub fn try_add_with<F>(&self, key: K, value: V, on_conflict: F) -> Self
    where
        F: FnOnce(&Self, &V) -> Self,
    {
        require(check_key("try_add_with", &key));
        require(check_value("try_add_with", &value));
        match self.insert(key, value, DuplicatePolicy::Fail) {
            Insertion::Collision(existing) => on_conflict(self, existing),
            insertion => self.settle(insertion),
        }
    }

    /// Inserts `key` with `value`, replacing any existing value.
    ///
    /// # Panics
    ///
    /// Panics if `key` or `value` is not [`Validity`]-valid.
    #[must_use]
    pub fn add_or_update(&self, key: K, value: V) -> Self {
        require(check_key("add_or_update", &key));
        require(check_value("add_or_update", &value));
        self.settle(self.insert(key, value, DuplicatePolicy::Replace))
    }

    fn upsert<S, N>(&self, operation: &'static str, key: K, some: S, none: N) -> Self
    where
        S: FnOnce(&V) -> V,
        N: FnOnce() -> V,
    {
        match require(self.replace_existing(operation, &key, some)) {
            Some(updated) => updated,
            None => {
                let value = require(check_produced(operation, none()));
                self.settle(self.insert(key, value, DuplicatePolicy::Keep))
            }
        }
    }

    /// Replaces the value at `key` with `some(existing)`, or inserts
    /// `none()` if the key is absent.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not valid, or if `some` or `none` produces an
    /// invalid value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let counts = OrderedMap::<&str, i32>::new()
    ///     .add_or_update_with("a", |count| count + 1, || 1)
    ///     .add_or_update_with("a", |count| count + 1, || 1);
    /// assert_eq!(counts.find(&"a"), Some(&2));
    /// ```
    #[must_use]
    pub fn add_or_update_with<S, N>(&self, key: K, some: S, none: N) -> Self
    where
        S: FnOnce(&V) -> V,
        N: FnOnce() -> V,
    {
        self.upsert("add_or_update_with", key, some, none)
    }

    /// Replaces the value at `key` with `some(existing)`, or inserts
    /// `default` if the key is absent.
    ///
    /// # Panics
    ///
    /// Panics if `key` or `default` is not valid, or if `some` produces an
    /// invalid value.
    #[must_use]
    pub fn add_or_update_with_default<S>(&self, key: K, some: S, default: V) -> Self
    where
        S: FnOnce(&V) -> V,
    {
        require(check_value("add_or_update_with_default", &default));
        self.upsert("add_or_update_with_default", key, some, || default)
    }

    // -------------------------------------------------------------------------
    // Update
    // -------------------------------------------------------------------------

    fn set_entry(&self, operation: &'static str, key: &K, value: V) -> Result<Self, MapError> {
        check_value(operation, &value).map_err(reject)?;
        self.replace_existing(operation, key, |_| value)
            .map_err(reject)?
            .ok_or_else(|| reject(MapError::KeyNotFound { operation }))
    }

    /// Replaces the value at an existing `key`.
    ///
    /// # Errors
    ///
    /// - [`MapError::KeyNotFound`] if `key` is absent
    /// - [`MapError::ValueMissing`] if `key` or `value` is not valid
    pub fn set_item(&self, key: &K, value: V) -> Result<Self, MapError> {
        self.set_entry("set_item", key, value)
    }

    /// Replaces the value at an existing `key` with `mapper(existing)`.
    ///
    /// # Errors
    ///
    /// - [`MapError::KeyNotFound`] if `key` is absent
    /// - [`MapError::ValueMissing`] if `key` is not valid
    /// - [`MapError::MapperProducedInvalidValue`] if `mapper` returns an
    ///   invalid value
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map = OrderedMap::new().try_add("a", 1);
    /// let doubled = map.set_item_with(&"a", |value| value * 2).unwrap();
    /// assert_eq!(doubled.find(&"a"), Some(&2));
    /// assert!(map.set_item_with(&"b", |value| value * 2).is_err());
    /// ```
    pub fn set_item_with<F>(&self, key: &K, mapper: F) -> Result<Self, MapError>
    where
        F: FnOnce(&V) -> V,
    {
        let operation = "set_item_with";
        self.replace_existing(operation, key, mapper)
            .map_err(reject)?
            .ok_or_else(|| reject(MapError::KeyNotFound { operation }))
    }

    /// Replaces the value at `key`, or returns the map unchanged if the key
    /// is absent.
    ///
    /// # Panics
    ///
    /// Panics if `key` or `value` is not [`Validity`]-valid.
    #[must_use]
    pub fn try_set_item(&self, key: &K, value: V) -> Self {
        require(check_value("try_set_item", &value));
        require(self.replace_existing("try_set_item", key, |_| value)).unwrap_or_else(|| self.clone())
    }

    /// Replaces the value at `key` with `mapper(existing)`, or returns the
    /// map unchanged if the key is absent.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not valid or `mapper` produces an invalid value.
    #[must_use]
    pub fn try_set_item_with<F>(&self, key: &K, mapper: F) -> Self
    where
        F: FnOnce(&V) -> V,
    {
        require(self.replace_existing("try_set_item_with", key, mapper))
            .unwrap_or_else(|| self.clone())
    }

    /// Replaces the value at `key` with `mapper(existing)`, or returns
    /// `none(self)` if the key is absent.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not valid or `mapper` produces an invalid value.
    #[must_use]
    pub fn try_set_item_or_else<F, N>(&self, key: &K, mapper: F, none: N) -> Self
    where
        F: FnOnce(&V) -> V,
        N: FnOnce(&Self) -> Self,
    {
        require(self.replace_existing("try_set_item_or_else", key, mapper))
            .unwrap_or_else(|| none(self))
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Removes `key`, or returns the map unchanged if it is absent.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not [`Validity`]-valid.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map = OrderedMap::new().try_add(1, "one").try_add(2, "two");
    /// let removed = map.remove(&1);
    ///
    /// assert_eq!(map.len(), 2);     // Original unchanged
    /// assert_eq!(removed.len(), 1); // New version
    /// assert_eq!(removed.remove(&7), removed);
    /// ```
    #[must_use]
    pub fn remove(&self, key: &K) -> Self {
        require(check_key("remove", key));
        tree::remove(self.root.as_ref(), key, &self.comparer)
            .map_or_else(|| self.clone(), |root| self.derive(root, self.length - 1))
    }

    /// Returns an empty map with this map's comparer and direction.
    #[must_use]
    pub fn clear(&self) -> Self {
        self.derive(None, 0)
    }

    // -------------------------------------------------------------------------
    // Bulk Operations
    // -------------------------------------------------------------------------

    /// Adds every entry in order.
    ///
    /// # Errors
    ///
    /// Fails on the first entry that [`add`](Self::add) would reject; no
    /// entry is applied in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map = OrderedMap::new().add_range([(1, "one"), (2, "two")]).unwrap();
    /// assert_eq!(map.len(), 2);
    /// assert!(map.add_range([(3, "three"), (1, "uno")]).is_err());
    /// assert_eq!(map.len(), 2);
    /// ```
    pub fn add_range<I>(&self, entries: I) -> Result<Self, MapError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        entries
            .into_iter()
            .enumerate()
            .try_fold(self.clone(), |map, (index, (key, value))| {
                map.add_entry("add_range", key, value).inspect_err(|_| {
                    tracing::debug!(index, "add_range aborted, no entries applied");
                })
            })
    }

    /// Adds every entry in order, skipping keys that already exist and
    /// entries whose key or value is not [`Validity`]-valid.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map = OrderedMap::new().try_add_range([(1, Some(1)), (2, None), (3, Some(3))]);
    /// assert_eq!(map.keys().collect::<Vec<_>>(), vec![&1, &3]);
    /// ```
    #[must_use]
    pub fn try_add_range<I>(&self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let operation = "try_add_range";
        entries
            .into_iter()
            .enumerate()
            .fold(self.clone(), |map, (index, (key, value))| {
                match check_key(operation, &key).and_then(|()| check_value(operation, &value)) {
                    Ok(()) => map.try_add(key, value),
                    Err(error) => {
                        skip_entry(index, &error);
                        map
                    }
                }
            })
    }

    /// Inserts every entry in order, replacing existing values.
    ///
    /// # Panics
    ///
    /// Panics if any key or value is not [`Validity`]-valid.
    #[must_use]
    pub fn add_or_update_range<I>(&self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        entries
            .into_iter()
            .fold(self.clone(), |map, (key, value)| map.add_or_update(key, value))
    }

    /// Replaces the values of existing keys, in order.
    ///
    /// # Errors
    ///
    /// Fails on the first entry that [`set_item`](Self::set_item) would
    /// reject; no entry is applied in that case.
    pub fn set_items<I>(&self, entries: I) -> Result<Self, MapError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        entries
            .into_iter()
            .enumerate()
            .try_fold(self.clone(), |map, (index, (key, value))| {
                map.set_entry("set_items", &key, value).inspect_err(|_| {
                    tracing::debug!(index, "set_items aborted, no entries applied");
                })
            })
    }

    /// Replaces the values of existing keys, in order, skipping absent keys
    /// and entries whose key or value is not [`Validity`]-valid.
    #[must_use]
    pub fn try_set_items<I>(&self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let operation = "try_set_items";
        entries
            .into_iter()
            .enumerate()
            .fold(self.clone(), |map, (index, (key, value))| {
                let replaced = check_value(operation, &value)
                    .and_then(|()| map.replace_existing(operation, &key, |_| value));
                match replaced {
                    Ok(Some(next)) => next,
                    Ok(None) => map,
                    Err(error) => {
                        skip_entry(index, &error);
                        map
                    }
                }
            })
    }

    /// Applies `mapper` to the value of each listed key that exists.
    ///
    /// Absent keys, invalid keys and keys whose mapped value is invalid are
    /// skipped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map: OrderedMap<i32, i32> = (1..=3).map(|key| (key, key)).collect();
    /// let bumped = map.try_set_items_with([1, 3, 9], |value| value + 100);
    /// assert_eq!(bumped.values().collect::<Vec<_>>(), vec![&101, &2, &103]);
    /// ```
    #[must_use]
    pub fn try_set_items_with<I, F>(&self, keys: I, mut mapper: F) -> Self
    where
        I: IntoIterator,
        I::Item: Borrow<K>,
        F: FnMut(&V) -> V,
    {
        keys.into_iter()
            .enumerate()
            .fold(self.clone(), |map, (index, key)| {
                match map.replace_existing("try_set_items_with", key.borrow(), &mut mapper) {
                    Ok(Some(next)) => next,
                    Ok(None) => map,
                    Err(error) => {
                        skip_entry(index, &error);
                        map
                    }
                }
            })
    }

    /// Removes every listed key; absent and invalid keys are skipped.
    #[must_use]
    pub fn remove_range<I>(&self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Borrow<K>,
    {
        keys.into_iter()
            .enumerate()
            .fold(self.clone(), |map, (index, key)| {
                match check_key("remove_range", key.borrow()) {
                    Ok(()) => map.remove(key.borrow()),
                    Err(error) => {
                        skip_entry(index, &error);
                        map
                    }
                }
            })
    }

    // -------------------------------------------------------------------------
    // Whole-map Operations
    // -------------------------------------------------------------------------

    /// Returns every entry of both maps; on a shared key the value from
    /// `other` wins.
    ///
    /// Both maps are expected to order keys the same way. The result keeps
    /// this map's comparer and direction.
    ///
    /// # Complexity
    ///
    /// O(m log(n + m)) where m is the size of the smaller map
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let left = OrderedMap::new().try_add(1, "one").try_add(2, "two");
    /// let right = OrderedMap::new().try_add(2, "TWO").try_add(3, "three");
    ///
    /// let merged = left.union(&right);
    /// assert_eq!(merged.find(&2), Some(&"TWO"));
    /// assert_eq!(merged, &left + &right);
    /// ```
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let (root, length) = tree::union(
            (&self.root, self.length),
            (&other.root, other.length),
            &self.comparer,
        );
        self.derive(root, length)
    }

    /// Returns every entry of both maps, combining values of shared keys
    /// with `resolver(key, self_value, other_value)`.
    ///
    /// # Panics
    ///
    /// Panics if `resolver` produces an invalid value.
    #[must_use]
    pub fn union_with<F>(&self, other: &Self, mut resolver: F) -> Self
    where
        F: FnMut(&K, &V, &V) -> V,
    {
        Cursor::new(other.root.as_ref(), false).fold(self.clone(), |map, node| {
            let value = match map.find(&node.key) {
                Some(existing) => require(check_produced(
                    "union_with",
                    resolver(&node.key, existing, &node.value),
                )),
                None => node.value.clone(),
            };
            map.add_or_update(node.key.clone(), value)
        })
    }

    /// Returns the entries of this map whose keys are absent from `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let left = OrderedMap::new().try_add(1, "one").try_add(2, "two");
    /// let right = OrderedMap::new().try_add(1, "other").try_add(5, "five");
    ///
    /// let only_left = left.difference(&right);
    /// assert_eq!(only_left.keys().collect::<Vec<_>>(), vec![&2]);
    /// assert_eq!(only_left, &left - &right);
    /// ```
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        let (root, length) = tree::difference(
            (&self.root, self.length),
            (&other.root, other.length),
            &self.comparer,
        );
        self.derive(root, length)
    }

    /// Applies `transform` to every value, keeping keys and tree shape.
    ///
    /// # Panics
    ///
    /// Panics if `transform` produces an invalid value.
    ///
    /// # Complexity
    ///
    /// O(N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map = OrderedMap::new().try_add(1, 10).try_add(2, 20);
    /// let labels = map.map_values(|value| value.to_string());
    /// assert_eq!(labels.find(&2), Some(&"20".to_string()));
    /// ```
    #[must_use]
    pub fn map_values<W, F>(&self, mut transform: F) -> OrderedMap<K, W, C>
    where
        W: Clone + Validity,
        F: FnMut(&V) -> W,
    {
        let root = tree::map_values(self.root.as_ref(), &mut |_: &K, value: &V| {
            require(check_produced("map_values", transform(value)))
        });
        OrderedMap {
            root,
            length: self.length,
            reverse: self.reverse,
            comparer: self.comparer.clone(),
            hash: OnceLock::new(),
        }
    }

    /// Keeps only the entries for which `predicate` returns `true`.
    ///
    /// The survivors are rebuilt into a fresh balanced tree.
    ///
    /// # Complexity
    ///
    /// O(N)
    #[must_use]
    pub fn filter<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&K, &V) -> bool,
    {
        let kept: Vec<(K, V)> = Cursor::new(self.root.as_ref(), false)
            .filter(|node| predicate(&node.key, &node.value))
            .map(|node| (node.key.clone(), node.value.clone()))
            .collect();
        let length = kept.len();
        let root = tree::build_sorted(&mut kept.into_iter(), length);
        self.derive(root, length)
    }
}

impl<K, V> OrderedMap<K, V>
where
    K: Clone + Ord + Validity,
    V: Clone + Validity,
{
    /// Creates a map containing a single entry.
    ///
    /// # Panics
    ///
    /// Panics if `key` or `value` is not [`Validity`]-valid.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use avl_map::persistent::OrderedMap;
    ///
    /// let map = OrderedMap::singleton(42, "answer");
    /// assert_eq!(map.len(), 1);
    /// assert_eq!(map.find(&42), Some(&"answer"));
    /// ```
    #[inline]
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::new().add_or_update(key, value)
    }
}

// =============================================================================
// Operators
// =============================================================================

impl<K, V, C> Add<&OrderedMap<K, V, C>> for &OrderedMap<K, V, C>
where
    K: Clone + Validity,
    V: Clone + Validity,
    C: Comparer<K> + Clone,
{
    type Output = OrderedMap<K, V, C>;

    /// Union; the right-hand operand wins on shared keys.
    fn add(self, other: &OrderedMap<K, V, C>) -> Self::Output {
        self.union(other)
    }
}

impl<K, V, C> Add for OrderedMap<K, V, C>
where
    K: Clone + Validity,
    V: Clone + Validity,
    C: Comparer<K> + Clone,
{
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        self.union(&other)
    }
}

impl<K, V, C> Sub<&OrderedMap<K, V, C>> for &OrderedMap<K, V, C>
where
    K: Clone + Validity,
    V: Clone + Validity,
    C: Comparer<K> + Clone,
{
    type Output = OrderedMap<K, V, C>;

    /// Difference; keys of the right-hand operand are removed.
    fn sub(self, other: &OrderedMap<K, V, C>) -> Self::Output {
        self.difference(other)
    }
}

impl<K, V, C> Sub for OrderedMap<K, V, C>
where
    K: Clone + Validity,
    V: Clone + Validity,
    C: Comparer<K> + Clone,
{
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        self.difference(&other)
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V, C: Default> Default for OrderedMap<K, V, C> {
    #[inline]
    fn default() -> Self {
        Self::with_comparer(C::default())
    }
}

/// Builds a map from entries; a repeated key keeps its last value.
impl<K, V, C> FromIterator<(K, V)> for OrderedMap<K, V, C>
where
    K: Clone + Validity,
    V: Clone + Validity,
    C: Comparer<K> + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::default().add_or_update_range(iter)
    }
}

impl<K: Clone, V: Clone, C> IntoIterator for OrderedMap<K, V, C> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.root, self.length, self.reverse)
    }
}

impl<'a, K, V, C> IntoIterator for &'a OrderedMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Structural equality: the same keys (under the comparer) with equal
/// values, regardless of tree shape or enumeration direction.
impl<K, V: PartialEq, C: Comparer<K>> PartialEq for OrderedMap<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && tree::equals(&self.root, &other.root, &self.comparer)
    }
}

impl<K, V: Eq, C: Comparer<K>> Eq for OrderedMap<K, V, C> {}

impl<K, V: Hash, C> OrderedMap<K, V, C> {
    /// Hash of the length followed by every value in ascending key order,
    /// computed once per version.
    ///
    /// Keys are left out: equality matches them through the comparer, which
    /// need not agree with `K: Hash`.
    fn structural_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut hasher = DefaultHasher::new();
            self.length.hash(&mut hasher);
            for node in Cursor::new(self.root.as_ref(), false) {
                node.value.hash(&mut hasher);
            }
            hasher.finish()
        })
    }
}

/// Computes a hash value for this map.
///
/// Values are hashed in ascending key order, so maps built by different
/// insertion orders (and therefore different tree shapes) hash the same.
/// Keys contribute only through that order, so maps the comparer deems
/// equal always hash equal, whatever `K: Hash` would say.
/// The value is computed at most once per version and shared by clones.
///
/// # Examples
///
/// ```rust
/// use avl_map::persistent::OrderedMap;
/// use std::collections::HashMap;
///
/// let mut outer: HashMap<OrderedMap<i32, String>, &str> = HashMap::new();
/// let key = OrderedMap::new()
///     .try_add(1, "one".to_string())
///     .try_add(2, "two".to_string());
/// outer.insert(key.clone(), "value");
/// assert_eq!(outer.get(&key), Some(&"value"));
/// ```
impl<K, V: Hash, C> Hash for OrderedMap<K, V, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for OrderedMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display, C> fmt::Display for OrderedMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for (key, value) in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key}: {value}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K, V, C> serde::Serialize for OrderedMap<K, V, C>
where
    K: serde::Serialize,
    V: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct OrderedMapVisitor<K, V, C> {
    marker: std::marker::PhantomData<fn() -> OrderedMap<K, V, C>>,
}

#[cfg(feature = "serde")]
impl<'de, K, V, C> serde::de::Visitor<'de> for OrderedMapVisitor<K, V, C>
where
    K: serde::Deserialize<'de> + Clone + Validity,
    V: serde::Deserialize<'de> + Clone + Validity,
    C: Comparer<K> + Clone + Default,
{
    type Value = OrderedMap<K, V, C>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut map = OrderedMap::default();
        while let Some((key, value)) = access.next_entry::<K, V>()? {
            check_key("deserialize", &key)
                .and_then(|()| check_value("deserialize", &value))
                .map_err(<A::Error as serde::de::Error>::custom)?;
            map = map.add_or_update(key, value);
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, C> serde::Deserialize<'de> for OrderedMap<K, V, C>
where
    K: serde::Deserialize<'de> + Clone + Validity,
    V: serde::Deserialize<'de> + Clone + Validity,
    C: Comparer<K> + Clone + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(OrderedMapVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

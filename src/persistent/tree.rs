//! Purely functional AVL algorithms.
//!
//! Every function here takes the root of a tree and returns the root of a
//! new tree (or reports that nothing changed). Input nodes are never
//! modified: only the nodes on the path from the root to the change are
//! reallocated, and every subtree off that path is shared with the input.

use super::ReferenceCounter;
use super::iter::Cursor;
use super::node::{Link, Node, balance};
use crate::comparer::Comparer;
use crate::error::MapError;
use std::cmp::Ordering;

// =============================================================================
// Find
// =============================================================================

/// Binary search for `key`.
pub(crate) fn find<'a, K, V, C: Comparer<K>>(
    root: Option<&'a ReferenceCounter<Node<K, V>>>,
    key: &K,
    comparer: &C,
) -> Option<&'a V> {
    let mut current = root;
    while let Some(node) = current {
        match comparer.compare(key, &node.key) {
            Ordering::Less => current = node.left.as_ref(),
            Ordering::Greater => current = node.right.as_ref(),
            Ordering::Equal => return Some(&node.value),
        }
    }
    None
}

/// The leftmost node of a subtree.
pub(crate) fn first<K, V>(node: &Node<K, V>) -> &Node<K, V> {
    node.left.as_ref().map_or(node, |left| first(left))
}

/// The rightmost node of a subtree.
pub(crate) fn last<K, V>(node: &Node<K, V>) -> &Node<K, V> {
    node.right.as_ref().map_or(node, |right| last(right))
}

// =============================================================================
// Insert
// =============================================================================

/// What [`insert`] does when it meets the key already in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DuplicatePolicy {
    /// Report a collision carrying the existing value.
    Fail,
    /// Leave the tree unchanged.
    Keep,
    /// Replace the stored value.
    Replace,
}

/// The outcome of an insertion.
pub(crate) enum Insertion<'a, K, V> {
    /// A new entry was added; the tree grew by one.
    Added(ReferenceCounter<Node<K, V>>),
    /// An existing entry's value was replaced; the shape is unchanged.
    Replaced(ReferenceCounter<Node<K, V>>),
    /// The key exists and [`DuplicatePolicy::Keep`] left the tree alone.
    Unchanged,
    /// The key exists and [`DuplicatePolicy::Fail`] refused to touch it.
    Collision(&'a V),
}

/// Inserts `key` with `value`, resolving an existing key with `policy`.
///
/// A new leaf triggers a rebalance at every ancestor on the way back up.
/// A replaced value keeps the shape, so the path is copied as is.
pub(crate) fn insert<'a, K: Clone, V: Clone, C: Comparer<K>>(
    node: Option<&'a ReferenceCounter<Node<K, V>>>,
    key: K,
    value: V,
    policy: DuplicatePolicy,
    comparer: &C,
) -> Insertion<'a, K, V> {
    let Some(node) = node else {
        return Insertion::Added(ReferenceCounter::new(Node::leaf(key, value)));
    };

    match comparer.compare(&key, &node.key) {
        Ordering::Less => match insert(node.left.as_ref(), key, value, policy, comparer) {
            Insertion::Added(left) => Insertion::Added(balance(
                node.key.clone(),
                node.value.clone(),
                Some(left),
                node.right.clone(),
            )),
            Insertion::Replaced(left) => Insertion::Replaced(ReferenceCounter::new(
                node.with_children(Some(left), node.right.clone()),
            )),
            unchanged => unchanged,
        },
        Ordering::Greater => match insert(node.right.as_ref(), key, value, policy, comparer) {
            Insertion::Added(right) => Insertion::Added(balance(
                node.key.clone(),
                node.value.clone(),
                node.left.clone(),
                Some(right),
            )),
            Insertion::Replaced(right) => Insertion::Replaced(ReferenceCounter::new(
                node.with_children(node.left.clone(), Some(right)),
            )),
            unchanged => unchanged,
        },
        Ordering::Equal => match policy {
            DuplicatePolicy::Fail => Insertion::Collision(&node.value),
            DuplicatePolicy::Keep => Insertion::Unchanged,
            DuplicatePolicy::Replace => {
                Insertion::Replaced(ReferenceCounter::new(node.with_value(value)))
            }
        },
    }
}

// =============================================================================
// Update
// =============================================================================

/// Replaces the value at `key` with `mapper(existing)`.
///
/// Returns `Ok(None)` when the key is absent; the caller decides whether
/// that is an error, a no-op, or a reason to insert a default. The shape
/// never changes, so no rotation is needed.
pub(crate) fn update<K, V, C, F>(
    node: Option<&ReferenceCounter<Node<K, V>>>,
    key: &K,
    mapper: F,
    comparer: &C,
) -> Result<Option<ReferenceCounter<Node<K, V>>>, MapError>
where
    K: Clone,
    V: Clone,
    C: Comparer<K>,
    F: FnOnce(&V) -> Result<V, MapError>,
{
    let Some(node) = node else {
        return Ok(None);
    };

    let rebuilt = match comparer.compare(key, &node.key) {
        Ordering::Less => update(node.left.as_ref(), key, mapper, comparer)?
            .map(|left| node.with_children(Some(left), node.right.clone())),
        Ordering::Greater => update(node.right.as_ref(), key, mapper, comparer)?
            .map(|right| node.with_children(node.left.clone(), Some(right))),
        Ordering::Equal => Some(node.with_value(mapper(&node.value)?)),
    };

    Ok(rebuilt.map(ReferenceCounter::new))
}

// =============================================================================
// Remove
// =============================================================================

/// Removes `key`.
///
/// Returns `None` when the key is absent (the tree is unchanged), otherwise
/// the new root, which is itself `None` when the last entry was removed.
pub(crate) fn remove<K: Clone, V: Clone, C: Comparer<K>>(
    node: Option<&ReferenceCounter<Node<K, V>>>,
    key: &K,
    comparer: &C,
) -> Option<Link<K, V>> {
    let node = node?;

    match comparer.compare(key, &node.key) {
        Ordering::Less => remove(node.left.as_ref(), key, comparer).map(|left| {
            Some(balance(
                node.key.clone(),
                node.value.clone(),
                left,
                node.right.clone(),
            ))
        }),
        Ordering::Greater => remove(node.right.as_ref(), key, comparer).map(|right| {
            Some(balance(
                node.key.clone(),
                node.value.clone(),
                node.left.clone(),
                right,
            ))
        }),
        Ordering::Equal => Some(match (&node.left, &node.right) {
            (None, None) => None,
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (Some(left), Some(right)) => {
                // The in-order successor takes this node's place.
                let successor = first(right);
                Some(balance(
                    successor.key.clone(),
                    successor.value.clone(),
                    Some(left.clone()),
                    remove_first(right),
                ))
            }
        }),
    }
}

/// Removes the leftmost node of a non-empty subtree.
fn remove_first<K: Clone, V: Clone>(node: &ReferenceCounter<Node<K, V>>) -> Link<K, V> {
    match &node.left {
        None => node.right.clone(),
        Some(left) => Some(balance(
            node.key.clone(),
            node.value.clone(),
            remove_first(left),
            node.right.clone(),
        )),
    }
}

// =============================================================================
// Bulk Construction
// =============================================================================

/// Builds a tree from `count` entries already in ascending order.
///
/// Sibling subtrees differ in size by at most one entry, so the result is
/// balanced without any rotation.
pub(crate) fn build_sorted<K, V, I>(entries: &mut I, count: usize) -> Link<K, V>
where
    I: Iterator<Item = (K, V)>,
{
    if count == 0 {
        return None;
    }
    let left_count = count / 2;
    let left = build_sorted(entries, left_count);
    let Some((key, value)) = entries.next() else {
        return left;
    };
    let right = build_sorted(entries, count - left_count - 1);
    Some(ReferenceCounter::new(Node::new(key, value, left, right)))
}

/// Rebuilds a tree with every value transformed, keeping the exact shape.
pub(crate) fn map_values<K: Clone, V, W, F>(
    node: Option<&ReferenceCounter<Node<K, V>>>,
    transform: &mut F,
) -> Link<K, W>
where
    F: FnMut(&K, &V) -> W,
{
    node.map(|node| {
        let left = map_values(node.left.as_ref(), transform);
        let value = transform(&node.key, &node.value);
        let right = map_values(node.right.as_ref(), transform);
        ReferenceCounter::new(Node::new(node.key.clone(), value, left, right))
    })
}

// =============================================================================
// Set Operations
// =============================================================================

/// Merges two trees; on a shared key the value from `right` wins.
///
/// Walks whichever tree is smaller and inserts its entries into the larger
/// one, so the cost is O(m log(n + m)) for sizes `m <= n`. Returns the new
/// root and its entry count.
pub(crate) fn union<K: Clone, V: Clone, C: Comparer<K>>(
    (left, left_length): (&Link<K, V>, usize),
    (right, right_length): (&Link<K, V>, usize),
    comparer: &C,
) -> (Link<K, V>, usize) {
    let (mut root, mut length, smaller, policy) = if right_length <= left_length {
        (left.clone(), left_length, right, DuplicatePolicy::Replace)
    } else {
        (right.clone(), right_length, left, DuplicatePolicy::Keep)
    };

    for node in Cursor::new(smaller.as_ref(), false) {
        match insert(
            root.as_ref(),
            node.key.clone(),
            node.value.clone(),
            policy,
            comparer,
        ) {
            Insertion::Added(new_root) => {
                root = Some(new_root);
                length += 1;
            }
            Insertion::Replaced(new_root) => root = Some(new_root),
            Insertion::Unchanged | Insertion::Collision(_) => {}
        }
    }

    (root, length)
}

/// Removes from `left` every key present in `right`.
///
/// Walks whichever tree is smaller. Returns the new root and its entry
/// count.
pub(crate) fn difference<K: Clone, V: Clone, C: Comparer<K>>(
    (left, left_length): (&Link<K, V>, usize),
    (right, right_length): (&Link<K, V>, usize),
    comparer: &C,
) -> (Link<K, V>, usize) {
    let mut root = left.clone();
    let mut length = left_length;

    let doomed: Vec<&K> = if right_length <= left_length {
        Cursor::new(right.as_ref(), false)
            .map(|node| &node.key)
            .collect()
    } else {
        Cursor::new(left.as_ref(), false)
            .filter(|node| find(right.as_ref(), &node.key, comparer).is_some())
            .map(|node| &node.key)
            .collect()
    };

    for key in doomed {
        if let Some(new_root) = remove(root.as_ref(), key, comparer) {
            root = new_root;
            length -= 1;
        }
    }

    (root, length)
}

// =============================================================================
// Equality
// =============================================================================

/// Compares two trees by their key/value sets, ignoring shape.
///
/// The caller is expected to have compared entry counts already.
pub(crate) fn equals<K, V: PartialEq, C: Comparer<K>>(
    left: &Link<K, V>,
    right: &Link<K, V>,
    comparer: &C,
) -> bool {
    match (left, right) {
        (Some(left), Some(right)) if ReferenceCounter::ptr_eq(left, right) => true,
        _ => Cursor::new(left.as_ref(), false)
            .zip(Cursor::new(right.as_ref(), false))
            .all(|(left, right)| {
                comparer.compare(&left.key, &right.key).is_eq() && left.value == right.value
            }),
    }
}

// =============================================================================
// Tests
// =============================================================================

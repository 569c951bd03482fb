//! Lazy in-order traversal over AVL trees.
//!
//! Every iterator here walks the tree with an explicit stack of the nodes
//! whose subtrees are still pending. The stack never grows past the tree
//! height, so it lives inline for any realistic map.

use std::iter::FusedIterator;

use smallvec::SmallVec;

use super::ReferenceCounter;
use super::node::{Link, Node};
use crate::comparer::Comparer;

/// Inline capacity of traversal stacks; an AVL tree of height 48 already
/// holds more entries than fit in memory.
const STACK_CAPACITY: usize = 48;

// =============================================================================
// Cursor
// =============================================================================

/// Borrowing in-order walker shared by every public iterator.
pub(crate) struct Cursor<'a, K, V> {
    stack: SmallVec<[&'a Node<K, V>; STACK_CAPACITY]>,
    descending: bool,
}

impl<'a, K, V> Cursor<'a, K, V> {
    /// Starts at the first node in the chosen direction.
    pub(crate) fn new(root: Option<&'a ReferenceCounter<Node<K, V>>>, descending: bool) -> Self {
        let mut cursor = Self {
            stack: SmallVec::new(),
            descending,
        };
        cursor.push_spine(root);
        cursor
    }

    /// Starts at the first node not before `bound` in the chosen direction:
    /// the smallest key `>= bound` ascending, the largest key `<= bound`
    /// descending.
    pub(crate) fn seek<C: Comparer<K>>(
        root: Option<&'a ReferenceCounter<Node<K, V>>>,
        bound: &K,
        descending: bool,
        comparer: &C,
    ) -> Self {
        let mut cursor = Self {
            stack: SmallVec::new(),
            descending,
        };
        let mut current = root;
        while let Some(node) = current {
            let ordering = comparer.compare(&node.key, bound);
            let before_bound = if descending {
                ordering.is_gt()
            } else {
                ordering.is_lt()
            };
            if before_bound {
                current = cursor.far_child(node);
            } else {
                cursor.stack.push(node);
                current = cursor.near_child(node);
            }
        }
        cursor
    }

    /// The child visited first in this cursor's direction.
    const fn near_child(&self, node: &'a Node<K, V>) -> Option<&'a ReferenceCounter<Node<K, V>>> {
        if self.descending {
            node.right.as_ref()
        } else {
            node.left.as_ref()
        }
    }

    /// The child visited last in this cursor's direction.
    const fn far_child(&self, node: &'a Node<K, V>) -> Option<&'a ReferenceCounter<Node<K, V>>> {
        if self.descending {
            node.left.as_ref()
        } else {
            node.right.as_ref()
        }
    }

    fn push_spine(&mut self, mut current: Option<&'a ReferenceCounter<Node<K, V>>>) {
        while let Some(node) = current {
            self.stack.push(node);
            current = self.near_child(node);
        }
    }

    /// The node the next call to `next` will return.
    pub(crate) fn peek(&self) -> Option<&'a Node<K, V>> {
        self.stack.last().copied()
    }
}

impl<'a, K, V> Iterator for Cursor<'a, K, V> {
    type Item = &'a Node<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_spine(self.far_child(node));
        Some(node)
    }
}

impl<K, V> FusedIterator for Cursor<'_, K, V> {}

// =============================================================================
// Iter / Keys / Values
// =============================================================================

/// An iterator over the entries of an [`OrderedMap`](super::OrderedMap), in
/// the map's enumeration direction.
pub struct Iter<'a, K, V> {
    cursor: Cursor<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(root: &'a Link<K, V>, length: usize, descending: bool) -> Self {
        Self {
            cursor: Cursor::new(root.as_ref(), descending),
            remaining: length,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor.next()?;
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// An iterator over the keys of an [`OrderedMap`](super::OrderedMap).
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) const fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// An iterator over the values of an [`OrderedMap`](super::OrderedMap), in
/// key order.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) const fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}

// =============================================================================
// Range
// =============================================================================

/// An iterator over the entries whose keys lie within an inclusive range.
///
/// Created by [`OrderedMap::range`](super::OrderedMap::range). The first
/// entry is located in O(log N); each further entry costs amortized O(1).
pub struct Range<'a, K, V, C> {
    cursor: Cursor<'a, K, V>,
    /// The last key admitted in the traversal direction.
    end: K,
    comparer: &'a C,
    finished: bool,
}

impl<'a, K, V, C: Comparer<K>> Range<'a, K, V, C> {
    /// `low` and `high` are inclusive; an inverted range yields nothing.
    pub(crate) fn new(
        root: &'a Link<K, V>,
        low: K,
        high: K,
        descending: bool,
        comparer: &'a C,
    ) -> Self {
        let finished = comparer.compare(&low, &high).is_gt();
        let (start, end) = if descending { (high, low) } else { (low, high) };
        Self {
            cursor: Cursor::seek(root.as_ref(), &start, descending, comparer),
            end,
            comparer,
            finished,
        }
    }
}

impl<'a, K, V, C: Comparer<K>> Iterator for Range<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let Some(node) = self.cursor.peek() else {
            self.finished = true;
            return None;
        };
        let ordering = self.comparer.compare(&node.key, &self.end);
        let past_end = if self.cursor.descending {
            ordering.is_lt()
        } else {
            ordering.is_gt()
        };
        if past_end {
            self.finished = true;
            return None;
        }
        self.cursor.next();
        Some((&node.key, &node.value))
    }
}

impl<K, V, C: Comparer<K>> FusedIterator for Range<'_, K, V, C> {}

// =============================================================================
// IntoIter
// =============================================================================

/// An owning iterator over the entries of an
/// [`OrderedMap`](super::OrderedMap).
///
/// Holds shared handles to the pending nodes, so it keeps only the part of
/// the tree it has not yet visited alive, and clones each entry as it goes.
pub struct IntoIter<K, V> {
    stack: SmallVec<[ReferenceCounter<Node<K, V>>; STACK_CAPACITY]>,
    descending: bool,
    remaining: usize,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(root: Link<K, V>, length: usize, descending: bool) -> Self {
        let mut iterator = Self {
            stack: SmallVec::new(),
            descending,
            remaining: length,
        };
        iterator.push_spine(root);
        iterator
    }

    fn push_spine(&mut self, mut current: Link<K, V>) {
        while let Some(node) = current {
            current = if self.descending {
                node.right.clone()
            } else {
                node.left.clone()
            };
            self.stack.push(node);
        }
    }
}

impl<K: Clone, V: Clone> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let far = if self.descending {
            node.left.clone()
        } else {
            node.right.clone()
        };
        self.push_spine(far);
        self.remaining = self.remaining.saturating_sub(1);
        Some((node.key.clone(), node.value.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Clone, V: Clone> ExactSizeIterator for IntoIter<K, V> {}

impl<K: Clone, V: Clone> FusedIterator for IntoIter<K, V> {}

// =============================================================================
// Tests
// =============================================================================

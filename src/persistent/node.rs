//! Immutable AVL nodes and the balancer that keeps them in shape.
//!
//! A node is never written after construction. Rebalancing allocates a
//! replacement for every node on the rotated path and hands every untouched
//! subtree to the replacement by shared reference.
//!
//! Heights are cached per node: an absent child has height 0 and a leaf has
//! height 1. Every node produced by [`balance`] satisfies
//! `|height(left) - height(right)| <= 1` provided its children already do and
//! their heights differ by at most 2.

use super::ReferenceCounter;

/// An optional shared handle to a subtree.
pub(crate) type Link<K, V> = Option<ReferenceCounter<Node<K, V>>>;

// =============================================================================
// Node Definition
// =============================================================================

/// Internal node structure for the AVL tree.
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) left: Link<K, V>,
    pub(crate) right: Link<K, V>,
    pub(crate) height: u32,
}

impl<K, V> Node<K, V> {
    /// Creates a node over the given children, computing its height.
    pub(crate) fn new(key: K, value: V, left: Link<K, V>, right: Link<K, V>) -> Self {
        let height = 1 + height(left.as_ref()).max(height(right.as_ref()));
        Self {
            key,
            value,
            left,
            right,
            height,
        }
    }

    /// Creates a node with no children.
    pub(crate) const fn leaf(key: K, value: V) -> Self {
        Self {
            key,
            value,
            left: None,
            right: None,
            height: 1,
        }
    }

    /// Creates a copy of this node holding a different value.
    pub(crate) fn with_value(&self, value: V) -> Self
    where
        K: Clone,
    {
        Self {
            key: self.key.clone(),
            value,
            left: self.left.clone(),
            right: self.right.clone(),
            height: self.height,
        }
    }

    /// Creates a copy of this node with new children.
    pub(crate) fn with_children(&self, left: Link<K, V>, right: Link<K, V>) -> Self
    where
        K: Clone,
        V: Clone,
    {
        Self::new(self.key.clone(), self.value.clone(), left, right)
    }
}

/// Height of an optional subtree.
#[inline]
pub(crate) fn height<K, V>(node: Option<&ReferenceCounter<Node<K, V>>>) -> u32 {
    node.map_or(0, |node| node.height)
}

/// `height(left) - height(right)` for the given node.
#[inline]
pub(crate) fn balance_factor<K, V>(node: &Node<K, V>) -> i64 {
    i64::from(height(node.left.as_ref())) - i64::from(height(node.right.as_ref()))
}

// =============================================================================
// Balancer
// =============================================================================

/// Builds a node from its parts, rotating if the children are out of balance.
///
/// A left-heavy node whose left child leans left (or is even) gets a single
/// right rotation; one whose left child leans right gets a left-right double
/// rotation. The right-heavy cases mirror this.
pub(crate) fn balance<K: Clone, V: Clone>(
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
) -> ReferenceCounter<Node<K, V>> {
    let factor = i64::from(height(left.as_ref())) - i64::from(height(right.as_ref()));

    if factor > 1
        && let Some(heavy) = &left
    {
        return if balance_factor(heavy) >= 0 {
            rotate_right(key, value, heavy, right)
        } else {
            rotate_left_right(key, value, heavy, right)
        };
    }

    if factor < -1
        && let Some(heavy) = &right
    {
        return if balance_factor(heavy) <= 0 {
            rotate_left(key, value, left, heavy)
        } else {
            rotate_right_left(key, value, left, heavy)
        };
    }

    ReferenceCounter::new(Node::new(key, value, left, right))
}

/// Single right rotation: the left child becomes the subtree root.
fn rotate_right<K: Clone, V: Clone>(
    key: K,
    value: V,
    left: &Node<K, V>,
    right: Link<K, V>,
) -> ReferenceCounter<Node<K, V>> {
    let new_right = Node::new(key, value, left.right.clone(), right);
    ReferenceCounter::new(Node::new(
        left.key.clone(),
        left.value.clone(),
        left.left.clone(),
        Some(ReferenceCounter::new(new_right)),
    ))
}

/// Single left rotation: the right child becomes the subtree root.
fn rotate_left<K: Clone, V: Clone>(
    key: K,
    value: V,
    left: Link<K, V>,
    right: &Node<K, V>,
) -> ReferenceCounter<Node<K, V>> {
    let new_left = Node::new(key, value, left, right.left.clone());
    ReferenceCounter::new(Node::new(
        right.key.clone(),
        right.value.clone(),
        Some(ReferenceCounter::new(new_left)),
        right.right.clone(),
    ))
}

/// Left-right double rotation: the left child's right child becomes the
/// subtree root.
fn rotate_left_right<K: Clone, V: Clone>(
    key: K,
    value: V,
    left: &Node<K, V>,
    right: Link<K, V>,
) -> ReferenceCounter<Node<K, V>> {
    let Some(pivot) = &left.right else {
        return rotate_right(key, value, left, right);
    };

    let new_left = Node::new(
        left.key.clone(),
        left.value.clone(),
        left.left.clone(),
        pivot.left.clone(),
    );
    let new_right = Node::new(key, value, pivot.right.clone(), right);

    ReferenceCounter::new(Node::new(
        pivot.key.clone(),
        pivot.value.clone(),
        Some(ReferenceCounter::new(new_left)),
        Some(ReferenceCounter::new(new_right)),
    ))
}

/// Right-left double rotation: the right child's left child becomes the
/// subtree root.
fn rotate_right_left<K: Clone, V: Clone>(
    key: K,
    value: V,
    left: Link<K, V>,
    right: &Node<K, V>,
) -> ReferenceCounter<Node<K, V>> {
    let Some(pivot) = &right.left else {
        return rotate_left(key, value, left, right);
    };

    let new_left = Node::new(key, value, left, pivot.left.clone());
    let new_right = Node::new(
        right.key.clone(),
        right.value.clone(),
        pivot.right.clone(),
        right.right.clone(),
    );

    ReferenceCounter::new(Node::new(
        pivot.key.clone(),
        pivot.value.clone(),
        Some(ReferenceCounter::new(new_left)),
        Some(ReferenceCounter::new(new_right)),
    ))
}

// =============================================================================
// Tests
// =============================================================================

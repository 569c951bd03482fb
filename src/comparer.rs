//! Ordering strategies for ordered maps.
//!
//! An [`OrderedMap`](crate::persistent::OrderedMap) never resolves its key
//! ordering through the key type alone. The ordering rule is an explicit,
//! immutable value supplied once when the empty map is created, and every
//! version derived from that map carries the same rule.
//!
//! - [`NaturalOrder`]: the key type's own [`Ord`] (the default)
//! - [`ReverseOrder`]: the key type's [`Ord`], reversed
//! - [`FnComparer`]: any `Fn(&K, &K) -> Ordering`, built with [`by`]
//!
//! # Laws
//!
//! A comparer must be a total order:
//!
//! ```text
//! compare(a, b) == compare(b, a).reverse()
//! compare(a, b) == Less && compare(b, c) == Less  =>  compare(a, c) == Less
//! ```
//!
//! # Examples
//!
//! ```rust
//! use avl_map::comparer::{Comparer, NaturalOrder, by};
//! use std::cmp::Ordering;
//!
//! assert_eq!(NaturalOrder.compare(&1, &2), Ordering::Less);
//!
//! let by_length = by(|left: &&str, right: &&str| left.len().cmp(&right.len()));
//! assert_eq!(by_length.compare(&"ccc", &"a"), Ordering::Greater);
//! ```

use std::cmp::Ordering;
use std::fmt;

/// A total order over keys of type `K`.
pub trait Comparer<K> {
    /// Compares two keys.
    fn compare(&self, left: &K, right: &K) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NaturalOrder;

impl<K: Ord> Comparer<K> for NaturalOrder {
    #[inline]
    fn compare(&self, left: &K, right: &K) -> Ordering {
        left.cmp(right)
    }
}

/// Orders keys by the reverse of their [`Ord`] implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ReverseOrder;

impl<K: Ord> Comparer<K> for ReverseOrder {
    #[inline]
    fn compare(&self, left: &K, right: &K) -> Ordering {
        right.cmp(left)
    }
}

/// Orders keys with a caller-supplied function.
///
/// Construct one with [`by`].
#[derive(Clone, Copy)]
pub struct FnComparer<F> {
    function: F,
}

impl<F> fmt::Debug for FnComparer<F> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("FnComparer")
    }
}

impl<K, F> Comparer<K> for FnComparer<F>
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, left: &K, right: &K) -> Ordering {
        (self.function)(left, right)
    }
}

/// Wraps an ordering function as a [`Comparer`].
///
/// # Examples
///
/// ```rust
/// use avl_map::comparer::by;
/// use avl_map::persistent::OrderedMap;
///
/// let map = OrderedMap::with_comparer(by(|left: &i32, right: &i32| {
///     left.abs().cmp(&right.abs())
/// }))
/// .try_add(-3, "minus three")
/// .try_add(1, "one")
/// .try_add(2, "two");
///
/// let keys: Vec<&i32> = map.keys().collect();
/// assert_eq!(keys, vec![&1, &2, &-3]);
/// ```
pub const fn by<F>(function: F) -> FnComparer<F> {
    FnComparer { function }
}

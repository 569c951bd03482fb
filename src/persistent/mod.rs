//! Persistent (immutable) ordered map.
//!
//! This module provides [`OrderedMap`], a persistent AVL tree that uses
//! structural sharing to minimize copying: every operation that "changes" a
//! map returns a new version, replacing only the O(log N) nodes on the path
//! to the affected key and sharing every other subtree with the original.
//!
//! # Structural Sharing
//!
//! Old versions stay valid and unchanged for as long as they are held, and
//! any number of versions may coexist. With the `arc` feature (the default)
//! nodes are shared through `Arc`, so versions can be read from several
//! threads at once without locking.
//!
//! # Examples
//!
//! ```rust
//! use avl_map::persistent::OrderedMap;
//!
//! let map = OrderedMap::new()
//!     .try_add(3, "three")
//!     .try_add(1, "one")
//!     .try_add(2, "two");
//! assert_eq!(map.find(&2), Some(&"two"));
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.remove(&2);
//! assert_eq!(map.len(), 3);     // Original unchanged
//! assert_eq!(updated.len(), 2); // New version
//!
//! // Range queries are inclusive at both ends
//! let keys: Vec<&i32> = map.range(&1, &2).map(|(key, _)| key).collect();
//! assert_eq!(keys, vec![&1, &2]);
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled (default), this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled, this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod iter;
mod node;
mod ordered_map;
mod tree;

pub use iter::IntoIter;
pub use iter::Iter;
pub use iter::Keys;
pub use iter::Range;
pub use iter::Values;
pub use ordered_map::OrderedMap;

// =============================================================================
// Tests
// =============================================================================

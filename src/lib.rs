//! # avl-map
//!
//! A persistent (immutable) ordered map for Rust, built on an AVL tree with
//! path copying and structural sharing.
//!
//! ## Overview
//!
//! Every operation that "changes" an [`OrderedMap`](persistent::OrderedMap)
//! returns a new version and leaves the receiver untouched. Versions share
//! every subtree the operation did not touch, so an update costs O(log N)
//! time and allocation no matter how many versions are alive.
//!
//! - **Persistent Map**: [`persistent::OrderedMap`] with strict and lenient
//!   variants of every insert and update
//! - **Ordering Strategies**: [`comparer::NaturalOrder`],
//!   [`comparer::ReverseOrder`] and closures via [`comparer::by`]
//! - **Missing-value Detection**: [`validity::Validity`] rejects sentinel
//!   keys and values such as `None` or `NaN`
//! - **Errors**: [`error::MapError`] for strict operations
//!
//! ## Feature Flags
//!
//! - `arc` (default): share nodes through `Arc` so maps are `Send + Sync`
//! - `serde`: `Serialize`/`Deserialize` for `OrderedMap`
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use avl_map::prelude::*;
//!
//! let prices = OrderedMap::new()
//!     .add("pear", 3)?
//!     .add("apple", 2)?
//!     .add("fig", 5)?;
//!
//! let raised = prices.set_item_with(&"fig", |price| price + 1)?;
//!
//! assert_eq!(prices.find(&"fig"), Some(&5));
//! assert_eq!(raised.find(&"fig"), Some(&6));
//! assert_eq!(
//!     raised.keys().collect::<Vec<_>>(),
//!     vec![&"apple", &"fig", &"pear"]
//! );
//! # Ok::<(), MapError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use avl_map::prelude::*;
/// ```
pub mod prelude {
    pub use crate::comparer::*;
    pub use crate::error::*;
    pub use crate::persistent::*;
    pub use crate::validity::*;
}

pub mod comparer;
pub mod error;
pub mod persistent;
pub mod validity;

//! Validity type class - values that may carry a "no value" sentinel.
//!
//! Keys and values stored in an [`OrderedMap`](crate::persistent::OrderedMap)
//! must be present. Most Rust types cannot express absence at all, so they
//! are always valid. A few types do carry a sentinel:
//!
//! - `Option<T>` is missing when it is `None`
//! - `f32` and `f64` are missing when they are NaN (NaN also has no place
//!   in a total order)
//!
//! The map checks validity at its boundary, before any tree is touched.
//!
//! # Laws
//!
//! ## Stability
//!
//! ```text
//! x.is_valid() == x.clone().is_valid()
//! ```
//!
//! # Examples
//!
//! ```rust
//! use avl_map::validity::Validity;
//!
//! assert!(42.is_valid());
//! assert!("text".is_valid());
//! assert!(Some(1).is_valid());
//! assert!(!None::<i32>.is_valid());
//! assert!(!f64::NAN.is_valid());
//!
//! // User types opt in with an empty impl.
//! struct UserId(u64);
//! impl Validity for UserId {}
//! assert!(UserId(7).is_valid());
//! ```

use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

/// A type class for values that can be checked for presence.
///
/// The default method reports every value as valid; only types with a
/// genuine "no value" representation override it.
pub trait Validity {
    /// Returns `false` if this value is the "no value" sentinel of its type.
    fn is_valid(&self) -> bool {
        true
    }
}

// =============================================================================
// Always-valid Implementations
// =============================================================================

macro_rules! always_valid {
    ($($type:ty),* $(,)?) => {
        $(impl Validity for $type {})*
    };
}

always_valid!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    str,
    String,
);

impl<T: Validity + ?Sized> Validity for &T {
    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }
}

impl<T: Validity + ?Sized> Validity for Box<T> {
    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }
}

impl<T: Validity + ?Sized> Validity for Rc<T> {
    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }
}

impl<T: Validity + ?Sized> Validity for Arc<T> {
    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }
}

impl<T: Validity + ToOwned + ?Sized> Validity for Cow<'_, T> {
    fn is_valid(&self) -> bool {
        self.as_ref().is_valid()
    }
}

// Collections are present even when empty; their elements are not checked.
impl<T> Validity for Vec<T> {}

impl<T> Validity for [T] {}

// =============================================================================
// Sentinel-carrying Implementations
// =============================================================================

impl<T: Validity> Validity for Option<T> {
    fn is_valid(&self) -> bool {
        self.as_ref().is_some_and(Validity::is_valid)
    }
}

impl Validity for f32 {
    fn is_valid(&self) -> bool {
        !self.is_nan()
    }
}

impl Validity for f64 {
    fn is_valid(&self) -> bool {
        !self.is_nan()
    }
}

// =============================================================================
// Tuple Implementations
// =============================================================================

impl<A: Validity, B: Validity> Validity for (A, B) {
    fn is_valid(&self) -> bool {
        self.0.is_valid() && self.1.is_valid()
    }
}

impl<A: Validity, B: Validity, C: Validity> Validity for (A, B, C) {
    fn is_valid(&self) -> bool {
        self.0.is_valid() && self.1.is_valid() && self.2.is_valid()
    }
}

impl<A: Validity, B: Validity, C: Validity, D: Validity> Validity for (A, B, C, D) {
    fn is_valid(&self) -> bool {
        self.0.is_valid() && self.1.is_valid() && self.2.is_valid() && self.3.is_valid()
    }
}

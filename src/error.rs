//! Error types for ordered map operations.
//!
//! Every failure is synchronous and local to the offending key. A failed
//! call never produces a partially modified map: the receiver is left
//! exactly as it was, and the caller still owns it.

use std::fmt;

/// Represents errors that can occur when operating on an
/// [`OrderedMap`](crate::persistent::OrderedMap).
///
/// # Examples
///
/// ```rust
/// use avl_map::error::MapError;
/// use avl_map::persistent::OrderedMap;
///
/// let map = OrderedMap::new().add("a", 1).unwrap();
/// let error = map.add("a", 99).unwrap_err();
///
/// assert_eq!(error, MapError::KeyExists { operation: "add" });
/// assert_eq!(format!("{error}"), "add: key already exists");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// A required key or value was the "no value" sentinel of its type.
    ValueMissing {
        /// The operation that rejected the argument.
        operation: &'static str,
        /// Which argument was missing (`"key"` or `"value"`).
        argument: &'static str,
    },
    /// A strict insertion found the key already present.
    KeyExists {
        /// The operation that failed.
        operation: &'static str,
    },
    /// A strict update targeted a key that is not present.
    KeyNotFound {
        /// The operation that failed.
        operation: &'static str,
    },
    /// A caller-supplied value transform produced the "no value" sentinel.
    MapperProducedInvalidValue {
        /// The operation whose mapper misbehaved.
        operation: &'static str,
    },
}

impl MapError {
    /// Returns the name of the operation that failed.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::ValueMissing { operation, .. }
            | Self::KeyExists { operation }
            | Self::KeyNotFound { operation }
            | Self::MapperProducedInvalidValue { operation } => operation,
        }
    }
}

impl fmt::Display for MapError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValueMissing {
                operation,
                argument,
            } => write!(formatter, "{operation}: required {argument} is missing"),
            Self::KeyExists { operation } => write!(formatter, "{operation}: key already exists"),
            Self::KeyNotFound { operation } => write!(formatter, "{operation}: key not found"),
            Self::MapperProducedInvalidValue { operation } => write!(
                formatter,
                "{operation}: mapper produced a missing value"
            ),
        }
    }
}

impl std::error::Error for MapError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        MapError::ValueMissing { operation: "add", argument: "key" },
        "add: required key is missing"
    )]
    #[case(MapError::KeyExists { operation: "add_range" }, "add_range: key already exists")]
    #[case(MapError::KeyNotFound { operation: "set_item" }, "set_item: key not found")]
    #[case(
        MapError::MapperProducedInvalidValue { operation: "set_item_with" },
        "set_item_with: mapper produced a missing value"
    )]
    fn test_map_error_display(#[case] error: MapError, #[case] expected: &str) {
        assert_eq!(format!("{error}"), expected);
    }

    #[rstest]
    fn test_map_error_operation() {
        let error = MapError::ValueMissing {
            operation: "try_add",
            argument: "value",
        };
        assert_eq!(error.operation(), "try_add");
    }

    #[rstest]
    fn test_map_error_is_std_error() {
        let error: Box<dyn std::error::Error> = Box::new(MapError::KeyNotFound {
            operation: "set_items",
        });
        assert_eq!(error.to_string(), "set_items: key not found");
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for storage engines.

use std::fmt::Debug;

use crate::ByteView;

/// Trait for storage engine implementations.
///
/// A store maps string keys to [`ByteView`]s, typically under a size budget enforced by an
/// eviction policy of the implementation's choosing. Implementations must be internally
/// synchronized: the cache calls them concurrently from many threads without any locking of
/// its own, and the last `add` for a key wins.
///
/// Operations are infallible. A store that can fail internally should report a miss from
/// `get` and drop the value in `add`.
///
/// Only `len`, `weighted_size` and `is_empty` have default implementations:
/// - `len`: Returns `None` (not all stores track size)
/// - `weighted_size`: Returns `None`
/// - `is_empty`: Delegates to `len`
pub trait Store: Send + Sync + Debug {
    /// Returns the value stored under `key`, if present.
    fn get(&self, key: &str) -> Option<ByteView>;

    /// Stores `value` under `key`, replacing any previous value.
    fn add(&self, key: &str, value: ByteView);

    /// Removes the value stored under `key`, if present.
    fn remove(&self, key: &str);

    /// Removes all values.
    fn clear(&self);

    /// Returns the number of entries, if supported.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns the total weight (in bytes) of all entries, if supported.
    fn weighted_size(&self) -> Option<u64> {
        None
    }

    /// Returns `true` if the store contains no entries.
    ///
    /// Returns `None` for implementations that don't track size.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }
}

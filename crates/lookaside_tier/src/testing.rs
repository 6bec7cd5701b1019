// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock store implementation for testing.
//!
//! This module provides `MockStore`, an unbounded in-memory store that records every
//! operation so tests can verify exactly how a cache talks to its storage engine.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{ByteView, Store};

/// Recorded store operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// A get operation was performed with the given key.
    Get(String),
    /// An add operation was performed with the given key and value.
    Add {
        /// The key that was added.
        key: String,
        /// The value that was added.
        value: ByteView,
    },
    /// A remove operation was performed with the given key.
    Remove(String),
    /// A clear operation was performed.
    Clear,
}

/// A recording mock store for testing.
///
/// Clones share the same data and operation log, so a test can hand one clone to the code
/// under test and inspect the other.
///
/// # Examples
///
/// ```
/// use lookaside_tier::testing::{MockStore, StoreOp};
/// use lookaside_tier::{ByteView, Store};
///
/// let store = MockStore::new();
/// store.add("key", ByteView::from("value"));
/// assert!(store.get("key").is_some());
///
/// assert_eq!(store.operations(), vec![
///     StoreOp::Add { key: "key".to_string(), value: ByteView::from("value") },
///     StoreOp::Get("key".to_string()),
/// ]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    data: Arc<Mutex<HashMap<String, ByteView>>>,
    operations: Arc<Mutex<Vec<StoreOp>>>,
}

impl MockStore {
    /// Creates a new empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock store with pre-populated data. Pre-population is not recorded.
    #[must_use]
    pub fn with_data<I, K, V>(data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ByteView>,
    {
        Self {
            data: Arc::new(Mutex::new(data.into_iter().map(|(k, v)| (k.into(), v.into())).collect())),
            operations: Arc::default(),
        }
    }

    /// Returns true if the store contains the given key. Not recorded.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().clone()
    }

    /// Returns the number of recorded `Add` operations.
    #[must_use]
    pub fn add_count(&self) -> usize {
        self.operations.lock().iter().filter(|op| matches!(op, StoreOp::Add { .. })).count()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: StoreOp) {
        self.operations.lock().push(op);
    }
}

impl Store for MockStore {
    fn get(&self, key: &str) -> Option<ByteView> {
        self.record(StoreOp::Get(key.to_owned()));
        self.data.lock().get(key).cloned()
    }

    fn add(&self, key: &str, value: ByteView) {
        self.record(StoreOp::Add {
            key: key.to_owned(),
            value: value.clone(),
        });
        self.data.lock().insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) {
        self.record(StoreOp::Remove(key.to_owned()));
        self.data.lock().remove(key);
    }

    fn clear(&self) {
        self.record(StoreOp::Clear);
        self.data.lock().clear();
    }

    fn len(&self) -> Option<u64> {
        u64::try_from(self.data.lock().len()).ok()
    }

    fn weighted_size(&self) -> Option<u64> {
        let total: usize = self.data.lock().iter().map(|(k, v)| k.len() + v.len()).sum();
        u64::try_from(total).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_operations_in_order() {
        let store = MockStore::new();

        store.add("a", ByteView::from("1"));
        assert_eq!(store.get("a"), Some(ByteView::from("1")));
        store.remove("a");
        assert_eq!(store.get("a"), None);
        store.clear();

        assert_eq!(
            store.operations(),
            vec![
                StoreOp::Add {
                    key: "a".to_string(),
                    value: ByteView::from("1"),
                },
                StoreOp::Get("a".to_string()),
                StoreOp::Remove("a".to_string()),
                StoreOp::Get("a".to_string()),
                StoreOp::Clear,
            ]
        );
    }

    #[test]
    fn with_data_prepopulates_without_recording() {
        let store = MockStore::with_data([("Tom", "630"), ("Jack", "589")]);

        assert!(store.contains_key("Tom"));
        assert_eq!(store.len(), Some(2));
        assert_eq!(store.weighted_size(), Some(13));
        assert!(store.operations().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let store = MockStore::new();
        let clone = store.clone();

        clone.add("k", ByteView::from("v"));

        assert!(store.contains_key("k"));
        assert_eq!(store.add_count(), 1);
        store.clear_operations();
        assert!(clone.operations().is_empty());
        assert_eq!(store.is_empty(), Some(false));
    }
}

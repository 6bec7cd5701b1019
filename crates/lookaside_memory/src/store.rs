// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory store implementation using moka.

use std::fmt::{self, Debug};

use lookaside_tier::{ByteView, Store};
use moka::sync::Cache;

use crate::builder::MemoryStoreBuilder;

/// A byte-bounded in-memory store backed by moka.
///
/// Clones share the same underlying cache.
///
/// # Examples
///
/// ```
/// use lookaside_memory::MemoryStore;
/// use lookaside_tier::{ByteView, Store};
///
/// let store = MemoryStore::new();
///
/// store.add("key", ByteView::from("value"));
/// assert_eq!(store.get("key"), Some(ByteView::from("value")));
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    inner: Cache<String, ByteView>,
    max_bytes: Option<u64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates a new unbounded in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new in-memory store bounded to `max_bytes` (zero means unbounded).
    #[must_use]
    pub fn with_max_bytes(max_bytes: u64) -> Self {
        Self::builder().max_bytes(max_bytes).build()
    }

    /// Creates a new builder for configuring an in-memory store.
    #[must_use]
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::new()
    }

    pub(crate) fn from_builder(builder: &MemoryStoreBuilder) -> Self {
        let mut moka_builder = Cache::builder().weigher(weigh);

        if let Some(max_bytes) = builder.max_bytes {
            moka_builder = moka_builder.max_capacity(max_bytes);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: moka_builder.build(),
            max_bytes: builder.max_bytes,
        }
    }

    /// Returns the byte budget, or `None` if the store is unbounded.
    #[must_use]
    pub fn max_bytes(&self) -> Option<u64> {
        self.max_bytes
    }

    /// Returns the name given to the store, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name()
    }

    /// Applies pending evictions and bookkeeping immediately.
    pub fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks();
    }
}

/// Weight of an entry: key bytes plus value bytes, saturating at `u32::MAX`.
#[expect(clippy::ptr_arg, reason = "signature is dictated by the moka weigher")]
fn weigh(key: &String, value: &ByteView) -> u32 {
    u32::try_from(key.len().saturating_add(value.len())).unwrap_or(u32::MAX)
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<ByteView> {
        self.inner.get(key)
    }

    fn add(&self, key: &str, value: ByteView) {
        self.inner.insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) {
        self.inner.invalidate(key);
    }

    fn clear(&self) {
        self.inner.invalidate_all();
    }

    fn len(&self) -> Option<u64> {
        Some(self.inner.entry_count())
    }

    fn weighted_size(&self) -> Option<u64> {
        Some(self.inner.weighted_size())
    }
}

impl Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("name", &self.name())
            .field("max_bytes", &self.max_bytes)
            .field("entry_count", &self.inner.entry_count())
            .field("weighted_size", &self.inner.weighted_size())
            .finish()
    }
}

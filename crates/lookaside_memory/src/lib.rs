// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Bounded in-memory storage engine backed by moka.
//!
//! This crate provides [`MemoryStore`], a concurrent in-memory [`Store`](lookaside_tier::Store)
//! bounded by a byte budget. Each entry weighs the length of its key plus the length of its
//! value; once the total weight exceeds the budget, moka's `TinyLFU` policy (LFU admission,
//! LRU eviction) decides what to drop. Use [`MemoryStoreBuilder`] to configure the store
//! without exposing moka types.
//!
//! # Quick Start
//!
//! ```
//! use lookaside_memory::MemoryStore;
//! use lookaside_tier::{ByteView, Store};
//!
//! let store = MemoryStore::with_max_bytes(2 << 10);
//!
//! store.add("Tom", ByteView::from("630"));
//! assert_eq!(store.get("Tom").unwrap().to_string(), "630");
//! ```
//!
//! # Eviction Timing
//!
//! Moka applies evictions in batches during later operations. Call
//! [`MemoryStore::run_pending_tasks`] to apply them immediately, for example in tests.

pub mod builder;
pub mod store;

#[doc(inline)]
pub use builder::MemoryStoreBuilder;
#[doc(inline)]
pub use store::MemoryStore;

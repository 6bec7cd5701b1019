// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Core abstractions shared by the lookaside cache and its storage engines.
//!
//! This crate defines [`ByteView`], the immutable handle over cached bytes, and the [`Store`]
//! trait that every storage engine must satisfy.
//!
//! # Implementing a Store
//!
//! A store is a bounded key-value map that is safe to call from many threads at once. The
//! cache group performs no locking of its own around store calls.
//!
//! ```
//! use lookaside_tier::{ByteView, Store};
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! #[derive(Debug, Default)]
//! struct UnboundedStore(RwLock<HashMap<String, ByteView>>);
//!
//! impl Store for UnboundedStore {
//!     fn get(&self, key: &str) -> Option<ByteView> {
//!         self.0.read().unwrap().get(key).cloned()
//!     }
//!
//!     fn add(&self, key: &str, value: ByteView) {
//!         self.0.write().unwrap().insert(key.to_owned(), value);
//!     }
//!
//!     fn remove(&self, key: &str) {
//!         self.0.write().unwrap().remove(key);
//!     }
//!
//!     fn clear(&self) {
//!         self.0.write().unwrap().clear();
//!     }
//! }
//!
//! let store = UnboundedStore::default();
//! store.add("Tom", ByteView::from("630"));
//! assert_eq!(store.get("Tom").unwrap().to_string(), "630");
//! ```

mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
mod view;

#[doc(inline)]
pub use store::Store;
#[doc(inline)]
pub use view::ByteView;

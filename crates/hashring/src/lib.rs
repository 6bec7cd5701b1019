// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Consistent hashing with virtual nodes.
//!
//! This crate provides [`Ring`], which maps arbitrary keys onto a set of node identifiers
//! such that every process configured with the same nodes and the same hash function agrees
//! on the owner of every key, without any coordination.
//!
//! Each real node is placed on the ring several times (its *replicas*, or virtual nodes).
//! A key is owned by the first virtual node found clockwise from the key's own hash, wrapping
//! around at the end of the hash space. Adding a node therefore only moves the keys that land
//! between the new virtual nodes and their predecessors; every other key keeps its owner.
//!
//! # Example
//!
//! ```
//! use hashring::Ring;
//!
//! let mut ring = Ring::new(50);
//! assert_eq!(ring.get("user:42"), None);
//!
//! ring.add(["10.0.0.1:8001", "10.0.0.2:8001", "10.0.0.3:8001"]);
//!
//! let owner = ring.get("user:42").expect("ring has nodes");
//! assert!(ring.contains(owner));
//!
//! // Lookups are deterministic.
//! assert_eq!(ring.get("user:42"), Some(owner));
//! ```
//!
//! # Hash Function
//!
//! The default hash is CRC-32 (IEEE), which is fast and stable across platforms and
//! processes. It is not cryptographic. Use [`Ring::with_hasher`] to plug in another
//! function; all participants must use the same one.
//!
//! # Concurrency
//!
//! `Ring` is a plain value: lookups take `&self` and membership changes take `&mut self`.
//! Deployments that change membership while serving lookups wrap it in a readers-writer lock.

mod ring;

#[doc(inline)]
pub use ring::{HashFn, Ring};

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Namespaced read-through cache groups with consistent-hash peer routing.
//!
//! A [`Group`] caches the values of one backing source under a name. Reads go to the group's
//! store first; on a miss the group asks the [`Getter`] for the value, stores a copy and returns
//! it. Groups live in a [`Registry`] and are looked up by name.
//!
//! When several nodes share the load, each group can be given a [`PeerPicker`]. The picker
//! assigns every key to one node with a consistent hash [`Ring`]; misses for keys owned by
//! another node are fetched from that node through a [`PeerFetcher`] instead of the backing
//! source. The transport behind the fetcher is up to the application.
//!
//! # Quick Start
//!
//! ```
//! use std::collections::HashMap;
//! use std::io;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use lookaside::Registry;
//!
//! let db = HashMap::from([("Tom", "630"), ("Jack", "589"), ("Sam", "567")]);
//! let loads = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&loads);
//!
//! let registry = Registry::new();
//! registry.new_group("scores", 2 << 10, move |key: &str| -> Result<Vec<u8>, io::Error> {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     db.get(key)
//!         .map(|score| score.as_bytes().to_vec())
//!         .ok_or_else(|| io::Error::other(format!("{key} not exist")))
//! });
//!
//! let scores = registry.group("scores").unwrap();
//! assert_eq!(scores.get("Tom")?.to_string(), "630");
//! assert_eq!(scores.get("Tom")?.to_string(), "630");
//! assert_eq!(loads.load(Ordering::SeqCst), 1);
//!
//! assert!(scores.get("unknown").is_err());
//! # Ok::<(), lookaside::Error>(())
//! ```
//!
//! # Stampede Protection
//!
//! By default, threads that miss the same key at the same time share a single load. Disable
//! this per group with [`GroupBuilder::stampede_protection`].
//!
//! # Storage
//!
//! Groups store values in a byte-bounded [`MemoryStore`] unless another [`Store`] is supplied
//! through [`GroupBuilder::store`]. Cached values are handed out as [`ByteView`]s, which cannot
//! be modified.
//!
//! # Metrics
//!
//! With the `metrics` feature, `GroupBuilder::meter` reports every group event to the
//! `OpenTelemetry` counter `lookaside.event.count`, tagged with `lookaside.group` and
//! `lookaside.event`. [`Group::stats`] is available either way.

mod error;
mod getter;
mod group;
mod peers;
mod registry;
mod telemetry;

#[doc(inline)]
pub use error::{BoxError, Error, Result};
#[doc(inline)]
pub use getter::Getter;
#[doc(inline)]
pub use group::{Group, GroupBuilder};
#[doc(inline)]
pub use hashring::Ring;
#[doc(inline)]
pub use lookaside_memory::MemoryStore;
#[doc(inline)]
pub use lookaside_tier::{ByteView, Store};
#[doc(inline)]
pub use peers::{PeerFetcher, PeerPicker, RingPeerPicker};
#[doc(inline)]
pub use registry::Registry;
#[doc(inline)]
pub use telemetry::Stats;

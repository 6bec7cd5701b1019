// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Coalesces duplicate blocking calls into a single execution.
//!
//! This crate provides [`Coalescer`], a per-key in-flight call tracker for code that runs on
//! ordinary threads. When several threads request the same work (identified by a key) at the
//! same time, only the first one (the "leader") runs it. The others (the "followers") block
//! until the leader is done and receive a clone of its result.
//!
//! Nothing is remembered once a call completes: the next request for the same key starts a
//! new call. Pair the coalescer with a cache to keep results around.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use coalesce::Coalescer;
//!
//! let group: Arc<Coalescer<String, String>> = Arc::new(Coalescer::new());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let group = Arc::clone(&group);
//!         thread::spawn(move || group.work("user:123".to_string(), || "expensive_result".to_string()))
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     assert_eq!(handle.join().unwrap(), "expensive_result");
//! }
//! ```
//!
//! # Panic Safety
//!
//! If the leader panics, the panic propagates on the leader's thread and the call is marked
//! abandoned. One of the waiting followers is promoted to leader and runs its own closure;
//! the remaining followers wait for that attempt instead.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

type Mapping<K, T> = Mutex<HashMap<K, Arc<Call<T>>>>;

/// Represents a class of work and creates a space in which units of work
/// can be executed with duplicate suppression.
pub struct Coalescer<K, T> {
    mapping: Mapping<K, T>,
}

impl<K, T> Default for Coalescer<K, T> {
    fn default() -> Self {
        Self {
            mapping: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, T> Debug for Coalescer<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coalescer")
            .field("in_flight", &self.mapping.lock().len())
            .finish_non_exhaustive()
    }
}

enum Slot<T> {
    Pending,
    Ready(T),
    Abandoned,
}

/// One in-flight execution, shared by its leader and followers.
struct Call<T> {
    slot: Mutex<Slot<T>>,
    done: Condvar,
}

impl<T: Clone> Call<T> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            done: Condvar::new(),
        }
    }

    /// Blocks until the leader finishes. Returns `None` if the leader gave up.
    fn wait(&self) -> Option<T> {
        let mut slot = self.slot.lock();
        loop {
            match &*slot {
                Slot::Ready(value) => return Some(value.clone()),
                Slot::Abandoned => return None,
                Slot::Pending => {}
            }
            self.done.wait(&mut slot);
        }
    }

    fn finish(&self, outcome: Slot<T>) {
        *self.slot.lock() = outcome;
        self.done.notify_all();
    }
}

/// Role of a caller in the work execution.
enum Role<T> {
    Leader(Arc<Call<T>>),
    Follower(Arc<Call<T>>),
}

/// Removes the call from the mapping when the leader finishes, one way or another.
struct LeaderGuard<'a, K, T>
where
    K: Hash + Eq,
    T: Clone,
{
    mapping: &'a Mapping<K, T>,
    key: K,
    call: Arc<Call<T>>,
    completed: bool,
}

impl<K, T> LeaderGuard<'_, K, T>
where
    K: Hash + Eq,
    T: Clone,
{
    fn complete(mut self, value: T) {
        self.forget();
        self.call.finish(Slot::Ready(value));
        self.completed = true;
    }

    fn forget(&self) {
        let mut mapping = self.mapping.lock();
        // A newer call may already own the key if this one was abandoned and replaced.
        if mapping.get(&self.key).is_some_and(|call| Arc::ptr_eq(call, &self.call)) {
            mapping.remove(&self.key);
        }
    }
}

impl<K, T> Drop for LeaderGuard<'_, K, T>
where
    K: Hash + Eq,
    T: Clone,
{
    fn drop(&mut self) {
        if !self.completed {
            self.forget();
            self.call.finish(Slot::Abandoned);
        }
    }
}

impl<K, T> Coalescer<K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    /// Creates a new, empty coalescer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes `func` and returns its value, making sure that only one execution per key is
    /// in flight at a given moment. A caller arriving while another execution for the same key
    /// is running blocks until it completes and returns a clone of the same value; its own
    /// `func` is only run if it gets promoted after the leader panicked.
    pub fn work<F>(&self, key: K, func: F) -> T
    where
        F: FnOnce() -> T,
    {
        loop {
            match self.join(&key) {
                Role::Leader(call) => return self.lead(key, call, func),
                Role::Follower(call) => {
                    if let Some(value) = call.wait() {
                        return value;
                    }
                }
            }
        }
    }

    /// Returns the number of keys that currently have an execution in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.mapping.lock().len()
    }

    fn join(&self, key: &K) -> Role<T> {
        let mut mapping = self.mapping.lock();
        if let Some(call) = mapping.get(key) {
            return Role::Follower(Arc::clone(call));
        }

        let call = Arc::new(Call::new());
        mapping.insert(key.clone(), Arc::clone(&call));
        Role::Leader(call)
    }

    fn lead<F>(&self, key: K, call: Arc<Call<T>>, func: F) -> T
    where
        F: FnOnce() -> T,
    {
        let guard = LeaderGuard {
            mapping: &self.mapping,
            key,
            call,
            completed: false,
        };

        let value = func();
        guard.complete(value.clone());
        value
    }
}

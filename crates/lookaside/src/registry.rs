// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Getter, Group, GroupBuilder, Result};

/// A namespace of cache groups, looked up by name.
///
/// The registry is an ordinary value: create one at startup and hand clones of it to whoever
/// needs groups. Clones share the same set of groups.
///
/// Registering a group under a name that is already taken replaces the old group. Handles to
/// the old group stay valid but the registry no longer returns it.
///
/// # Examples
///
/// ```
/// use std::io;
///
/// use lookaside::Registry;
///
/// let registry = Registry::new();
/// registry.new_group("scores", 2 << 10, |key: &str| -> Result<Vec<u8>, io::Error> {
///     Ok(format!("score of {key}").into_bytes())
/// });
///
/// let scores = registry.group("scores").expect("group was registered");
/// assert_eq!(scores.get("Tom")?.to_string(), "score of Tom");
/// assert!(registry.group("ranks").is_none());
/// # Ok::<(), lookaside::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    groups: Arc<RwLock<HashMap<String, Arc<Group>>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a group with the default store and registers it under `name`.
    ///
    /// `cache_bytes` bounds the group's store; zero means unbounded.
    pub fn new_group(&self, name: impl Into<String>, cache_bytes: u64, getter: impl Getter + 'static) -> Arc<Group> {
        let group = Group::builder(name).cache_bytes(cache_bytes).build_with(Box::new(getter));
        self.insert(group)
    }

    /// Builds a group from `builder` and registers it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the builder has no
    /// backing source. Nothing is registered in that case.
    pub fn register(&self, builder: GroupBuilder) -> Result<Arc<Group>> {
        let group = builder.build()?;
        Ok(self.insert(group))
    }

    /// Returns the group registered under `name`.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Unregisters the group named `name` and returns it.
    pub fn remove(&self, name: &str) -> Option<Arc<Group>> {
        let removed = self.groups.write().remove(name);
        if removed.is_some() {
            tracing::info!(lookaside.group = name, "group removed");
        }
        removed
    }

    /// Unregisters every group.
    pub fn clear(&self) {
        self.groups.write().clear();
    }

    /// Returns the number of registered groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Returns `true` if no group is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    /// Returns the names of all registered groups, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    fn insert(&self, group: Group) -> Arc<Group> {
        let group = Arc::new(group);
        let previous = self.groups.write().insert(group.name().to_owned(), Arc::clone(&group));

        if previous.is_some() {
            tracing::info!(lookaside.group = group.name(), cache_bytes = group.cache_bytes(), "group replaced");
        } else {
            tracing::info!(lookaside.group = group.name(), cache_bytes = group.cache_bytes(), "group registered");
        }

        group
    }
}

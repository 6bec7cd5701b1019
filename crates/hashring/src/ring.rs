// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// A hash function used to place virtual nodes and keys on the ring.
pub type HashFn = Arc<dyn Fn(&[u8]) -> u32 + Send + Sync>;

/// A consistent hash ring mapping keys to node identifiers.
///
/// See the [crate documentation](crate) for an overview of the algorithm.
#[derive(Clone)]
pub struct Ring {
    hash: HashFn,
    replicas: usize,
    // Sorted ascending at all times.
    hashes: Vec<u32>,
    nodes: HashMap<u32, String>,
}

impl Ring {
    /// Creates an empty ring that places `replicas` virtual nodes per real node, using
    /// CRC-32 (IEEE) as the hash function.
    ///
    /// A ring with zero replicas never owns any key.
    #[must_use]
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, crc32fast::hash)
    }

    /// Creates an empty ring with a custom hash function.
    ///
    /// # Examples
    ///
    /// ```
    /// use hashring::Ring;
    ///
    /// let mut ring = Ring::with_hasher(3, |data| data.iter().map(|&b| u32::from(b)).sum());
    /// ring.add(["a"]);
    /// assert_eq!(ring.get("anything"), Some("a"));
    /// ```
    #[must_use]
    pub fn with_hasher(replicas: usize, hash: impl Fn(&[u8]) -> u32 + Send + Sync + 'static) -> Self {
        Self {
            hash: Arc::new(hash),
            replicas,
            hashes: Vec::new(),
            nodes: HashMap::new(),
        }
    }

    /// Adds real nodes to the ring.
    ///
    /// Every node contributes `replicas` virtual nodes, named by prefixing the node id with
    /// the replica index (`"0node"`, `"1node"`, ...). Adding a node that is already present
    /// adds its virtual nodes a second time rather than being ignored.
    pub fn add<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for node in nodes {
            let node = node.as_ref();
            for replica in 0..self.replicas {
                let hash = (self.hash)(format!("{replica}{node}").as_bytes());
                self.hashes.push(hash);
                self.nodes.insert(hash, node.to_owned());
            }
        }

        self.hashes.sort_unstable();
    }

    /// Returns the node that owns `key`, or `None` if no node has been added yet.
    #[must_use]
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&str> {
        if self.hashes.is_empty() {
            return None;
        }

        let hash = (self.hash)(key.as_ref());
        let index = self.hashes.partition_point(|&h| h < hash) % self.hashes.len();

        self.nodes.get(&self.hashes[index]).map(String::as_str)
    }

    /// Returns the number of virtual nodes on the ring.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Returns `true` if no node has been added yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Returns the number of virtual nodes placed per real node.
    #[must_use]
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Returns `true` if `node` owns at least one virtual node.
    #[must_use]
    pub fn contains(&self, node: &str) -> bool {
        self.nodes.values().any(|n| n == node)
    }

    /// Returns the distinct real nodes on the ring, in lexicographic order.
    #[must_use]
    pub fn nodes(&self) -> Vec<&str> {
        self.nodes.values().map(String::as_str).collect::<BTreeSet<_>>().into_iter().collect()
    }
}

impl Debug for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ring")
            .field("replicas", &self.replicas)
            .field("virtual_nodes", &self.hashes.len())
            .field("nodes", &self.nodes())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(Ring: Send, Sync, Clone);

    fn decimal_hash(data: &[u8]) -> u32 {
        std::str::from_utf8(data).unwrap().parse().unwrap()
    }

    #[test]
    fn empty_ring_has_no_owner() {
        let ring = Ring::new(10);

        assert!(ring.is_empty());
        assert_eq!(ring.get("key"), None);
    }

    #[test]
    fn zero_replicas_never_owns_keys() {
        let mut ring = Ring::new(0);
        ring.add(["a", "b"]);

        assert!(ring.is_empty());
        assert_eq!(ring.get("key"), None);
    }

    #[test]
    fn keys_map_to_next_virtual_node_clockwise() {
        // Virtual nodes land on 2, 4, 6, 12, 14, 16, 22, 24, 26.
        let mut ring = Ring::with_hasher(3, decimal_hash);
        ring.add(["6", "4", "2"]);

        let cases = [("2", "2"), ("11", "2"), ("23", "4"), ("27", "2")];
        for (key, owner) in cases {
            assert_eq!(ring.get(key), Some(owner), "key {key}");
        }

        // 8, 18 and 28 join; only 27 changes hands.
        ring.add(["8"]);

        let cases = [("2", "2"), ("11", "2"), ("23", "4"), ("27", "8")];
        for (key, owner) in cases {
            assert_eq!(ring.get(key), Some(owner), "key {key}");
        }
    }

    #[test]
    fn hash_beyond_last_virtual_node_wraps_to_first() {
        let mut ring = Ring::with_hasher(1, decimal_hash);
        ring.add(["5", "9"]);

        assert_eq!(ring.get("10"), Some("5"));
        assert_eq!(ring.get(u32::MAX.to_string()), Some("5"));
    }

    #[test]
    fn virtual_node_hashes_stay_sorted() {
        let mut ring = Ring::new(20);
        ring.add(["c", "a"]);
        ring.add(["b"]);

        assert_eq!(ring.len(), 60);
        assert!(ring.hashes.windows(2).all(|w| w[0] <= w[1]));
        assert!(ring.hashes.iter().all(|h| ring.nodes.contains_key(h)));
    }

    #[test]
    fn duplicate_add_appends_virtual_nodes() {
        let mut ring = Ring::new(5);
        ring.add(["a"]);
        ring.add(["a"]);

        assert_eq!(ring.len(), 10);
        assert_eq!(ring.nodes(), vec!["a"]);
    }

    #[test]
    fn nodes_are_distinct_and_sorted() {
        let mut ring = Ring::new(4);
        ring.add(["beta", "alpha", "gamma"]);

        assert_eq!(ring.replicas(), 4);
        assert_eq!(ring.nodes(), vec!["alpha", "beta", "gamma"]);
        assert!(ring.contains("beta"));
        assert!(!ring.contains("delta"));
    }

    #[test]
    fn debug_output_lists_nodes() {
        let mut ring = Ring::new(2);
        ring.add(["a"]);

        let debug = format!("{ring:?}");
        assert!(debug.contains("replicas: 2"), "{debug}");
        assert!(debug.contains("\"a\""), "{debug}");
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Routing of cache misses to the peer that owns a key.
//!
//! The transport that talks to a remote node is not part of this crate. It plugs in by
//! implementing [`PeerFetcher`]; [`RingPeerPicker`] decides which fetcher, if any, owns a key.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use hashring::Ring;
use lookaside_tier::ByteView;
use parking_lot::RwLock;

use crate::BoxError;

/// Fetches a value for a group from a remote node.
///
/// Closures of the shape `Fn(&str, &str) -> Result<ByteView, BoxError>` are fetchers, with the
/// group name as the first argument and the key as the second.
pub trait PeerFetcher: Send + Sync {
    /// Asks the remote node for the value of `key` in the group named `group`.
    ///
    /// # Errors
    ///
    /// Returns the transport's error. The group logs it and falls back to its own backing
    /// source.
    fn fetch(&self, group: &str, key: &str) -> Result<ByteView, BoxError>;
}

impl<F> PeerFetcher for F
where
    F: Fn(&str, &str) -> Result<ByteView, BoxError> + Send + Sync,
{
    fn fetch(&self, group: &str, key: &str) -> Result<ByteView, BoxError> {
        self(group, key)
    }
}

/// Chooses the peer responsible for a key.
pub trait PeerPicker: Send + Sync {
    /// Returns the fetcher of the node owning `key`, or `None` if the key should be served by
    /// this node.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerFetcher>>;
}

struct Membership {
    ring: Ring,
    fetchers: HashMap<String, Arc<dyn PeerFetcher>>,
}

/// A [`PeerPicker`] that assigns keys to nodes with a consistent hash [`Ring`].
///
/// The local node is always a member of the ring. Keys it owns are served locally; every other
/// key goes to the fetcher registered for its owner.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use lookaside::{BoxError, ByteView, PeerFetcher, PeerPicker, Ring, RingPeerPicker};
///
/// let remote = |_group: &str, key: &str| -> Result<ByteView, BoxError> { Ok(ByteView::from(key)) };
/// let remote: Arc<dyn PeerFetcher> = Arc::new(remote);
///
/// let picker = RingPeerPicker::new("node-a", Ring::new(50));
/// picker.set_peers([("node-b", remote)]);
///
/// for key in ["Tom", "Jack", "Sam"] {
///     let owner = picker.owner(key).unwrap();
///     assert_eq!(picker.pick_peer(key).is_some(), owner == "node-b");
/// }
/// ```
pub struct RingPeerPicker {
    self_id: String,
    template: Ring,
    membership: RwLock<Membership>,
}

impl RingPeerPicker {
    /// Creates a picker for the node `self_id`.
    ///
    /// `ring` supplies the replica count and hash function; any nodes it already holds are kept
    /// across [`set_peers`](Self::set_peers) calls but have no fetcher until one is added. The
    /// local node is added unless `ring` holds it already.
    #[must_use]
    pub fn new(self_id: impl Into<String>, ring: Ring) -> Self {
        let self_id = self_id.into();
        let mut initial = ring.clone();
        if !initial.contains(&self_id) {
            initial.add([self_id.as_str()]);
        }

        Self {
            self_id,
            template: ring,
            membership: RwLock::new(Membership {
                ring: initial,
                fetchers: HashMap::new(),
            }),
        }
    }

    /// Returns the identifier of the local node.
    #[must_use]
    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    /// Replaces the set of remote peers and rebuilds the ring from scratch.
    ///
    /// Peers are placed on the ring in sorted id order, so nodes given the same peer set agree
    /// on key ownership even when virtual node hashes collide.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = (S, Arc<dyn PeerFetcher>)>,
        S: Into<String>,
    {
        let fetchers: HashMap<String, Arc<dyn PeerFetcher>> = peers
            .into_iter()
            .map(|(id, fetcher)| (id.into(), fetcher))
            .filter(|(id, _)| *id != self.self_id)
            .collect();

        let mut ids: Vec<&str> = fetchers.keys().map(String::as_str).filter(|id| !self.template.contains(id)).collect();
        ids.sort_unstable();

        let mut ring = self.template.clone();
        if !ring.contains(&self.self_id) {
            ring.add([self.self_id.as_str()]);
        }
        ring.add(ids);

        tracing::info!(lookaside.node = %self.self_id, peers = fetchers.len(), "peer set replaced");

        *self.membership.write() = Membership { ring, fetchers };
    }

    /// Adds a single remote peer, or replaces the fetcher of a known one.
    ///
    /// Adding the local node's own identifier is ignored.
    pub fn add_peer(&self, id: impl Into<String>, fetcher: Arc<dyn PeerFetcher>) {
        let id = id.into();
        if id == self.self_id {
            return;
        }

        let mut membership = self.membership.write();
        if !membership.ring.contains(&id) {
            membership.ring.add([id.as_str()]);
        }
        tracing::info!(lookaside.node = %self.self_id, lookaside.peer = %id, "peer added");
        membership.fetchers.insert(id, fetcher);
    }

    /// Returns the node that owns `key`.
    #[must_use]
    pub fn owner(&self, key: &str) -> Option<String> {
        self.membership.read().ring.get(key).map(ToOwned::to_owned)
    }

    /// Returns the identifiers of all nodes on the ring, the local one included, sorted.
    #[must_use]
    pub fn peers(&self) -> Vec<String> {
        self.membership.read().ring.nodes().into_iter().map(ToOwned::to_owned).collect()
    }
}

impl PeerPicker for RingPeerPicker {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerFetcher>> {
        let membership = self.membership.read();
        let owner = membership.ring.get(key)?;
        if owner == self.self_id {
            return None;
        }
        membership.fetchers.get(owner).cloned()
    }
}

impl Debug for RingPeerPicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let membership = self.membership.read();
        f.debug_struct("RingPeerPicker")
            .field("self_id", &self.self_id)
            .field("ring", &membership.ring)
            .field("fetchers", &membership.fetchers.len())
            .finish()
    }
}

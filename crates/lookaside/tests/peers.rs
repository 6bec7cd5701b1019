// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for routing cache misses to peers.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lookaside::{BoxError, ByteView, Group, PeerFetcher, PeerPicker, Ring, RingPeerPicker, Store};
use parking_lot::Mutex;
use testing_aids::LogCapture;

/// Hashes keys by reading them as decimal numbers, which makes ring positions easy to predict.
///
/// With three replicas, node "2" sits at 2, 12, 22 and node "4" at 4, 14, 24.
fn decimal_ring() -> Ring {
    Ring::with_hasher(3, |data: &[u8]| std::str::from_utf8(data).ok().and_then(|s| s.parse().ok()).unwrap_or(0))
}

/// A fake transport that records the requests it serves.
#[derive(Clone, Default)]
struct RecordingPeer {
    requests: Arc<Mutex<Vec<(String, String)>>>,
    failing: bool,
}

impl RecordingPeer {
    fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().clone()
    }
}

impl PeerFetcher for RecordingPeer {
    fn fetch(&self, group: &str, key: &str) -> Result<ByteView, BoxError> {
        self.requests.lock().push((group.to_owned(), key.to_owned()));
        if self.failing {
            return Err(Box::new(io::Error::new(io::ErrorKind::ConnectionRefused, "peer unreachable")));
        }
        Ok(ByteView::from(format!("remote:{key}")))
    }
}

fn local_group(loads: &Arc<AtomicUsize>) -> Group {
    let counted = Arc::clone(loads);
    Group::builder("scores")
        .getter(move |key: &str| -> Result<Vec<u8>, io::Error> {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(format!("local:{key}").into_bytes())
        })
        .build()
        .unwrap()
}

fn picker_with(peer: &RecordingPeer) -> Arc<RingPeerPicker> {
    let picker = RingPeerPicker::new("2", decimal_ring());
    picker.set_peers([("4", Arc::new(peer.clone()) as Arc<dyn PeerFetcher>)]);
    Arc::new(picker)
}

#[test]
fn remote_keys_are_fetched_from_owner() {
    let loads = Arc::new(AtomicUsize::new(0));
    let peer = RecordingPeer::default();
    let group = local_group(&loads);
    group.register_peers(picker_with(&peer)).unwrap();

    assert_eq!(group.get("23").unwrap().to_string(), "remote:23");

    assert_eq!(peer.requests(), [("scores".to_string(), "23".to_string())]);
    assert_eq!(loads.load(Ordering::SeqCst), 0);
    assert!(group.store().get("23").is_none(), "the owner caches remote values, not us");
    assert_eq!(group.stats().peer_loads, 1);
}

#[test]
fn local_keys_use_backing_source() {
    let loads = Arc::new(AtomicUsize::new(0));
    let peer = RecordingPeer::default();
    let group = local_group(&loads);
    group.register_peers(picker_with(&peer)).unwrap();

    assert_eq!(group.get("11").unwrap().to_string(), "local:11");
    assert_eq!(group.get("11").unwrap().to_string(), "local:11");

    assert!(peer.requests().is_empty());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_peer_falls_back_to_backing_source() {
    let loads = Arc::new(AtomicUsize::new(0));
    let peer = RecordingPeer::failing();
    let group = local_group(&loads);
    group.register_peers(picker_with(&peer)).unwrap();
    let capture = LogCapture::new();

    let value = tracing::subscriber::with_default(capture.subscriber(), || group.get("23").unwrap());

    assert_eq!(value.to_string(), "local:23");
    assert_eq!(peer.requests().len(), 1);
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    let stats = group.stats();
    assert_eq!(stats.peer_errors, 1);
    assert_eq!(stats.local_loads, 1);

    capture.assert_contains("peer fetch failed, loading locally");
    capture.assert_contains("peer unreachable");
}

#[test]
fn group_without_peers_loads_locally() {
    let loads = Arc::new(AtomicUsize::new(0));
    let group = local_group(&loads);

    assert_eq!(group.get("23").unwrap().to_string(), "local:23");
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn added_peer_takes_over_its_keys() {
    let loads = Arc::new(AtomicUsize::new(0));
    let peer = RecordingPeer::default();
    let picker = Arc::new(RingPeerPicker::new("2", decimal_ring()));
    let group = local_group(&loads);
    group.register_peers(Arc::clone(&picker) as Arc<dyn PeerPicker>).unwrap();

    assert_eq!(group.get("13").unwrap().to_string(), "local:13");

    picker.add_peer("4", Arc::new(peer.clone()));

    // "13" is cached locally already; "23" now belongs to node 4.
    assert_eq!(group.get("13").unwrap().to_string(), "local:13");
    assert_eq!(group.get("23").unwrap().to_string(), "remote:23");
    assert_eq!(peer.requests(), [("scores".to_string(), "23".to_string())]);
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for key ownership on `Ring`.

use std::collections::HashMap;

use hashring::Ring;

const KEY_COUNT: usize = 10_000;

fn keys() -> impl Iterator<Item = String> {
    (0..KEY_COUNT).map(|i| format!("key-{i}"))
}

fn ring_with_nodes(count: usize) -> Ring {
    let mut ring = Ring::new(100);
    ring.add((0..count).map(|i| format!("node-{i}")));
    ring
}

#[test]
fn identical_rings_agree_on_every_key() {
    let first = ring_with_nodes(4);
    let second = ring_with_nodes(4);

    for key in keys() {
        let owner = first.get(&key);
        assert!(owner.is_some());
        assert_eq!(owner, second.get(&key), "key {key}");
        assert_eq!(owner, first.get(&key), "repeated lookup of {key}");
    }
}

/// Holds when no two virtual nodes share a hash; on a collision the node added last owns the
/// position.
#[test]
fn insertion_order_does_not_change_ownership() {
    let mut forward = Ring::new(50);
    forward.add(["a", "b", "c"]);

    let mut backward = Ring::new(50);
    backward.add(["c"]);
    backward.add(["b", "a"]);

    for key in keys() {
        assert_eq!(forward.get(&key), backward.get(&key), "key {key}");
    }
}

#[test]
fn every_key_maps_to_a_registered_node() {
    let ring = ring_with_nodes(5);
    let nodes = ring.nodes();

    for key in keys() {
        let owner = ring.get(&key).expect("ring has nodes");
        assert!(nodes.contains(&owner), "{owner} is not a registered node");
    }
}

#[test]
fn virtual_nodes_spread_keys_evenly() {
    let ring = ring_with_nodes(4);

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys() {
        *counts.entry(ring.get(&key).expect("ring has nodes")).or_default() += 1;
    }

    assert_eq!(counts.len(), 4);
    for (node, count) in counts {
        // Perfect balance is 25%.
        assert!((KEY_COUNT / 5..KEY_COUNT * 3 / 10).contains(&count), "{node} owns {count} keys");
    }
}

#[test]
fn adding_a_node_only_moves_keys_to_that_node() {
    let before = ring_with_nodes(4);
    let mut after = before.clone();
    after.add(["node-4"]);

    let mut moved = 0;
    for key in keys() {
        let old_owner = before.get(&key).expect("ring has nodes");
        let new_owner = after.get(&key).expect("ring has nodes");
        if old_owner != new_owner {
            assert_eq!(new_owner, "node-4", "key {key} moved between existing nodes");
            moved += 1;
        }
    }

    assert!(moved > 0);
    // Expected share of the new node is 1/5, allow some statistical slack.
    assert!(moved * 100 <= KEY_COUNT * 25, "{moved} of {KEY_COUNT} keys moved");
}

use chrono::{DateTime, Duration};
use meshmap_core::NodeId;
use meshmap_session::UpdateStats;
use serde_json::json;

use crate::*;

/// Full snapshot, then an incremental upsert of new and existing peers.
#[test]
fn test_full_then_incremental() {
    let h = Harness::new();
    h.apply(json!({ "Peers": [{ "ID": 1, "Name": "foo" }, { "ID": 2, "Name": "bar" }] }));

    let nm = h.apply(json!({
        "PeersChanged": [
            { "ID": 0, "Name": "zero" },
            { "ID": 2, "Name": "bar2" },
            { "ID": 3, "Name": "three" }
        ]
    }));

    assert_eq!(
        peer_names(&nm),
        vec![
            (0, "zero".to_string()),
            (1, "foo".to_string()),
            (2, "bar2".to_string()),
            (3, "three".to_string()),
        ]
    );
    assert_eq!(
        h.session.last_stats(),
        UpdateStats { added: 2, changed: 1, ..Default::default() }
    );
}

/// A second full snapshot discards peers it does not list.
#[test]
fn test_full_snapshot_replaces() {
    let h = Harness::new();
    h.apply(json!({ "Peers": [{ "ID": 1, "Name": "foo" }, { "ID": 2, "Name": "bar" }] }));
    let nm = h.apply(json!({ "Peers": [{ "ID": 5, "Name": "five" }, { "ID": 2, "Name": "bar" }] }));

    assert_eq!(peer_names(&nm), vec![(2, "bar".to_string()), (5, "five".to_string())]);
    let stats = h.session.last_stats();
    assert!(stats.all_new);
    assert_eq!((stats.added, stats.changed, stats.removed), (1, 1, 1));

    let nm = h.apply(json!({ "Peers": [] }));
    assert!(nm.peers.is_empty());
}

/// Removing an unknown peer is a no-op.
#[test]
fn test_remove_unknown() {
    let h = Harness::new();
    h.apply(json!({ "Peers": [{ "ID": 1, "Name": "foo" }, { "ID": 2, "Name": "bar" }] }));
    let nm = h.apply(json!({ "PeersRemoved": [1, 3, 4] }));

    assert_eq!(peer_names(&nm), vec![(2, "bar".to_string())]);
    assert_eq!(h.session.last_stats().removed, 1);
}

/// Several delta kinds in one response apply in order.
#[test]
fn test_mixed_deltas() {
    let h = Harness::new();
    h.apply(json!({
        "Peers": [
            { "ID": 1, "Name": "foo", "DERP": "127.3.3.40:1" },
            { "ID": 2, "Name": "bar" }
        ]
    }));

    let nm = h.apply(json!({
        "PeersChanged": [{ "ID": 3, "Name": "three" }],
        "PeersRemoved": [2],
        "PeersChangedPatch": [{ "NodeID": 1, "DERPRegion": 9 }],
        "OnlineChange": { "1": true, "3": false }
    }));

    assert_eq!(peer_names(&nm), vec![(1, "foo".to_string()), (3, "three".to_string())]);
    let one = nm.peer_by_id(NodeId(1)).unwrap();
    assert_eq!(one.derp, "127.3.3.40:9");
    assert_eq!(one.online, Some(true));
    assert_eq!(nm.peer_by_id(NodeId(3)).unwrap().online, Some(false));
    assert_eq!(nm.online_peer_count(), 1);
}

/// A region-only patch keeps the relay host.
#[test]
fn test_region_patch_keeps_host() {
    let h = Harness::new();
    h.apply(json!({ "Peers": [{ "ID": 1, "Name": "foo", "DERP": "h:3" }] }));
    let nm = h.apply(json!({ "PeersChangedPatch": [{ "NodeID": 1, "DERPRegion": 4 }] }));
    assert_eq!(nm.peers[0].derp, "h:4");
}

/// Seen toggles use the injected clock.
#[test]
fn test_seen_toggles() {
    let h = Harness::new();
    h.apply(json!({ "Peers": [{ "ID": 1, "Name": "foo" }, { "ID": 2, "Name": "bar" }] }));

    h.clock.advance(Duration::seconds(30));
    let nm = h.apply(json!({ "PeerSeenChange": { "1": true, "99": true } }));
    let want = DateTime::from_timestamp(START_SECS + 30, 0);
    assert_eq!(nm.peer_by_id(NodeId(1)).unwrap().last_seen, want);
    assert_eq!(nm.peer_by_id(NodeId(2)).unwrap().last_seen, None);
    assert_eq!(h.session.last_stats().changed, 1);

    let nm = h.apply(json!({ "PeerSeenChange": { "1": false } }));
    assert_eq!(nm.peer_by_id(NodeId(1)).unwrap().last_seen, None);
}

/// Key rotation arrives as a patch.
#[test]
fn test_key_rotation_patch() {
    let h = Harness::new();
    h.apply(json!({ "Peers": [{ "ID": 1, "Name": "foo" }] }));

    let key = format!("nodekey:{}", "ab".repeat(32));
    let nm = h.apply(json!({
        "PeersChangedPatch": [{
            "NodeID": 1,
            "Key": key,
            "KeyExpiry": "2030-01-01T00:00:00Z"
        }]
    }));

    let peer = &nm.peers[0];
    assert_eq!(peer.key.to_string(), key);
    assert_eq!(
        peer.key_expiry,
        DateTime::from_timestamp(1_893_456_000, 0)
    );
    assert_eq!(nm.peer_by_key(&peer.key).map(|p| p.id), Some(NodeId(1)));
}

/// Peer display names strip the tailnet suffix learned from the self node.
#[test]
fn test_display_names() {
    let h = Harness::new();
    let nm = h.apply(json!({
        "Node": { "ID": 100, "Name": "me.tail1234.ts.net." },
        "Peers": [
            {
                "ID": 1,
                "Name": "laptop.tail1234.ts.net.",
                "Hostinfo": { "Hostname": "Work-Laptop" }
            },
            { "ID": 2, "Name": "", "Hostinfo": { "Hostname": "phone" } }
        ]
    }));

    assert_eq!(nm.peers[0].display_name(), "laptop");
    assert_eq!(nm.peers[0].computed_name_with_host, "laptop (work-laptop)");
    assert_eq!(nm.peers[1].display_name(), "phone");
    assert_eq!(nm.self_node.as_deref().unwrap().display_name(), "me");
}

use meshmap_session::WatchUpdater;
use serde_json::json;

use crate::*;

/// Every applied response notifies, even when nothing changed.
#[test]
fn test_notification_per_response() {
    let h = Harness::new();
    h.apply(json!({ "Peers": [{ "ID": 1, "Name": "foo" }] }));
    h.apply(json!({}));
    h.apply(json!({}));
    assert_eq!(h.recorder.notifications(), 3);

    let full = h.recorder.full.lock().unwrap();
    assert!(full.iter().all(|nm| nm.peers.len() == 1));
}

/// Keep-alives are acknowledged without a notification.
#[test]
fn test_keep_alive() {
    let h = Harness::new();
    let first = h.apply(json!({ "Domain": "example.com" }));
    let nm = h.apply(json!({ "KeepAlive": true }));
    assert!(Arc::ptr_eq(&first, &nm));
    assert_eq!(h.recorder.notifications(), 1);

    // keep-alive plus content is a normal response
    h.apply(json!({ "KeepAlive": true, "Domain": "other.com" }));
    assert_eq!(h.recorder.notifications(), 2);
}

/// A consumer may read the session from inside its notification.
#[test]
fn test_reentrant_consumer() {
    let h = Harness::new().reentrant();
    h.apply(json!({ "Peers": [{ "ID": 1, "Name": "a" }, { "ID": 2, "Name": "b" }] }));
    h.apply(json!({ "PeersRemoved": [1] }));
    assert_eq!(*h.recorder.reentrant_peer_counts.lock().unwrap(), vec![2, 1]);
}

/// Published snapshots are never edited afterwards.
#[test]
fn test_snapshots_are_immutable() {
    let h = Harness::new();
    let first = h.apply(json!({ "Peers": [{ "ID": 1, "Name": "foo", "Online": false }] }));
    h.apply(json!({ "OnlineChange": { "1": true } }));
    h.apply(json!({ "PeersChanged": [{ "ID": 2, "Name": "bar" }] }));

    assert_eq!(first.peers.len(), 1);
    assert_eq!(first.peers[0].online, Some(false));
    assert_eq!(h.session.netmap().peers[0].online, Some(true));
}

/// The watch updater hands the latest netmap to async readers.
#[tokio::test]
async fn test_watch_updater() {
    let updater = Arc::new(WatchUpdater::new());
    let session = Arc::new(MapSession::new(
        NodeKey::default(),
        Arc::new(ManualClock::at_unix(START_SECS)),
        updater.clone(),
        SessionConfig::default(),
    ));
    let mut rx = updater.subscribe();

    let writer = {
        let session = session.clone();
        tokio::task::spawn_blocking(move || {
            for id in 1..=3 {
                session
                    .handle_map_response(response(json!({
                        "PeersChanged": [{ "ID": id, "Name": format!("n{id}") }]
                    })))
                    .unwrap();
            }
        })
    };
    writer.await.unwrap();

    rx.changed().await.unwrap();
    let nm = rx.borrow_and_update().clone().unwrap();
    assert_eq!(nm.peers.len(), 3);
    assert!(Arc::ptr_eq(&nm, &session.netmap()));
}

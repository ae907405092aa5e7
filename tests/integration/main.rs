//! meshmap integration test harness.
//!
//! Each test drives a fresh `MapSession` through its public API with
//! responses written as wire JSON, so field presence goes through serde the
//! same way it does in production.
//!
//!   cargo test --test integration

use std::sync::{Arc, Mutex, OnceLock, Weak};

use anyhow::{Context, Result};
use meshmap_core::config::SessionConfig;
use meshmap_core::{MapResponse, NetworkMap, NodeKey};
use meshmap_session::{ManualClock, MapSession, NetmapUpdater, SessionError};

mod notify;
mod peers;
mod sticky;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Seconds since the epoch the harness clock starts at.
pub const START_SECS: i64 = 1_700_000_000;

/// Records every notification. Optionally calls back into the session from
/// inside the notification.
#[derive(Default)]
pub struct Recorder {
    pub full: Mutex<Vec<Arc<NetworkMap>>>,
    pub self_changes: Mutex<usize>,
    pub session: OnceLock<Weak<MapSession>>,
    pub reentrant_peer_counts: Mutex<Vec<usize>>,
}

impl NetmapUpdater for Recorder {
    fn update_full_netmap(&self, nm: Arc<NetworkMap>) {
        if let Some(session) = self.session.get().and_then(Weak::upgrade) {
            let count = session.netmap().peers.len();
            self.reentrant_peer_counts.lock().unwrap().push(count);
        }
        self.full.lock().unwrap().push(nm);
    }

    fn self_node_changed(&self, _nm: &NetworkMap) {
        *self.self_changes.lock().unwrap() += 1;
    }
}

impl Recorder {
    pub fn notifications(&self) -> usize {
        self.full.lock().unwrap().len()
    }
}

pub struct Harness {
    pub session: Arc<MapSession>,
    pub recorder: Arc<Recorder>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let recorder = Arc::new(Recorder::default());
        let clock = Arc::new(ManualClock::at_unix(START_SECS));
        let session = Arc::new(MapSession::new(
            NodeKey::from_raw([1; 32]),
            clock.clone(),
            recorder.clone(),
            config,
        ));
        Self { session, recorder, clock }
    }

    /// Lets the recorder call back into the session on every notification.
    pub fn reentrant(self) -> Self {
        let _ = self.recorder.session.set(Arc::downgrade(&self.session));
        self
    }

    pub fn send(&self, value: serde_json::Value) -> Result<Arc<NetworkMap>, SessionError> {
        self.session.handle_map_response(response(value))
    }

    /// Sends a response that must be accepted.
    pub fn apply(&self, value: serde_json::Value) -> Arc<NetworkMap> {
        self.send(value).expect("response should be accepted")
    }
}

/// Decodes a wire JSON value into a response.
pub fn response(value: serde_json::Value) -> MapResponse {
    try_response(value).unwrap()
}

pub fn try_response(value: serde_json::Value) -> Result<MapResponse> {
    let bytes = serde_json::to_vec(&value)?;
    MapResponse::from_json(&bytes).context("invalid map response JSON")
}

/// `(id, name)` for each peer, in netmap order.
pub fn peer_names(nm: &NetworkMap) -> Vec<(i64, String)> {
    nm.peers.iter().map(|p| (p.id.0, p.name.clone())).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// A fresh session publishes nothing until the first response.
#[test]
fn test_fresh_session_is_empty() {
    let h = Harness::new();
    let nm = h.session.netmap();
    assert!(nm.peers.is_empty());
    assert!(nm.self_node.is_none());
    assert!(nm.derp_map.is_none());
    assert_eq!(nm.node_key, NodeKey::from_raw([1; 32]));
    assert_eq!(h.recorder.notifications(), 0);
}

/// Two sessions share nothing.
#[test]
fn test_sessions_are_independent() {
    let a = Harness::new();
    let b = Harness::new();
    a.apply(serde_json::json!({ "Peers": [{ "ID": 1, "Name": "foo" }] }));
    assert_eq!(a.session.peer_count(), 1);
    assert_eq!(b.session.peer_count(), 0);
    assert_eq!(b.recorder.notifications(), 0);
}

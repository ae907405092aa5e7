//! Netmap consumers.

use std::sync::Arc;

use meshmap_core::NetworkMap;
use tokio::sync::watch;

/// Receives every netmap the session publishes.
///
/// Called on the thread that handled the response, after the session lock is
/// released, so implementations may call back into the session.
pub trait NetmapUpdater: Send + Sync {
    fn update_full_netmap(&self, nm: Arc<NetworkMap>);

    /// Called before `update_full_netmap` when the response carried a self
    /// node.
    fn self_node_changed(&self, _nm: &NetworkMap) {}
}

/// Publishes netmaps on a `tokio::sync::watch` channel. Slow readers only
/// ever see the latest one.
#[derive(Debug)]
pub struct WatchUpdater {
    tx: watch::Sender<Option<Arc<NetworkMap>>>,
}

impl WatchUpdater {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<NetworkMap>>> {
        self.tx.subscribe()
    }

    /// Most recently published netmap.
    pub fn latest(&self) -> Option<Arc<NetworkMap>> {
        self.tx.borrow().clone()
    }
}

impl Default for WatchUpdater {
    fn default() -> Self {
        Self::new()
    }
}

impl NetmapUpdater for WatchUpdater {
    fn update_full_netmap(&self, nm: Arc<NetworkMap>) {
        // send_replace keeps the value even with no receivers
        self.tx.send_replace(Some(nm));
    }
}

//! Applies a stream of map responses and publishes network maps.

use std::sync::{Arc, Mutex, MutexGuard};

use meshmap_core::config::SessionConfig;
use meshmap_core::node::magic_dns_suffix;
use meshmap_core::{MapResponse, MapResponseError, NetworkMap, NodeKey};

use crate::clock::Clock;
use crate::notify::NetmapUpdater;
use crate::patchify::patchify_peers_changed;
use crate::peer_store::{PeerStore, UpdateStats};
use crate::sticky::StickyFields;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("malformed map response: {0}")]
    Malformed(#[from] MapResponseError),
}

/// Everything the session owns. Only touched under the session lock.
#[derive(Debug)]
struct SessionState {
    store: PeerStore,
    sticky: StickyFields,
    netmap: Arc<NetworkMap>,
    last_summary: String,
    last_stats: UpdateStats,
    applied: u64,
}

impl SessionState {
    fn build_netmap(&self, node_key: NodeKey) -> NetworkMap {
        let sticky = &self.sticky;
        NetworkMap {
            self_node: sticky.self_node.clone(),
            node_key,
            peers: self.store.sorted().to_vec(),
            derp_map: sticky.derp_map.clone(),
            packet_filter: sticky.packet_filter.clone(),
            dns: sticky.dns.clone(),
            domain: sticky.domain.clone(),
            collect_services: sticky.collect_services,
            user_profiles: sticky.user_profiles.clone(),
            health: sticky.health.clone(),
            domain_audit_log_id: sticky.domain_audit_log_id.clone(),
        }
    }
}

/// State for one control connection.
///
/// Responses are applied one at a time behind a single lock. The updater is
/// called after the lock is released.
pub struct MapSession {
    node_key: NodeKey,
    clock: Arc<dyn Clock>,
    updater: Arc<dyn NetmapUpdater>,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for MapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapSession")
            .field("node_key", &self.node_key)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MapSession {
    pub fn new(
        node_key: NodeKey,
        clock: Arc<dyn Clock>,
        updater: Arc<dyn NetmapUpdater>,
        config: SessionConfig,
    ) -> Self {
        let sticky = StickyFields::new(config.collect_services_default);
        let state = SessionState {
            store: PeerStore::new(),
            netmap: Arc::new(NetworkMap {
                node_key,
                collect_services: sticky.collect_services,
                ..Default::default()
            }),
            sticky,
            last_summary: String::new(),
            last_stats: UpdateStats::default(),
            applied: 0,
        };
        Self {
            node_key,
            clock,
            updater,
            config,
            state: Mutex::new(state),
        }
    }

    pub fn node_key(&self) -> NodeKey {
        self.node_key
    }

    /// Applies one response and publishes the resulting netmap.
    ///
    /// A malformed response is rejected before anything is touched.
    /// Keep-alive-only responses return the current netmap without
    /// notifying.
    pub fn handle_map_response(
        &self,
        mut res: MapResponse,
    ) -> Result<Arc<NetworkMap>, SessionError> {
        if res.is_keep_alive_only() {
            tracing::trace!("keep-alive");
            return Ok(self.netmap());
        }
        if let Err(e) = res.validate() {
            tracing::warn!(error = %e, "rejecting map response");
            return Err(e.into());
        }
        let had_self_node = res.node.is_some();

        let nm = {
            let mut state = self.lock();

            let suffix = res
                .node
                .as_ref()
                .or(state.sticky.self_node.as_deref())
                .map(|n| magic_dns_suffix(&n.name).to_string())
                .unwrap_or_default();
            for node in res.peers.iter_mut().flatten() {
                node.init_display_names(&suffix);
            }
            for node in &mut res.peers_changed {
                node.init_display_names(&suffix);
            }

            if self.config.patchify && res.peers.is_none() {
                let ps = patchify_peers_changed(&state.store, &mut res);
                if ps.patched > 0 || ps.unchanged > 0 {
                    tracing::debug!(
                        patched = ps.patched,
                        unchanged = ps.unchanged,
                        "compacted changed peers"
                    );
                }
            }

            let stats = state.store.apply(&mut res, self.clock.as_ref());
            state.sticky.merge(&mut res);

            let nm = Arc::new(state.build_netmap(self.node_key));
            state.netmap = nm.clone();
            state.last_stats = stats;
            state.applied += 1;

            tracing::debug!(
                all_new = stats.all_new,
                added = stats.added,
                changed = stats.changed,
                removed = stats.removed,
                peers = nm.peers.len(),
                "applied map response"
            );
            let summary = nm.concise_summary();
            if summary != state.last_summary {
                tracing::info!(%summary, "netmap changed");
                state.last_summary = summary;
            }
            nm
        };

        if had_self_node {
            self.updater.self_node_changed(&nm);
        }
        self.updater.update_full_netmap(nm.clone());
        Ok(nm)
    }

    /// Last published netmap.
    pub fn netmap(&self) -> Arc<NetworkMap> {
        self.lock().netmap.clone()
    }

    pub fn peer_count(&self) -> usize {
        self.lock().store.len()
    }

    /// Stats from the most recently applied response.
    pub fn last_stats(&self) -> UpdateStats {
        self.lock().last_stats
    }

    /// Number of responses applied so far, keep-alives excluded.
    pub fn applied_count(&self) -> u64 {
        self.lock().applied
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

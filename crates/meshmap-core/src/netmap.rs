//! The reconciled, consumer-visible network map.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::derp::DerpMap;
use crate::dns::DnsConfig;
use crate::filter::FilterRule;
use crate::key::NodeKey;
use crate::node::{Node, NodeId, UserId};
use crate::user::UserProfile;

/// Snapshot of the local node's view of the mesh.
///
/// Built by the map session after each applied response and never mutated
/// afterwards. Peers are shared with the session's peer store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkMap {
    pub self_node: Option<Arc<Node>>,
    /// The client's own node key (the session identity).
    pub node_key: NodeKey,
    /// Peers sorted by ID. IDs are unique and strictly increasing.
    pub peers: Vec<Arc<Node>>,
    pub derp_map: Option<Arc<DerpMap>>,
    pub packet_filter: Arc<Vec<FilterRule>>,
    pub dns: Arc<DnsConfig>,
    pub domain: String,
    pub collect_services: bool,
    pub user_profiles: Arc<BTreeMap<UserId, UserProfile>>,
    pub health: Arc<Vec<String>>,
    pub domain_audit_log_id: String,
}

impl NetworkMap {
    /// Binary search by ID over the sorted peer list.
    pub fn peer_by_id(&self, id: NodeId) -> Option<&Arc<Node>> {
        self.peers
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|i| &self.peers[i])
    }

    pub fn peer_by_key(&self, key: &NodeKey) -> Option<&Arc<Node>> {
        self.peers.iter().find(|p| p.key == *key)
    }

    pub fn online_peer_count(&self) -> usize {
        self.peers.iter().filter(|p| p.is_online()).count()
    }

    /// Name of the self node, if known.
    pub fn self_name(&self) -> Option<&str> {
        self.self_node.as_deref().map(|n| n.name.as_str())
    }

    /// Key expiry of the self node.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.self_node.as_deref().and_then(|n| n.key_expiry)
    }

    pub fn user_profile(&self, id: UserId) -> Option<&UserProfile> {
        self.user_profiles.get(&id)
    }

    /// One-line summary of self and peer membership, for change logging.
    ///
    /// Only includes fields whose change is worth a log line at info level:
    /// the self node name and the set of peer IDs with their online state.
    pub fn concise_summary(&self) -> String {
        let mut s = String::with_capacity(32 + self.peers.len() * 8);
        let _ = write!(
            s,
            "self: {} peers:",
            self.self_name().filter(|n| !n.is_empty()).unwrap_or("?")
        );
        for p in &self.peers {
            let _ = write!(s, " {}{}", p.id, if p.is_online() { "+" } else { "-" });
        }
        s
    }
}

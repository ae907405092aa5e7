//! The map response: one message from the coordination server.
//!
//! Field presence carries meaning. Every sticky or patchable field is an
//! `Option` (or an empty-skipping collection where empty and absent mean the
//! same thing), so "not sent" and "sent as empty" survive a JSON round trip.

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::derp::{DerpMap, RegionId};
use crate::dns::DnsConfig;
use crate::error::MapResponseError;
use crate::filter::FilterRule;
use crate::key::{hex_bytes, DiscoKey, NodeKey};
use crate::node::{Node, NodeCapability, NodeId};
use crate::user::UserProfile;

/// Sparse update to one peer. `None` means "unchanged"; `Some` of an empty
/// collection means "cleared".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PeerChange {
    #[serde(rename = "NodeID")]
    pub node_id: NodeId,

    /// New home DERP region. Only the region is sent; the host part of the
    /// peer's DERP string is kept.
    #[serde(rename = "DERPRegion", default, skip_serializing_if = "Option::is_none")]
    pub derp_region: Option<RegionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<SocketAddr>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<NodeCapability>>,

    // Key rotation fields. The server may send these; the local diff never
    // produces them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<NodeKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disco_key: Option<DiscoKey>,
    #[serde(
        default,
        with = "hex_bytes::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub key_signature: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_expiry: Option<DateTime<Utc>>,
}

impl PeerChange {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            ..Default::default()
        }
    }

    /// Applies the fields present in this patch to `node`, leaving all
    /// others untouched.
    pub fn apply_to(&self, node: &mut Node) {
        if let Some(region) = self.derp_region {
            node.set_derp_region(region);
        }
        if let Some(cap) = self.cap {
            node.cap = cap;
        }
        if let Some(endpoints) = &self.endpoints {
            node.endpoints = endpoints.clone();
        }
        if let Some(online) = self.online {
            node.online = Some(online);
        }
        if let Some(last_seen) = self.last_seen {
            node.last_seen = Some(last_seen);
        }
        if let Some(capabilities) = &self.capabilities {
            node.capabilities = capabilities.clone();
        }
        if let Some(key) = self.key {
            node.key = key;
        }
        if let Some(disco_key) = self.disco_key {
            node.disco_key = disco_key;
        }
        if let Some(signature) = &self.key_signature {
            node.key_signature = signature.clone();
        }
        if let Some(expiry) = self.key_expiry {
            node.key_expiry = Some(expiry);
        }
    }
}

/// Tri-state boolean carried as `"true"` / `"false"` / absent.
///
/// Absent, the empty string and any unrecognized value all decode to
/// [`OptBool::Unset`], which means "keep whatever you had".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OptBool {
    #[default]
    Unset,
    True,
    False,
}

impl OptBool {
    pub fn get(self) -> Option<bool> {
        match self {
            OptBool::Unset => None,
            OptBool::True => Some(true),
            OptBool::False => Some(false),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, OptBool::Unset)
    }

    fn from_wire(s: &str) -> Self {
        match s {
            "true" => OptBool::True,
            "false" => OptBool::False,
            _ => OptBool::Unset,
        }
    }
}

impl From<bool> for OptBool {
    fn from(v: bool) -> Self {
        if v {
            OptBool::True
        } else {
            OptBool::False
        }
    }
}

impl Serialize for OptBool {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OptBool::Unset => serializer.serialize_str(""),
            OptBool::True => serializer.serialize_str("true"),
            OptBool::False => serializer.serialize_str("false"),
        }
    }
}

impl<'de> Deserialize<'de> for OptBool {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.as_deref().map(OptBool::from_wire).unwrap_or_default())
    }
}

/// One message from the coordination server.
///
/// A response may carry several kinds of peer delta at once; they are
/// applied in a fixed order by the session (see `PeerStore::apply`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapResponse {
    /// Set on keep-alive messages. A response with only this set carries no state.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub keep_alive: bool,

    /// The self node. Absent means unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,

    #[serde(rename = "DERPMap", default, skip_serializing_if = "Option::is_none")]
    pub derp_map: Option<DerpMap>,

    /// Complete peer set. When present (even empty) it replaces all peers and
    /// every delta field below is ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peers_changed: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peers_removed: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peers_changed_patch: Vec<PeerChange>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub online_change: BTreeMap<NodeId, bool>,
    /// `true` means "seen now", `false` means "last-seen unknown".
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub peer_seen_change: BTreeMap<NodeId, bool>,

    #[serde(rename = "DNSConfig", default, skip_serializing_if = "Option::is_none")]
    pub dns_config: Option<DnsConfig>,
    /// Tailnet name. Empty means unchanged.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(default, skip_serializing_if = "OptBool::is_unset")]
    pub collect_services: OptBool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_filter: Option<Vec<FilterRule>>,

    /// Profiles for users referenced by nodes in this response. Accumulated,
    /// never removed by omission.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_profiles: Vec<UserProfile>,
    /// Health warnings from the server. Absent means unchanged; present and
    /// empty means "all clear".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<Vec<String>>,
    #[serde(
        rename = "DomainDataPlaneAuditLogID",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub domain_data_plane_audit_log_id: String,
}

impl MapResponse {
    /// Whether this is a bare keep-alive with no state in it.
    pub fn is_keep_alive_only(&self) -> bool {
        self.keep_alive
            && *self
                == MapResponse {
                    keep_alive: true,
                    ..Default::default()
                }
    }

    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Checks the response for internally inconsistent fields.
    pub fn validate(&self) -> Result<(), MapResponseError> {
        if let Some(peers) = &self.peers {
            let mut seen = HashSet::with_capacity(peers.len());
            for p in peers {
                if !seen.insert(p.id) {
                    return Err(MapResponseError::DuplicatePeer(p.id));
                }
            }
        } else {
            let mut changed = HashSet::with_capacity(self.peers_changed.len());
            for p in &self.peers_changed {
                if !changed.insert(p.id) {
                    return Err(MapResponseError::DuplicateChangedPeer(p.id));
                }
            }
            if let Some(id) = self.peers_removed.iter().find(|id| changed.contains(*id)) {
                return Err(MapResponseError::ChangedAndRemoved(*id));
            }
            if let Some(pc) = self
                .peers_changed_patch
                .iter()
                .find(|pc| pc.derp_region == Some(0))
            {
                return Err(MapResponseError::ZeroDerpRegion(pc.node_id));
            }
        }

        if let Some(derp_map) = &self.derp_map {
            for (&key, region) in &derp_map.regions {
                if region.region_id != key {
                    return Err(MapResponseError::DerpRegionMismatch {
                        key,
                        region_id: region.region_id,
                    });
                }
                if let Some(node) = region.nodes.iter().find(|n| n.region_id != key) {
                    return Err(MapResponseError::DerpNodeRegionMismatch {
                        node: node.name.clone(),
                        node_region: node.region_id,
                        region: key,
                    });
                }
            }
        }

        if let Some(rules) = &self.packet_filter {
            for (i, rule) in rules.iter().enumerate() {
                if let Some(r) = rule.dst_ports.iter().find(|d| !d.ports.is_valid()) {
                    return Err(MapResponseError::InvalidPortRange {
                        rule: i,
                        first: r.ports.first,
                        last: r.ports.last,
                    });
                }
            }
        }
        Ok(())
    }
}

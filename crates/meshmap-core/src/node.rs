//! Peer (node) records as sent by the coordination server.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dns::Resolver;
use crate::key::{hex_bytes, DiscoKey, MachineKey, NodeKey};

/// Fake endpoint address meaning "reach this node over DERP". In a node's
/// `DERP` field the port component is the home region ID.
///
/// Mnemonic: 3.3.40 are the digits above the keys D, E, R, P.
pub const DERP_MAGIC_IP: &str = "127.3.3.40";

/// Numeric node identifier. Unique and stable for the node's lifetime.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque persistent node identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableNodeId(pub String);

impl StableNodeId {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// A capability token advertised by a node, e.g. `"https"` or a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeCapability(pub String);

impl From<&str> for NodeCapability {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A service a node reports listening on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Service {
    pub proto: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Host details reported by the node itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Hostinfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(rename = "OS", default, skip_serializing_if = "String::is_empty")]
    pub os: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
}

impl Hostinfo {
    pub fn is_empty(&self) -> bool {
        *self == Hostinfo::default()
    }
}

/// A node in the mesh, as seen by this client.
///
/// Nodes are immutable by convention once handed to the peer store: updates
/// produce a new value instead of editing a shared one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Node {
    #[serde(rename = "ID")]
    pub id: NodeId,
    #[serde(rename = "StableID", default, skip_serializing_if = "StableNodeId::is_empty")]
    pub stable_id: StableNodeId,

    /// Fully qualified DNS name, e.g. `"host.example.ts.net."`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "UserId::is_zero")]
    pub user: UserId,
    /// User who shared this node, if it is not owned by the viewing user's tailnet.
    #[serde(default, skip_serializing_if = "UserId::is_zero")]
    pub sharer: UserId,

    #[serde(default, skip_serializing_if = "NodeKey::is_zero")]
    pub key: NodeKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_expiry: Option<DateTime<Utc>>,
    #[serde(default, with = "hex_bytes", skip_serializing_if = "Vec::is_empty")]
    pub key_signature: Vec<u8>,
    #[serde(default, skip_serializing_if = "MachineKey::is_zero")]
    pub machine: MachineKey,
    #[serde(default, skip_serializing_if = "DiscoKey::is_zero")]
    pub disco_key: DiscoKey,

    /// Addresses assigned to the node, as CIDR prefixes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(rename = "AllowedIPs", default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_ips: Vec<String>,
    /// Direct-connect UDP endpoints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<SocketAddr>,
    /// Home relay as `"host:regionID"`.
    #[serde(rename = "DERP", default, skip_serializing_if = "String::is_empty")]
    pub derp: String,
    #[serde(default, skip_serializing_if = "Hostinfo::is_empty")]
    pub hostinfo: Hostinfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    /// Capability version of the node's client.
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub cap: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_routes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub machine_authorized: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<NodeCapability>,
    #[serde(rename = "UnsignedPeerAPIOnly", default, skip_serializing_if = "std::ops::Not::not")]
    pub unsigned_peer_api_only: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub expired: bool,

    /// Address this peer sees the local node as, when masquerading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_node_v4_masq_addr_for_this_peer: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_node_v6_masq_addr_for_this_peer: Option<Ipv6Addr>,

    #[serde(rename = "IsWireGuardOnly", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_wireguard_only: bool,
    #[serde(rename = "ExitNodeDNSResolvers", default, skip_serializing_if = "Vec::is_empty")]
    pub exit_node_dns_resolvers: Vec<Resolver>,

    /// Display name, derived locally by [`Node::init_display_names`].
    #[serde(skip)]
    pub computed_name: String,
    /// Display name with the hostname appended when it differs.
    #[serde(skip)]
    pub computed_name_with_host: String,
    #[serde(skip)]
    pub computed_host_if_different: String,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

/// Splits a `"host:regionID"` DERP string. Returns `None` unless the region
/// parses as a non-zero integer.
pub fn split_derp(derp: &str) -> Option<(&str, u32)> {
    let (host, region) = derp.rsplit_once(':')?;
    match region.parse::<u32>() {
        Ok(id) if id != 0 => Some((host, id)),
        _ => None,
    }
}

impl Node {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: NodeId(id),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Home DERP region, if the DERP field is set and well formed.
    pub fn derp_region(&self) -> Option<u32> {
        split_derp(&self.derp).map(|(_, region)| region)
    }

    /// Points the node at a new DERP region, keeping the current host part.
    pub fn set_derp_region(&mut self, region: u32) {
        let host = match self.derp.rsplit_once(':') {
            Some((host, _)) if !host.is_empty() => host,
            _ => DERP_MAGIC_IP,
        };
        self.derp = format!("{host}:{region}");
    }

    pub fn is_online(&self) -> bool {
        self.online.unwrap_or(false)
    }

    /// Fills in the computed display-name fields.
    ///
    /// `magic_dns_suffix` is the tailnet's DNS suffix (e.g. `"example.ts.net"`)
    /// and is trimmed from the node name when present.
    pub fn init_display_names(&mut self, magic_dns_suffix: &str) {
        let mut name = trim_dns_suffix(&self.name, magic_dns_suffix).to_string();
        let mut host_if_different = sanitize_hostname(&self.hostinfo.hostname);
        if name.eq_ignore_ascii_case(&host_if_different) {
            host_if_different.clear();
        }
        if name.is_empty() {
            if host_if_different.is_empty() {
                name = self.key.to_string();
            } else {
                name = std::mem::take(&mut host_if_different);
            }
        }
        self.computed_name_with_host = if host_if_different.is_empty() {
            name.clone()
        } else {
            format!("{name} ({host_if_different})")
        };
        self.computed_name = name;
        self.computed_host_if_different = host_if_different;
    }

    /// Display name, falling back to the raw name before display names are computed.
    pub fn display_name(&self) -> &str {
        if self.computed_name.is_empty() {
            &self.name
        } else {
            &self.computed_name
        }
    }
}

/// Trims a trailing dot and then `suffix` (as whole labels) from `name`.
pub fn trim_dns_suffix<'a>(name: &'a str, suffix: &str) -> &'a str {
    let name = name.strip_suffix('.').unwrap_or(name);
    let suffix = suffix.trim_matches('.');
    if suffix.is_empty() {
        return name;
    }
    match name.strip_suffix(suffix) {
        Some(rest) if rest.ends_with('.') => &rest[..rest.len() - 1],
        _ => name,
    }
}

/// DNS suffix of a fully qualified self-node name: everything after the
/// first label.
pub fn magic_dns_suffix(self_name: &str) -> &str {
    self_name.split_once('.').map(|(_, rest)| rest).unwrap_or("")
}

/// First label of `hostname`, lowercased, with characters outside
/// `[a-z0-9-]` replaced by `-`.
fn sanitize_hostname(hostname: &str) -> String {
    let label = hostname.split('.').next().unwrap_or("");
    let cleaned: String = label
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    cleaned.trim_matches('-').to_string()
}

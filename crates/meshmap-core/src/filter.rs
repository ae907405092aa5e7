//! Packet filter rules.

use serde::{Deserialize, Serialize};

/// Inclusive port range. `0..=65535` means all ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortRange {
    pub first: u16,
    pub last: u16,
}

impl PortRange {
    pub const ANY: PortRange = PortRange {
        first: 0,
        last: 65535,
    };

    pub fn single(port: u16) -> Self {
        Self {
            first: port,
            last: port,
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        self.first <= port && port <= self.last
    }

    pub fn is_valid(&self) -> bool {
        self.first <= self.last
    }
}

/// Destination address (or `"*"`) plus port range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetPortRange {
    #[serde(rename = "IP")]
    pub ip: String,
    pub ports: PortRange,
}

/// One accept rule: traffic from any of `src_ips` to any of `dst_ports`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilterRule {
    #[serde(rename = "SrcIPs", default)]
    pub src_ips: Vec<String>,
    #[serde(default)]
    pub dst_ports: Vec<NetPortRange>,
    /// IP protocol numbers. Empty means TCP, UDP and ICMP.
    #[serde(rename = "IPProto", default, skip_serializing_if = "Vec::is_empty")]
    pub ip_proto: Vec<i32>,
}

//! DERP relay topology, as pushed by the coordination server.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type RegionId = u32;

/// The set of relay regions a client may use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DerpMap {
    /// Tuning for home-region selection. Merged independently of `regions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_params: Option<DerpHomeParams>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub regions: BTreeMap<RegionId, DerpRegion>,

    /// Whether the client should drop any built-in default regions.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub omit_default_regions: bool,
}

impl DerpMap {
    /// Returns the sorted region IDs.
    pub fn region_ids(&self) -> Vec<RegionId> {
        self.regions.keys().copied().collect()
    }

    pub fn get_region(&self, id: RegionId) -> Option<&DerpRegion> {
        self.regions.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.home_params.is_none()
    }
}

/// Home-region selection parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DerpHomeParams {
    /// Per-region latency multipliers. `None` means "keep what you have";
    /// `Some` (even empty) replaces the previous scores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_score: Option<BTreeMap<RegionId, f64>>,
}

/// A geographic region running DERP relay node(s).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DerpRegion {
    #[serde(rename = "RegionID")]
    pub region_id: RegionId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region_code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region_name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub avoid: bool,
    #[serde(default)]
    pub nodes: Vec<DerpNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DerpNode {
    pub name: String,
    #[serde(rename = "RegionID")]
    pub region_id: RegionId,
    pub host_name: String,
    /// Forced IPv4 address, `"none"` to disable IPv4, empty to use DNS.
    #[serde(rename = "IPv4", default, skip_serializing_if = "String::is_empty")]
    pub ipv4: String,
    /// Forced IPv6 address, `"none"` to disable IPv6, empty to use DNS.
    #[serde(rename = "IPv6", default, skip_serializing_if = "String::is_empty")]
    pub ipv6: String,
    #[serde(rename = "STUNPort", default, skip_serializing_if = "is_zero_u16")]
    pub stun_port: u16,
    #[serde(rename = "STUNOnly", default, skip_serializing_if = "std::ops::Not::not")]
    pub stun_only: bool,
    #[serde(rename = "DERPPort", default, skip_serializing_if = "is_zero_u16")]
    pub derp_port: u16,
}

fn is_zero_u16(v: &u16) -> bool {
    *v == 0
}

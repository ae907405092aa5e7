//! DNS configuration pushed by the coordination server.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// A DNS resolver, addressed either by IP or by a DoH/DoT URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resolver {
    pub addr: String,

    /// Addresses to use for `addr` when it is a hostname, so that the
    /// resolver can be reached before DNS works.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bootstrap_resolution: Vec<IpAddr>,
}

/// Extra A/AAAA record served by the in-process resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DnsRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub r#type: String,
    pub value: String,
}

/// Client DNS configuration. Replaced wholesale whenever the server sends one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DnsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolvers: Vec<Resolver>,

    /// Split-DNS routes: suffix → resolvers. An empty resolver list means the
    /// suffix is served by the in-process resolver.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub routes: BTreeMap<String, Vec<Resolver>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_resolvers: Vec<Resolver>,

    /// Search domains.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,

    /// Whether MagicDNS names are answered.
    #[serde(default)]
    pub proxied: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nameservers: Vec<IpAddr>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cert_domains: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_records: Vec<DnsRecord>,
}

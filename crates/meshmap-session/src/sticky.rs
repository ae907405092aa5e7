//! Sticky field merge.
//!
//! The server omits top-level fields that have not changed since the last
//! response. Omission therefore means "keep what you have", never "clear".
//! Each field has its own rule for what counts as omitted.

use std::collections::BTreeMap;
use std::sync::Arc;

use meshmap_core::node::magic_dns_suffix;
use meshmap_core::{
    DerpMap, DnsConfig, FilterRule, MapResponse, Node, OptBool, UserId, UserProfile,
};

/// Merges an incoming relay map into the previous one.
///
/// An empty region map keeps the previous regions (and their
/// `omit_default_regions` flag). Home params merge on their own: absent
/// keeps the previous params, present with absent `region_score` keeps the
/// previous scores.
pub fn merge_derp_map(
    prev: Option<&Arc<DerpMap>>,
    incoming: Option<DerpMap>,
) -> Option<Arc<DerpMap>> {
    let Some(mut dm) = incoming else {
        return prev.cloned();
    };
    if let Some(last) = prev {
        if dm.regions.is_empty() {
            dm.regions = last.regions.clone();
            dm.omit_default_regions = last.omit_default_regions;
        }
        match dm.home_params.as_mut() {
            None => dm.home_params = last.home_params.clone(),
            Some(hp) if hp.region_score.is_none() => {
                hp.region_score = last
                    .home_params
                    .as_ref()
                    .and_then(|old| old.region_score.clone());
            }
            Some(_) => {}
        }
    }
    Some(Arc::new(dm))
}

/// Absent keeps; present (even empty) replaces.
pub fn merge_packet_filter(
    prev: &Arc<Vec<FilterRule>>,
    incoming: Option<Vec<FilterRule>>,
) -> Arc<Vec<FilterRule>> {
    match incoming {
        Some(rules) => Arc::new(rules),
        None => prev.clone(),
    }
}

/// Absent keeps; present replaces wholesale.
pub fn merge_dns_config(prev: &Arc<DnsConfig>, incoming: Option<DnsConfig>) -> Arc<DnsConfig> {
    match incoming {
        Some(dns) => Arc::new(dns),
        None => prev.clone(),
    }
}

/// Empty keeps; non-empty replaces. Used for the domain and the audit-log ID.
pub fn merge_string(prev: &mut String, incoming: String) {
    if !incoming.is_empty() {
        *prev = incoming;
    }
}

/// Unset keeps; `true`/`false` set.
pub fn merge_collect_services(prev: bool, incoming: OptBool) -> bool {
    incoming.get().unwrap_or(prev)
}

/// Present replaces (with display names computed); absent keeps.
pub fn merge_self_node(prev: Option<&Arc<Node>>, incoming: Option<Node>) -> Option<Arc<Node>> {
    match incoming {
        Some(mut node) => {
            let suffix = magic_dns_suffix(&node.name).to_string();
            node.init_display_names(&suffix);
            Some(Arc::new(node))
        }
        None => prev.cloned(),
    }
}

/// Upserts profiles by user ID. Omitted profiles are kept.
pub fn merge_user_profiles(
    prev: &Arc<BTreeMap<UserId, UserProfile>>,
    incoming: Vec<UserProfile>,
) -> Arc<BTreeMap<UserId, UserProfile>> {
    if incoming.is_empty() {
        return prev.clone();
    }
    let mut profiles = BTreeMap::clone(prev);
    for up in incoming {
        profiles.insert(up.id, up);
    }
    Arc::new(profiles)
}

/// Absent keeps; present (even empty) replaces.
pub fn merge_health(prev: &Arc<Vec<String>>, incoming: Option<Vec<String>>) -> Arc<Vec<String>> {
    match incoming {
        Some(h) => Arc::new(h),
        None => prev.clone(),
    }
}

/// Last-known value of every sticky top-level field.
#[derive(Debug, Clone)]
pub struct StickyFields {
    pub self_node: Option<Arc<Node>>,
    pub derp_map: Option<Arc<DerpMap>>,
    pub packet_filter: Arc<Vec<FilterRule>>,
    pub dns: Arc<DnsConfig>,
    pub domain: String,
    pub collect_services: bool,
    pub user_profiles: Arc<BTreeMap<UserId, UserProfile>>,
    pub health: Arc<Vec<String>>,
    pub domain_audit_log_id: String,
}

impl StickyFields {
    /// Empty state. `collect_services` starts at the given default.
    pub fn new(collect_services_default: bool) -> Self {
        Self {
            self_node: None,
            derp_map: None,
            packet_filter: Arc::default(),
            dns: Arc::default(),
            domain: String::new(),
            collect_services: collect_services_default,
            user_profiles: Arc::default(),
            health: Arc::default(),
            domain_audit_log_id: String::new(),
        }
    }

    /// Merges the sticky fields of `res`, moving them out of it. Peer fields
    /// are left in place.
    pub fn merge(&mut self, res: &mut MapResponse) {
        self.self_node = merge_self_node(self.self_node.as_ref(), res.node.take());
        self.derp_map = merge_derp_map(self.derp_map.as_ref(), res.derp_map.take());
        self.packet_filter = merge_packet_filter(&self.packet_filter, res.packet_filter.take());
        self.dns = merge_dns_config(&self.dns, res.dns_config.take());
        merge_string(&mut self.domain, std::mem::take(&mut res.domain));
        self.collect_services = merge_collect_services(self.collect_services, res.collect_services);
        self.user_profiles =
            merge_user_profiles(&self.user_profiles, std::mem::take(&mut res.user_profiles));
        self.health = merge_health(&self.health, res.health.take());
        merge_string(
            &mut self.domain_audit_log_id,
            std::mem::take(&mut res.domain_data_plane_audit_log_id),
        );
    }
}

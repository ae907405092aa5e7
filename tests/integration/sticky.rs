use std::collections::BTreeMap;

use meshmap_core::{DerpMap, UserId};
use serde_json::json;

use crate::*;

fn region_one() -> serde_json::Value {
    json!({
        "1": {
            "RegionID": 1,
            "RegionCode": "nyc",
            "Nodes": [{
                "Name": "1a",
                "RegionID": 1,
                "HostName": "derp1.example.com",
                "IPv4": "192.0.2.1"
            }]
        }
    })
}

fn derp(nm: &NetworkMap) -> &DerpMap {
    nm.derp_map.as_deref().expect("relay map should be set")
}

/// `{Regions: R1}` then an empty response keeps R1.
#[test]
fn test_relay_map_survives_omission() {
    let h = Harness::new();
    h.apply(json!({ "DERPMap": { "Regions": region_one() } }));
    let nm = h.apply(json!({}));

    let dm = derp(&nm);
    assert_eq!(dm.region_ids(), vec![1]);
    assert_eq!(dm.get_region(1).unwrap().nodes[0].host_name, "derp1.example.com");

    // an explicit map with no regions also keeps them
    let nm = h.apply(json!({ "DERPMap": {} }));
    assert_eq!(derp(&nm).regions.len(), 1);
}

/// Home params merge independently of regions.
#[test]
fn test_home_params() {
    let h = Harness::new();
    h.apply(json!({
        "DERPMap": {
            "Regions": region_one(),
            "HomeParams": { "RegionScore": { "1": 0.5 } }
        }
    }));

    let nm = h.apply(json!({ "DERPMap": { "HomeParams": {} } }));
    let scores = derp(&nm).home_params.as_ref().unwrap().region_score.clone();
    assert_eq!(scores, Some(BTreeMap::from([(1, 0.5)])));
    assert_eq!(derp(&nm).regions.len(), 1);

    let nm = h.apply(json!({ "DERPMap": { "HomeParams": { "RegionScore": {} } } }));
    let scores = derp(&nm).home_params.as_ref().unwrap().region_score.clone();
    assert_eq!(scores, Some(BTreeMap::new()));
}

/// Packet filter: absent keeps, explicit empty clears.
#[test]
fn test_packet_filter() {
    let h = Harness::new();
    h.apply(json!({
        "PacketFilter": [{
            "SrcIPs": ["100.64.0.0/10"],
            "DstPorts": [{ "IP": "*", "Ports": { "First": 22, "Last": 22 } }]
        }]
    }));

    let nm = h.apply(json!({ "Domain": "example.com" }));
    assert_eq!(nm.packet_filter.len(), 1);
    assert!(nm.packet_filter[0].dst_ports[0].ports.contains(22));

    let nm = h.apply(json!({ "PacketFilter": [] }));
    assert!(nm.packet_filter.is_empty());

    // null is the same as absent
    h.apply(json!({ "PacketFilter": [{ "SrcIPs": ["*"] }] }));
    let nm = h.apply(json!({ "PacketFilter": null }));
    assert_eq!(nm.packet_filter.len(), 1);
}

/// DNS config is replaced wholesale, never merged field by field.
#[test]
fn test_dns_config() {
    let h = Harness::new();
    h.apply(json!({
        "DNSConfig": {
            "Resolvers": [{ "Addr": "8.8.8.8" }],
            "Domains": ["example.com"]
        }
    }));
    let nm = h.apply(json!({}));
    assert_eq!(nm.dns.resolvers[0].addr, "8.8.8.8");

    let nm = h.apply(json!({ "DNSConfig": { "Domains": ["other.com"] } }));
    assert!(nm.dns.resolvers.is_empty());
    assert_eq!(nm.dns.domains, vec!["other.com".to_string()]);
}

/// Collect-services: absent and "" keep, "true"/"false" set.
#[test]
fn test_collect_services() {
    let h = Harness::new();
    assert!(!h.apply(json!({})).collect_services);

    let steps = [
        (json!({ "CollectServices": "false" }), false),
        (json!({ "CollectServices": "false" }), false),
        (json!({ "CollectServices": "true" }), true),
        (json!({ "CollectServices": "" }), true),
        (json!({}), true),
        (json!({ "CollectServices": "bogus" }), true),
        (json!({ "CollectServices": "false" }), false),
    ];
    for (i, (res, want)) in steps.into_iter().enumerate() {
        assert_eq!(h.apply(res).collect_services, want, "step {i}");
    }
}

/// Domain and audit-log ID: empty keeps.
#[test]
fn test_strings() {
    let h = Harness::new();
    h.apply(json!({ "Domain": "foo.com", "DomainDataPlaneAuditLogID": "log-1" }));
    let nm = h.apply(json!({ "Domain": "" }));
    assert_eq!(nm.domain, "foo.com");
    assert_eq!(nm.domain_audit_log_id, "log-1");

    let nm = h.apply(json!({ "Domain": "bar.com" }));
    assert_eq!(nm.domain, "bar.com");
}

/// Self node: absent keeps, present replaces.
#[test]
fn test_self_node() {
    let h = Harness::new();
    h.apply(json!({ "Node": { "ID": 100, "Name": "me.example.ts.net.", "Cap": 1 } }));
    let nm = h.apply(json!({}));
    assert_eq!(nm.self_node.as_deref().unwrap().cap, 1);

    let nm = h.apply(json!({ "Node": { "ID": 100, "Name": "me.example.ts.net.", "Cap": 2 } }));
    assert_eq!(nm.self_node.as_deref().unwrap().cap, 2);
    assert_eq!(*h.recorder.self_changes.lock().unwrap(), 2);
}

/// User profiles accumulate across responses.
#[test]
fn test_user_profiles_accumulate() {
    let h = Harness::new();
    h.apply(json!({ "UserProfiles": [{ "ID": 1, "LoginName": "alice@example.com" }] }));
    h.apply(json!({ "UserProfiles": [{ "ID": 2, "LoginName": "bob@example.com" }] }));
    let nm = h.apply(json!({
        "UserProfiles": [{ "ID": 1, "LoginName": "alice@example.com", "DisplayName": "Alice" }]
    }));

    assert_eq!(nm.user_profiles.len(), 2);
    assert_eq!(nm.user_profile(UserId(1)).unwrap().display_name, "Alice");
    assert_eq!(nm.user_profile(UserId(2)).unwrap().login_name, "bob@example.com");
}

/// Health: absent keeps, explicit empty clears.
#[test]
fn test_health() {
    let h = Harness::new();
    h.apply(json!({ "Health": ["clock skew"] }));
    assert_eq!(*h.apply(json!({})).health, vec!["clock skew".to_string()]);
    assert!(h.apply(json!({ "Health": [] })).health.is_empty());
}

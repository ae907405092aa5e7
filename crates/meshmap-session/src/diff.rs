//! Minimal patch between two snapshots of one peer.
//!
//! The equal path is hot (every peer of every incremental response during
//! patch compaction) and must not allocate. Comparisons are done on borrowed
//! fields; a `PeerChange` is only built once a patchable field differs.

use meshmap_core::node::{split_derp, Node, DERP_MAGIC_IP};
use meshmap_core::PeerChange;

/// Result of comparing two snapshots of the same peer.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerDiff {
    /// All fields equal.
    Unchanged,
    /// Only patchable fields differ; the patch carries exactly those.
    Patch(PeerChange),
    /// A field without a patch representation differs. The caller must
    /// replace the peer wholesale.
    NotPatchable,
}

impl PeerDiff {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, PeerDiff::Unchanged)
    }
}

/// Compares `was` (the stored snapshot) with `now` (a candidate replacement).
pub fn peer_change_diff(was: &Node, now: &Node) -> PeerDiff {
    if !identity_eq(was, now) {
        return PeerDiff::NotPatchable;
    }

    let mut patch: Option<PeerChange> = None;
    macro_rules! pc {
        () => {
            patch.get_or_insert_with(|| PeerChange::new(now.id))
        };
    }

    if was.derp != now.derp {
        match derp_region_patch(&was.derp, &now.derp) {
            Some(region) => pc!().derp_region = Some(region),
            None => return PeerDiff::NotPatchable,
        }
    }
    if was.endpoints != now.endpoints {
        pc!().endpoints = Some(now.endpoints.clone());
    }
    if was.cap != now.cap {
        pc!().cap = Some(now.cap);
    }
    if was.last_seen != now.last_seen {
        match now.last_seen {
            Some(t) => pc!().last_seen = Some(t),
            None => return PeerDiff::NotPatchable,
        }
    }
    if was.online != now.online {
        match now.online {
            Some(v) => pc!().online = Some(v),
            None => return PeerDiff::NotPatchable,
        }
    }
    if was.capabilities != now.capabilities {
        pc!().capabilities = Some(now.capabilities.clone());
    }

    match patch {
        Some(pc) => PeerDiff::Patch(pc),
        None => PeerDiff::Unchanged,
    }
}

/// Fields with no patch representation. Display names are derived locally
/// and deliberately left out.
fn identity_eq(a: &Node, b: &Node) -> bool {
    a.id == b.id
        && a.stable_id == b.stable_id
        && a.name == b.name
        && a.user == b.user
        && a.sharer == b.sharer
        && a.key == b.key
        && a.key_expiry == b.key_expiry
        && a.key_signature == b.key_signature
        && a.machine == b.machine
        && a.disco_key == b.disco_key
        && a.addresses == b.addresses
        && a.allowed_ips == b.allowed_ips
        && a.hostinfo == b.hostinfo
        && a.created == b.created
        && a.tags == b.tags
        && a.primary_routes == b.primary_routes
        && a.machine_authorized == b.machine_authorized
        && a.unsigned_peer_api_only == b.unsigned_peer_api_only
        && a.expired == b.expired
        && a.self_node_v4_masq_addr_for_this_peer == b.self_node_v4_masq_addr_for_this_peer
        && a.self_node_v6_masq_addr_for_this_peer == b.self_node_v6_masq_addr_for_this_peer
        && a.is_wireguard_only == b.is_wireguard_only
        && a.exit_node_dns_resolvers == b.exit_node_dns_resolvers
}

/// Region to put in a patch when the DERP string changes from `was` to
/// `now`, or `None` if the change can't be expressed as a region alone.
///
/// A patch carries no host, so the host must stay the same. A peer with no
/// DERP value gets the magic DERP address when patched. The region text must
/// be what applying the patch would write back (no sign, no leading zeros).
fn derp_region_patch(was: &str, now: &str) -> Option<u32> {
    let (new_host, region) = split_derp(now)?;
    let text = &now[new_host.len() + 1..];
    if text.starts_with('0') || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let old_host = match was.rsplit_once(':') {
        Some((host, _)) if !host.is_empty() => host,
        _ => DERP_MAGIC_IP,
    };
    (new_host == old_host).then_some(region)
}

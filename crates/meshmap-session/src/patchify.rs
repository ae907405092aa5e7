//! Rewrites full peer entries of an incremental response
//! into patches when the stored peer differs only in patchable fields.

use meshmap_core::MapResponse;

use crate::diff::{peer_change_diff, PeerDiff};
use crate::peer_store::PeerStore;

/// Counts from one compaction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchifyStats {
    /// Entries dropped because nothing changed.
    pub unchanged: usize,
    /// Entries rewritten as patches.
    pub patched: usize,
}

/// Rewrites `res.peers_changed` against the stored peers.
///
/// Unchanged entries are dropped, patchable ones move to
/// `res.peers_changed_patch`, and the rest stay in their original order.
/// Responses with a full peer list are left untouched.
pub fn patchify_peers_changed(store: &PeerStore, res: &mut MapResponse) -> PatchifyStats {
    let mut stats = PatchifyStats::default();
    if res.peers.is_some() || res.peers_changed.is_empty() {
        return stats;
    }

    let changed = std::mem::take(&mut res.peers_changed);
    let mut kept = Vec::with_capacity(changed.len());
    for node in changed {
        let Some(was) = store.get(node.id) else {
            kept.push(node);
            continue;
        };
        match peer_change_diff(was, &node) {
            PeerDiff::Unchanged => stats.unchanged += 1,
            PeerDiff::Patch(pc) => {
                stats.patched += 1;
                res.peers_changed_patch.push(pc);
            }
            PeerDiff::NotPatchable => kept.push(node),
        }
    }
    res.peers_changed = kept;
    stats
}

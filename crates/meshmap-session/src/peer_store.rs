//! The peer ID to node mapping plus its sorted view.

use std::collections::HashMap;
use std::sync::Arc;

use meshmap_core::{MapResponse, Node, NodeId, PeerChange};

use crate::clock::Clock;

/// What one response did to the peer set. For logging only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// The response carried a complete peer list.
    pub all_new: bool,
    pub added: usize,
    pub changed: usize,
    pub removed: usize,
}

impl UpdateStats {
    pub fn is_empty(&self) -> bool {
        *self == UpdateStats::default()
    }
}

/// Owns every known peer.
///
/// `sorted` always holds the same nodes as `peers`, ordered by ID.
#[derive(Debug, Default)]
pub struct PeerStore {
    peers: HashMap<NodeId, Arc<Node>>,
    sorted: Vec<Arc<Node>>,
}

impl PeerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<&Arc<Node>> {
        self.peers.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.peers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Peers ordered by ID.
    pub fn sorted(&self) -> &[Arc<Node>] {
        &self.sorted
    }

    /// Applies the peer fields of `res`, in order: full replace, upsert,
    /// remove, patch, online toggles, seen toggles. A full peer list skips
    /// all the delta fields.
    ///
    /// Peer fields are moved out of `res`.
    pub fn apply(&mut self, res: &mut MapResponse, clock: &dyn Clock) -> UpdateStats {
        let mut stats = UpdateStats::default();

        if let Some(full) = res.peers.take() {
            stats.all_new = true;
            let mut next = HashMap::with_capacity(full.len());
            for node in full {
                if self.peers.contains_key(&node.id) {
                    stats.changed += 1;
                } else {
                    stats.added += 1;
                }
                next.insert(node.id, Arc::new(node));
            }
            stats.removed = self.peers.keys().filter(|id| !next.contains_key(id)).count();
            self.peers = next;
            self.rebuild_sorted();
            return stats;
        }

        for node in std::mem::take(&mut res.peers_changed) {
            match self.peers.insert(node.id, Arc::new(node)) {
                Some(_) => stats.changed += 1,
                None => stats.added += 1,
            }
        }

        for id in &res.peers_removed {
            if self.peers.remove(id).is_some() {
                stats.removed += 1;
            }
        }

        for pc in &res.peers_changed_patch {
            if self.patch(pc) {
                stats.changed += 1;
            }
        }

        for (&id, &online) in &res.online_change {
            if self.update(id, |n| n.online = Some(online)) {
                stats.changed += 1;
            }
        }

        if !res.peer_seen_change.is_empty() {
            let now = clock.now();
            for (&id, &seen) in &res.peer_seen_change {
                let last_seen = seen.then_some(now);
                if self.update(id, |n| n.last_seen = last_seen) {
                    stats.changed += 1;
                }
            }
        }

        if !stats.is_empty() {
            self.rebuild_sorted();
        }
        stats
    }

    /// Applies one patch. Returns false if the peer is unknown.
    pub fn patch(&mut self, pc: &PeerChange) -> bool {
        self.update(pc.node_id, |n| pc.apply_to(n))
    }

    /// Replaces the stored node with an edited copy. Shared snapshots of the
    /// old node are left alone.
    fn update(&mut self, id: NodeId, edit: impl FnOnce(&mut Node)) -> bool {
        match self.peers.get_mut(&id) {
            Some(slot) => {
                edit(Arc::make_mut(slot));
                true
            }
            None => false,
        }
    }

    /// Rebuilds the sorted sequence from the mapping.
    pub fn rebuild_sorted(&mut self) {
        self.sorted.clear();
        self.sorted.extend(self.peers.values().cloned());
        self.sorted.sort_by_key(|n| n.id);
    }
}

use crate::derp::RegionId;
use crate::node::NodeId;

/// A map response whose fields contradict each other. Such a response is
/// rejected as a whole; none of it is applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapResponseError {
    #[error("peer {0} listed more than once in Peers")]
    DuplicatePeer(NodeId),
    #[error("peer {0} listed more than once in PeersChanged")]
    DuplicateChangedPeer(NodeId),
    #[error("peer {0} is both changed and removed")]
    ChangedAndRemoved(NodeId),
    /// Region 0 is rejected outright; it is not read as an omitted region.
    #[error("patch for peer {0} sets DERP region 0")]
    ZeroDerpRegion(NodeId),
    #[error("DERP region keyed {key} declares RegionID {region_id}")]
    DerpRegionMismatch { key: RegionId, region_id: RegionId },
    #[error("DERP node {node:?} declares RegionID {node_region} inside region {region}")]
    DerpNodeRegionMismatch {
        node: String,
        node_region: RegionId,
        region: RegionId,
    },
    #[error("packet filter rule {rule} has inverted port range {first}-{last}")]
    InvalidPortRange { rule: usize, first: u16, last: u16 },
}

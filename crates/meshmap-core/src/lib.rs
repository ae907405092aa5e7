//! meshmap-core — wire types, the network map, and configuration.
//! The session crate and the daemon depend on this one.

pub mod config;
pub mod derp;
pub mod dns;
pub mod error;
pub mod filter;
pub mod key;
pub mod map_response;
pub mod netmap;
pub mod node;
pub mod user;

pub use derp::{DerpHomeParams, DerpMap, DerpNode, DerpRegion, RegionId};
pub use dns::{DnsConfig, Resolver};
pub use error::MapResponseError;
pub use filter::{FilterRule, NetPortRange, PortRange};
pub use key::{DiscoKey, MachineKey, NodeKey};
pub use map_response::{MapResponse, OptBool, PeerChange};
pub use netmap::NetworkMap;
pub use node::{Hostinfo, Node, NodeCapability, NodeId, StableNodeId, UserId, DERP_MAGIC_IP};
pub use user::UserProfile;

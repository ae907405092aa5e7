//! Reconciles a stream of map responses into network maps.
//!
//! [`MapSession`] owns the peer store and the sticky top-level fields for one
//! control connection and hands each assembled [`NetworkMap`] to a
//! [`NetmapUpdater`].
//!
//! [`NetworkMap`]: meshmap_core::NetworkMap

pub mod clock;
pub mod diff;
pub mod notify;
pub mod patchify;
pub mod peer_store;
pub mod session;
pub mod sticky;

pub use clock::{Clock, ManualClock, SystemClock};
pub use diff::{peer_change_diff, PeerDiff};
pub use notify::{NetmapUpdater, WatchUpdater};
pub use patchify::{patchify_peers_changed, PatchifyStats};
pub use peer_store::{PeerStore, UpdateStats};
pub use session::{MapSession, SessionError};
pub use sticky::StickyFields;

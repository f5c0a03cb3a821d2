//! Synchronization scratch rebuilt every tick.

pub mod node_profile;
pub mod tree_profile;

pub use node_profile::{slot_of, Contribution, NodeSyncProfile, SyncSlot};
pub use tree_profile::{TreeSyncProfile, DEFAULT_MAX_SYNC_POINTS};

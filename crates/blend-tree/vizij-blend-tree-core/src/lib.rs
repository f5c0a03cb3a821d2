//! Vizij Blend Tree Core (engine-agnostic)
//!
//! Drives a hierarchical animation blend graph one tick at a time and keeps the
//! clips it blends in step with each other. Clips publish how far they are
//! towards their next sync point; every other clip sharing that event is
//! retimed so they all reach it together, and newly activated clips jump
//! straight to the matching phase.
//!
//! A [`BlendTree`] is built once with [`BlendTreeBuilder`] and shared. A
//! [`Player`] owns the per-run state for one tree and writes poses into a
//! [`PosesSink`].

pub mod clip;
pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod listener;
pub mod mapper;
pub mod player;
pub mod pose;
pub mod runtime;
pub mod state;
pub mod sync;
pub mod track;
pub mod tree;
pub mod variable;

// Re-exports for consumers (adapters)
pub use clip::{AnimationClip, BoneKey, BoneTrack, SnapshotClip};
pub use config::Config;
pub use error::BlendTreeError;
pub use events::TriggeredEvents;
pub use ids::{EventId, NodeId, VariableId};
pub use listener::{ListenerHandle, PlayerListener};
pub use mapper::{SkeletonMapper, SkeletonMapperRuntime};
pub use player::Player;
pub use pose::{PosesSink, Skeleton, Transform};
pub use runtime::{Crossfade, NodeRuntime};
pub use state::{NodeState, PlayerState};
pub use sync::{Contribution, NodeSyncProfile, SyncSlot, TreeSyncProfile};
pub use track::{SyncPoint, TimelineTrack};
pub use tree::{
    AnimationNode, BlendTree, BlendTreeBuilder, Blender1DNode, NodeKind, Operand, SelectorNode,
    StateMachineNode, TransitionTrigger,
};
pub use variable::{compare, CompareOp, VariableKind, VariableValue};

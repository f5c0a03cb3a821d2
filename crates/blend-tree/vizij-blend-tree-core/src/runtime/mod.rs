//! Per-player node runtime.

pub mod layout;
pub(crate) mod nodes;

pub use layout::{Crossfade, NodeRuntime, RuntimeData};

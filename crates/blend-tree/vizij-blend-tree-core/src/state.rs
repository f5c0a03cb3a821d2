use serde::{Deserialize, Serialize};

/// Activation state of a blend-tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeState {
    /// Not part of the active blend
    #[default]
    Inactive,
    /// Activated this tick; aligns to the tree profile on its first synchronize
    ToSynchronize,
    /// Playing and publishing its progress to the tree profile
    Active,
}

impl NodeState {
    /// Get the name of this node state
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::ToSynchronize => "to_synchronize",
            Self::Active => "active",
        }
    }

    /// Check if the node takes part in the blend (active or about to be)
    #[inline]
    pub fn is_running(&self) -> bool {
        !matches!(self, Self::Inactive)
    }

    /// Check if the node publishes to the tree sync profile
    #[inline]
    pub fn publishes_progress(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Lifecycle state of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerState {
    /// No runtime layout; `sample_poses` is a no-op
    #[default]
    Stopped,
    /// Between `on_started` and `on_finished`
    Running,
}

impl PlayerState {
    /// Get the name of this player state
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
        }
    }

    /// Check if the player is running
    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_state_flags() {
        assert!(!NodeState::Inactive.is_running());
        assert!(NodeState::ToSynchronize.is_running());
        assert!(!NodeState::ToSynchronize.publishes_progress());
        assert!(NodeState::Active.publishes_progress());
        assert_eq!(NodeState::default().name(), "inactive");
    }
}

//! Error types for blend-tree definitions.
//!
//! Only tree construction can fail. The player itself never returns errors:
//! degraded setups are reported through `log` and leave the player disabled or
//! in pass-through mode.

use crate::ids::{EventId, NodeId, VariableId};
use crate::variable::VariableKind;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum BlendTreeError {
    /// The builder was never given a root node
    #[error("Blend tree has no root node")]
    MissingRoot,

    /// A node handle that the builder never issued
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),

    /// An event handle that the builder never issued
    #[error("Unknown event: {0:?}")]
    UnknownEvent(EventId),

    /// A variable handle that the builder never issued
    #[error("Unknown variable: {0:?}")]
    UnknownVariable(VariableId),

    /// Two names registered for the same table
    #[error("Duplicate {table} name: {name}")]
    DuplicateName { table: &'static str, name: String },

    /// A node listed as the child of more than one composite
    #[error("Node '{name}' has more than one parent")]
    SharedNode { name: String },

    /// A node reachable from itself
    #[error("Node '{name}' is part of a cycle")]
    Cycle { name: String },

    /// A composite without children
    #[error("Composite node '{name}' has no children")]
    EmptyComposite { name: String },

    /// Variable kind not accepted by the node that reads it
    #[error("Variable '{variable}' used by '{node}' must be {expected}, got {actual:?}")]
    VariableKindMismatch {
        node: String,
        variable: String,
        expected: &'static str,
        actual: VariableKind,
    },

    /// Sync point or clip event outside of [0, 1]
    #[error("Progress {progress} out of range [0, 1] in node '{node}'")]
    InvalidProgress { node: String, progress: f32 },

    /// Clip with a non-positive duration
    #[error("Clip of node '{node}' has invalid duration {duration}")]
    InvalidDuration { node: String, duration: f32 },

    /// Negative or non-finite cross-fade time
    #[error("Invalid blend time {blend_time} in node '{node}'")]
    InvalidBlendTime { node: String, blend_time: f32 },

    /// Transition endpoint that is not a state of its machine
    #[error("Transition in '{machine}' references '{state}', which is not one of its states")]
    InvalidTransition { machine: String, state: String },
}

impl BlendTreeError {
    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingRoot
            | Self::UnknownNode(_)
            | Self::SharedNode { .. }
            | Self::Cycle { .. }
            | Self::EmptyComposite { .. }
            | Self::InvalidTransition { .. } => "structure",
            Self::UnknownEvent(_) | Self::UnknownVariable(_) | Self::DuplicateName { .. } => {
                "table"
            }
            Self::VariableKindMismatch { .. }
            | Self::InvalidProgress { .. }
            | Self::InvalidDuration { .. }
            | Self::InvalidBlendTime { .. } => "validation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(BlendTreeError::MissingRoot.category(), "structure");
        assert_eq!(BlendTreeError::UnknownEvent(EventId(3)).category(), "table");
        let invalid = BlendTreeError::InvalidProgress {
            node: "walk".to_string(),
            progress: 1.5,
        };
        assert_eq!(invalid.category(), "validation");
    }

    #[test]
    fn test_error_messages() {
        let err = BlendTreeError::EmptyComposite {
            name: "locomotion".to_string(),
        };
        assert_eq!(err.to_string(), "Composite node 'locomotion' has no children");
    }
}

//! Per-player runtime arena.
//!
//! Indexed by the handles the tree builder issued, so one immutable tree can
//! drive any number of players, each with its own layout.

use log::warn;

use crate::ids::{NodeId, VariableId};
use crate::pose::Transform;
use crate::state::NodeState;
use crate::sync::NodeSyncProfile;
use crate::track::TimelineTrack;
use crate::tree::{BlendTree, NodeKind};
use crate::variable::VariableValue;

/// Cross-fade between the current child and an incoming one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Crossfade {
    pub current: Option<NodeId>,
    pub target: Option<NodeId>,
    pub blend_time: f32,
    pub elapsed: f32,
}

impl Crossfade {
    /// Share of the target in [0, 1]; 1 for an instant switch.
    pub fn progress(&self) -> f32 {
        if self.blend_time <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.blend_time).clamp(0.0, 1.0)
        }
    }

    #[inline]
    pub fn is_blending(&self) -> bool {
        self.target.is_some()
    }

    pub fn start(&mut self, target: NodeId, blend_time: f32) {
        self.target = Some(target);
        self.blend_time = blend_time;
        self.elapsed = 0.0;
    }

    /// Promotes the target; returns the node that faded out.
    pub fn finish(&mut self) -> Option<NodeId> {
        let previous = self.current;
        self.current = self.target.take();
        self.elapsed = 0.0;
        previous
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum KindRuntime {
    Animation {
        track: Option<TimelineTrack>,
    },
    Blender1D {
        segment: Option<usize>,
        weight: f32,
    },
    Selector {
        fade: Crossfade,
    },
    StateMachine {
        fade: Crossfade,
        transition: Option<usize>,
    },
}

impl KindRuntime {
    fn for_node(kind: &NodeKind) -> Self {
        match kind {
            NodeKind::Animation(anim) => KindRuntime::Animation {
                track: anim.clip.as_ref().map(|clip| {
                    TimelineTrack::new(anim.sync_points.clone(), clip.duration(), anim.looped)
                }),
            },
            NodeKind::Blender1D(_) => KindRuntime::Blender1D {
                segment: None,
                weight: 0.0,
            },
            NodeKind::Selector(_) => KindRuntime::Selector {
                fade: Crossfade::default(),
            },
            NodeKind::StateMachine(_) => KindRuntime::StateMachine {
                fade: Crossfade::default(),
                transition: None,
            },
        }
    }

    /// Back to the freshly built state, keeping allocations.
    pub(crate) fn reset(&mut self) {
        match self {
            KindRuntime::Animation { track } => {
                if let Some(track) = track {
                    track.reset_to(0.0);
                }
            }
            KindRuntime::Blender1D { segment, weight } => {
                *segment = None;
                *weight = 0.0;
            }
            KindRuntime::Selector { fade } => *fade = Crossfade::default(),
            KindRuntime::StateMachine { fade, transition } => {
                *fade = Crossfade::default();
                *transition = None;
            }
        }
    }

    pub(crate) fn fade(&self) -> Option<&Crossfade> {
        match self {
            KindRuntime::Selector { fade } | KindRuntime::StateMachine { fade, .. } => Some(fade),
            _ => None,
        }
    }

    pub(crate) fn fade_mut(&mut self) -> Option<&mut Crossfade> {
        match self {
            KindRuntime::Selector { fade } | KindRuntime::StateMachine { fade, .. } => Some(fade),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeRuntime {
    pub(crate) state: NodeState,
    pub(crate) playback_speed: f32,
    pub(crate) pose: Vec<Transform>,
    pub(crate) sync: NodeSyncProfile,
    pub(crate) active_children: Vec<NodeId>,
    pub(crate) kind: KindRuntime,
}

impl NodeRuntime {
    #[inline]
    pub fn state(&self) -> NodeState {
        self.state
    }

    #[inline]
    pub fn playback_speed(&self) -> f32 {
        self.playback_speed
    }

    /// Pose generated during the last sample.
    #[inline]
    pub fn pose(&self) -> &[Transform] {
        &self.pose
    }

    /// Profile committed during the last synchronize.
    #[inline]
    pub fn sync_profile(&self) -> &NodeSyncProfile {
        &self.sync
    }

    #[inline]
    pub fn active_children(&self) -> &[NodeId] {
        &self.active_children
    }

    pub fn track(&self) -> Option<&TimelineTrack> {
        match &self.kind {
            KindRuntime::Animation { track } => track.as_ref(),
            _ => None,
        }
    }

    /// Cross-fade state of selectors and state machines.
    pub fn crossfade(&self) -> Option<&Crossfade> {
        self.kind.fade()
    }

    /// Transition a state machine is currently running, by index.
    pub fn active_transition(&self) -> Option<usize> {
        match &self.kind {
            KindRuntime::StateMachine { transition, .. } => *transition,
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeData {
    nodes: Vec<NodeRuntime>,
    variables: Vec<VariableValue>,
    bone_count: usize,
}

impl RuntimeData {
    /// Allocates node and variable storage for `tree`, with poses of
    /// `bone_count` bones.
    pub fn new(tree: &BlendTree, bone_count: usize) -> Self {
        let nodes = tree
            .nodes()
            .map(|(id, def)| NodeRuntime {
                state: NodeState::Inactive,
                playback_speed: 1.0,
                pose: vec![Transform::IDENTITY; bone_count],
                sync: NodeSyncProfile::new(Some(id)),
                active_children: Vec::new(),
                kind: KindRuntime::for_node(&def.kind),
            })
            .collect();
        let variables = tree.variables().iter().map(|v| v.default).collect();
        Self {
            nodes,
            variables,
            bone_count,
        }
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bone_count
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&NodeRuntime> {
        self.nodes.get(id.index())
    }

    #[inline]
    pub(crate) fn node_ref(&self, id: NodeId) -> &NodeRuntime {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeRuntime {
        &mut self.nodes[id.index()]
    }

    #[inline]
    pub fn variable(&self, id: VariableId) -> Option<VariableValue> {
        self.variables.get(id.index()).copied()
    }

    /// Stores a runtime value. The kind must match the declaration.
    pub fn set_variable(&mut self, id: VariableId, value: VariableValue) -> bool {
        match self.variables.get_mut(id.index()) {
            Some(slot) if slot.kind() == value.kind() => {
                *slot = value;
                true
            }
            Some(slot) => {
                warn!(
                    "variable {:?} is {:?}; ignoring {:?} value",
                    id,
                    slot.kind(),
                    value.kind()
                );
                false
            }
            None => {
                warn!("variable {:?} out of range", id);
                false
            }
        }
    }
}

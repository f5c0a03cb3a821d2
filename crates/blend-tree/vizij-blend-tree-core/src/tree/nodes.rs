//! Node definitions. Immutable once the tree is built; per-player state lives
//! in the runtime arena.

use std::sync::Arc;

use crate::clip::AnimationClip;
use crate::ids::{EventId, NodeId, VariableId};
use crate::track::SyncPoint;
use crate::variable::{CompareOp, VariableValue};

/// Tree event fired when a clip's playhead crosses `progress`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClipEvent {
    pub event: EventId,
    pub progress: f32,
}

/// Leaf playing one clip.
#[derive(Clone, Debug, Default)]
pub struct AnimationNode {
    pub clip: Option<Arc<dyn AnimationClip>>,
    pub looped: bool,
    pub sync_points: Vec<SyncPoint>,
    pub events: Vec<ClipEvent>,
}

impl AnimationNode {
    pub fn new(clip: Arc<dyn AnimationClip>) -> Self {
        Self {
            clip: Some(clip),
            ..Self::default()
        }
    }

    pub fn looped(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }

    pub fn with_sync_point(mut self, event: EventId, progress: f32) -> Self {
        self.sync_points.push(SyncPoint { event, progress });
        self
    }

    pub fn with_event(mut self, event: EventId, progress: f32) -> Self {
        self.events.push(ClipEvent { event, progress });
        self
    }

    /// Clip duration, or 0 without a clip.
    pub fn duration(&self) -> f32 {
        self.clip.as_ref().map(|c| c.duration()).unwrap_or(0.0)
    }
}

/// Blends the two children surrounding a control value on a parameter line.
///
/// Children sorted by parameter value form alternating point and span
/// segments: `(a,a) (a,b) (b,b) (b,c) (c,c)`. A control value sitting on a
/// child's parameter plays that child alone; one in between blends its two
/// neighbours linearly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Blender1DNode {
    pub control: Option<VariableId>,
    children: Vec<NodeId>,
    param_values: Vec<f32>,
    segments: Vec<(usize, usize)>,
}

impl Blender1DNode {
    pub fn new(control: VariableId) -> Self {
        Self {
            control: Some(control),
            ..Self::default()
        }
    }

    pub fn with_child(mut self, child: NodeId, param_value: f32) -> Self {
        self.children.push(child);
        self.param_values.push(param_value);
        self.rebuild_segments();
        self
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn param_values(&self) -> &[f32] {
        &self.param_values
    }

    /// `(start, end)` child indices per segment.
    #[inline]
    pub fn segments(&self) -> &[(usize, usize)] {
        &self.segments
    }

    fn rebuild_segments(&mut self) {
        let mut order: Vec<usize> = (0..self.children.len()).collect();
        order.sort_by(|a, b| self.param_values[*a].total_cmp(&self.param_values[*b]));

        self.segments.clear();
        for (k, &i) in order.iter().enumerate() {
            self.segments.push((i, i));
            if let Some(&next) = order.get(k + 1) {
                self.segments.push((i, next));
            }
        }
    }

    /// Segment index and the end child's blend weight for `value`. The value
    /// is clamped to the parameter range. `None` without children.
    pub fn locate(&self, value: f32) -> Option<(usize, f32)> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        let min = self.param_values[first.0];
        let max = self.param_values[last.1];
        let v = if value.is_nan() { min } else { value.clamp(min, max) };

        for (idx, &(a, b)) in self.segments.iter().enumerate() {
            let pa = self.param_values[a];
            let pb = self.param_values[b];
            if a == b {
                if v == pa {
                    return Some((idx, 0.0));
                }
            } else if v > pa && v < pb {
                return Some((idx, (v - pa) / (pb - pa)));
            }
        }
        Some((self.segments.len() - 1, 0.0))
    }
}

/// Plays the child picked by a switch variable, optionally cross-fading.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectorNode {
    pub switch: Option<VariableId>,
    pub children: Vec<NodeId>,
    /// Cross-fade length in seconds; 0 switches instantly.
    pub blend_time: f32,
}

impl SelectorNode {
    pub fn new(switch: VariableId) -> Self {
        Self {
            switch: Some(switch),
            ..Self::default()
        }
    }

    pub fn with_child(mut self, child: NodeId) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_blend_time(mut self, blend_time: f32) -> Self {
        self.blend_time = blend_time;
        self
    }

    /// Child for a switch value. Indices are truncated and clamped into range;
    /// a missing value selects the first child.
    pub fn select(&self, value: Option<VariableValue>) -> Option<NodeId> {
        let last = self.children.len().checked_sub(1)?;
        let idx = match value {
            Some(VariableValue::Int(i)) => i.max(0) as usize,
            Some(VariableValue::Float(f)) if f.is_finite() => f.max(0.0) as usize,
            _ => 0,
        };
        self.children.get(idx.min(last)).copied()
    }
}

/// Right-hand side of a transition condition.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Operand {
    Variable(VariableId),
    Constant(VariableValue),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TransitionTrigger {
    /// A tree event raised during the previous tick.
    Event(EventId),
    /// `variable op operand`, evaluated every tick.
    Condition {
        variable: VariableId,
        op: CompareOp,
        operand: Operand,
    },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StateTransition {
    pub from: NodeId,
    pub to: NodeId,
    pub trigger: TransitionTrigger,
    /// Cross-fade length in seconds; 0 switches on the next sample.
    pub blend_time: f32,
}

/// States with triggered cross-fading transitions. The first state is the
/// default one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateMachineNode {
    pub states: Vec<NodeId>,
    pub transitions: Vec<StateTransition>,
}

impl StateMachineNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: NodeId) -> Self {
        self.states.push(state);
        self
    }

    pub fn with_transition(
        mut self,
        from: NodeId,
        to: NodeId,
        trigger: TransitionTrigger,
        blend_time: f32,
    ) -> Self {
        self.transitions.push(StateTransition {
            from,
            to,
            trigger,
            blend_time,
        });
        self
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Animation(AnimationNode),
    Blender1D(Blender1DNode),
    Selector(SelectorNode),
    StateMachine(StateMachineNode),
}

impl NodeKind {
    /// Child nodes, empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        match self {
            NodeKind::Animation(_) => &[],
            NodeKind::Blender1D(b) => b.children(),
            NodeKind::Selector(s) => &s.children,
            NodeKind::StateMachine(m) => &m.states,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Animation(_) => "animation",
            NodeKind::Blender1D(_) => "blender_1d",
            NodeKind::Selector(_) => "selector",
            NodeKind::StateMachine(_) => "state_machine",
        }
    }
}

#[derive(Clone, Debug)]
pub struct NodeDef {
    pub name: String,
    pub kind: NodeKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blender(values: &[f32]) -> Blender1DNode {
        values
            .iter()
            .enumerate()
            .fold(Blender1DNode::new(VariableId(0)), |b, (i, v)| {
                b.with_child(NodeId(i as u32), *v)
            })
    }

    #[test]
    fn segments_alternate_points_and_spans() {
        let b = blender(&[1.0, 0.0, 2.0]);
        assert_eq!(b.segments(), &[(1, 1), (1, 0), (0, 0), (0, 2), (2, 2)]);
    }

    #[test]
    fn locate_weights_between_neighbours() {
        let b = blender(&[0.0, 1.0]);
        assert_eq!(b.locate(0.0), Some((0, 0.0)));
        assert_eq!(b.locate(0.25), Some((1, 0.25)));
        assert_eq!(b.locate(1.0), Some((2, 0.0)));
        assert_eq!(b.locate(-3.0), Some((0, 0.0)));
        assert_eq!(b.locate(7.0), Some((2, 0.0)));
    }

    #[test]
    fn selector_clamps_index() {
        let s = SelectorNode::new(VariableId(0))
            .with_child(NodeId(3))
            .with_child(NodeId(4));
        assert_eq!(s.select(Some(VariableValue::Int(1))), Some(NodeId(4)));
        assert_eq!(s.select(Some(VariableValue::Int(9))), Some(NodeId(4)));
        assert_eq!(s.select(Some(VariableValue::Float(0.9))), Some(NodeId(3)));
        assert_eq!(s.select(None), Some(NodeId(3)));
    }
}

//! Node behaviours: activation, per-tick logic, sync-profile generation,
//! synchronization and pose sampling, walked recursively from the root.
//!
//! Profile generation and synchronization visit children before their parent.
//! A node activated this tick (`ToSynchronize`) stays out of the tree profile,
//! jumps to the first matching sync point when it synchronizes, and becomes
//! `Active`. Sampling scales the parent's delta by the node's own speed, so
//! speeds compose along the path from the root.

use log::{debug, trace};

use crate::config::Config;
use crate::events::TriggeredEvents;
use crate::ids::{EventId, NodeId};
use crate::listener::ListenerSet;
use crate::pose::{blend_poses, Transform};
use crate::runtime::layout::{KindRuntime, RuntimeData};
use crate::state::NodeState;
use crate::sync::TreeSyncProfile;
use crate::track::TimelineTrack;
use crate::tree::{
    AnimationNode, BlendTree, Blender1DNode, NodeKind, Operand, SelectorNode, StateMachineNode,
    TransitionTrigger,
};
use crate::variable::compare;

/// Marks `event` for the next tick and tells the listeners right away.
pub(crate) fn raise_event(events: &mut TriggeredEvents, listeners: &ListenerSet, event: EventId) {
    if events.trigger(event) {
        listeners.notify(|l| l.on_event_triggered(event));
    }
}

fn copy_pose(src: &[Transform], dst: &mut [Transform]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = *s;
    }
}

pub(crate) struct Ctx<'a> {
    pub tree: &'a BlendTree,
    pub data: &'a mut RuntimeData,
    pub events: &'a mut TriggeredEvents,
    pub listeners: &'a ListenerSet,
    pub config: &'a Config,
}

impl Ctx<'_> {
    #[inline]
    fn child_at(&self, id: NodeId, i: usize) -> Option<NodeId> {
        self.data.node_ref(id).active_children.get(i).copied()
    }

    fn set_state(&mut self, id: NodeId, state: NodeState) {
        self.data.node_mut(id).state = state;
        debug!(
            "node '{}' -> {}",
            self.tree.def(id).name,
            state.name()
        );
        self.listeners
            .notify(|l| l.on_node_state_changed(id, state));
    }

    // ---- activation ----

    pub fn activate(&mut self, id: NodeId) {
        if self.data.node_ref(id).state.is_running() {
            return;
        }
        {
            let node = self.data.node_mut(id);
            node.playback_speed = 1.0;
            node.active_children.clear();
            node.kind.reset();
        }
        self.set_state(id, NodeState::ToSynchronize);

        let tree = self.tree;
        match &tree.def(id).kind {
            NodeKind::Animation(_) => {}
            NodeKind::Blender1D(blender) => self.update_blender(id, blender),
            NodeKind::Selector(selector) => {
                let value = selector.switch.and_then(|v| self.data.variable(v));
                if let Some(child) = selector.select(value) {
                    if let Some(fade) = self.data.node_mut(id).kind.fade_mut() {
                        fade.current = Some(child);
                    }
                    self.activate_child(id, child);
                }
            }
            NodeKind::StateMachine(machine) => {
                if let Some(&default_state) = machine.states.first() {
                    if let Some(fade) = self.data.node_mut(id).kind.fade_mut() {
                        fade.current = Some(default_state);
                    }
                    self.activate_child(id, default_state);
                }
            }
        }
    }

    pub fn deactivate(&mut self, id: NodeId) {
        if !self.data.node_ref(id).state.is_running() {
            return;
        }
        let children = std::mem::take(&mut self.data.node_mut(id).active_children);
        for child in children {
            self.deactivate(child);
        }
        self.data.node_mut(id).kind.reset();
        self.set_state(id, NodeState::Inactive);
    }

    fn activate_child(&mut self, parent: NodeId, child: NodeId) {
        self.activate(child);
        let node = self.data.node_mut(parent);
        if !node.active_children.contains(&child) {
            node.active_children.push(child);
        }
    }

    fn deactivate_child(&mut self, parent: NodeId, child: NodeId) {
        self.deactivate(child);
        self.data
            .node_mut(parent)
            .active_children
            .retain(|c| *c != child);
    }

    // ---- logic ----

    pub fn update_logic(&mut self, id: NodeId) {
        let tree = self.tree;
        match &tree.def(id).kind {
            NodeKind::Animation(_) => {}
            NodeKind::Blender1D(blender) => self.update_blender(id, blender),
            NodeKind::Selector(selector) => self.update_selector(id, selector),
            NodeKind::StateMachine(machine) => self.update_state_machine(id, machine),
        }

        let mut i = 0;
        while let Some(child) = self.child_at(id, i) {
            self.update_logic(child);
            i += 1;
        }
    }

    fn update_blender(&mut self, id: NodeId, blender: &Blender1DNode) {
        let value = blender
            .control
            .and_then(|v| self.data.variable(v))
            .and_then(|v| v.as_scalar())
            .unwrap_or(f32::NAN);
        let Some((segment, w)) = blender.locate(value) else {
            return;
        };

        let previous = match &mut self.data.node_mut(id).kind {
            KindRuntime::Blender1D { segment: seg, weight } => {
                *weight = w;
                *seg
            }
            _ => return,
        };
        if previous == Some(segment) {
            return;
        }

        let (a, b) = blender.segments()[segment];
        let wanted = [blender.children()[a], blender.children()[b]];
        let current = self.data.node_ref(id).active_children.clone();
        for child in current {
            if !wanted.contains(&child) {
                self.deactivate_child(id, child);
            }
        }
        for child in wanted {
            self.activate_child(id, child);
        }
        if let KindRuntime::Blender1D { segment: seg, .. } = &mut self.data.node_mut(id).kind {
            *seg = Some(segment);
        }
    }

    fn update_selector(&mut self, id: NodeId, selector: &SelectorNode) {
        let value = selector.switch.and_then(|v| self.data.variable(v));
        let Some(wanted) = selector.select(value) else {
            return;
        };
        let current = match self.data.node_ref(id).kind.fade() {
            Some(fade) if !fade.is_blending() => fade.current,
            _ => return,
        };
        if current == Some(wanted) {
            return;
        }

        if selector.blend_time > 0.0 {
            if let Some(fade) = self.data.node_mut(id).kind.fade_mut() {
                fade.start(wanted, selector.blend_time);
            }
        } else {
            if let Some(previous) = current {
                self.deactivate_child(id, previous);
            }
            if let Some(fade) = self.data.node_mut(id).kind.fade_mut() {
                fade.current = Some(wanted);
            }
        }
        self.activate_child(id, wanted);
    }

    fn update_state_machine(&mut self, id: NodeId, machine: &StateMachineNode) {
        let current = match self.data.node_ref(id).kind.fade() {
            Some(fade) if !fade.is_blending() => fade.current,
            _ => return,
        };
        let Some(current) = current else { return };

        let fired = machine
            .transitions
            .iter()
            .enumerate()
            .find(|(_, tr)| tr.from == current && tr.to != current && self.fires(&tr.trigger));
        let Some((index, transition)) = fired else {
            return;
        };

        debug!(
            "state machine '{}': '{}' -> '{}'",
            self.tree.def(id).name,
            self.tree.def(transition.from).name,
            self.tree.def(transition.to).name
        );
        if let KindRuntime::StateMachine { fade, transition: active } =
            &mut self.data.node_mut(id).kind
        {
            fade.start(transition.to, transition.blend_time);
            *active = Some(index);
        }
        self.activate_child(id, transition.to);
    }

    fn fires(&self, trigger: &TransitionTrigger) -> bool {
        match *trigger {
            TransitionTrigger::Event(event) => self.events.was_triggered(event),
            TransitionTrigger::Condition {
                variable,
                op,
                operand,
            } => {
                let rhs = match operand {
                    Operand::Variable(v) => self.data.variable(v),
                    Operand::Constant(c) => Some(c),
                };
                match (self.data.variable(variable), rhs) {
                    (Some(lhs), Some(rhs)) => compare(&lhs, op, &rhs),
                    _ => false,
                }
            }
        }
    }

    // ---- synchronization ----

    pub fn generate_tree_sync_profile(&mut self, id: NodeId, profile: &mut TreeSyncProfile) {
        let mut i = 0;
        while let Some(child) = self.child_at(id, i) {
            self.generate_tree_sync_profile(child, profile);
            i += 1;
        }

        let node = self.data.node_ref(id);
        if !node.state.publishes_progress() {
            return;
        }
        if let KindRuntime::Animation { track: Some(track) } = &node.kind {
            track.update_tree_profile(profile);
        }
    }

    pub fn synchronize(&mut self, id: NodeId, profile: &TreeSyncProfile) {
        let mut i = 0;
        while let Some(child) = self.child_at(id, i) {
            self.synchronize(child, profile);
            i += 1;
        }

        let mut sync = std::mem::take(&mut self.data.node_mut(id).sync);
        sync.reset();

        let tree = self.tree;
        match &tree.def(id).kind {
            NodeKind::Animation(_) => {
                let node = self.data.node_mut(id);
                let first_sync = node.state == NodeState::ToSynchronize;
                if let KindRuntime::Animation { track: Some(track) } = &mut node.kind {
                    if first_sync {
                        let start = track.jump_to_first_match(profile);
                        track.reset_to(start);
                    }
                    track.synchronize_to(profile, &mut sync);
                }
            }
            NodeKind::Blender1D(blender) => {
                if let KindRuntime::Blender1D {
                    segment: Some(segment),
                    weight,
                } = self.data.node_ref(id).kind
                {
                    let (a, b) = blender.segments()[segment];
                    let start = blender.children()[a];
                    let end = blender.children()[b];
                    if a == b {
                        sync.merge_with(&self.data.node_ref(start).sync, 1.0);
                    } else {
                        sync.merge_with(&self.data.node_ref(start).sync, 1.0 - weight);
                        sync.merge_with(&self.data.node_ref(end).sync, weight);
                    }
                }
            }
            NodeKind::Selector(_) | NodeKind::StateMachine(_) => {
                if let Some(fade) = self.data.node_ref(id).kind.fade() {
                    let p = fade.progress();
                    match (fade.current, fade.target) {
                        (Some(current), Some(target)) => {
                            sync.merge_with(&self.data.node_ref(current).sync, 1.0 - p);
                            sync.merge_with(&self.data.node_ref(target).sync, p);
                        }
                        (Some(only), None) | (None, Some(only)) => {
                            sync.merge_with(&self.data.node_ref(only).sync, 1.0);
                        }
                        (None, None) => {}
                    }
                }
            }
        }

        sync.commit();
        for c in sync.contributions() {
            if let Some(node) = c.node {
                self.data.node_mut(node).playback_speed =
                    self.config.clamp_playback_speed(c.playback_speed);
            }
        }
        self.data.node_mut(id).sync = sync;

        if self.data.node_ref(id).state == NodeState::ToSynchronize {
            self.set_state(id, NodeState::Active);
        }
    }

    // ---- sampling ----

    pub fn sample_pose(&mut self, id: NodeId, parent_dt: f32) {
        let dt = parent_dt * self.data.node_ref(id).playback_speed;

        let mut i = 0;
        while let Some(child) = self.child_at(id, i) {
            self.sample_pose(child, dt);
            i += 1;
        }

        let tree = self.tree;
        match &tree.def(id).kind {
            NodeKind::Animation(anim) => self.sample_animation(id, anim, dt),
            NodeKind::Blender1D(blender) => self.sample_blender(id, blender),
            NodeKind::Selector(_) | NodeKind::StateMachine(_) => self.sample_crossfade(id, dt),
        }
    }

    fn sample_animation(&mut self, id: NodeId, anim: &AnimationNode, dt: f32) {
        let node = self.data.node_mut(id);
        let KindRuntime::Animation { track: Some(track) } = &mut node.kind else {
            return;
        };
        let prev = track.time();
        let from_start = track.is_at_start();
        let wrapped = track.update(dt);
        let now = track.time();
        let duration = track.duration();
        let completed = track.completed_sync_point();
        if let Some(clip) = &anim.clip {
            clip.sample_pose(now, &mut node.pose);
        }
        trace!("node {:?} t={:.4} (dt={:.4})", id, now, dt);

        for ev in &anim.events {
            if TimelineTrack::passed(prev, now, wrapped, from_start, ev.progress * duration) {
                raise_event(self.events, self.listeners, ev.event);
            }
        }
        if let Some(event) = completed {
            self.listeners
                .notify(|l| l.on_sync_point_reached(id, event));
        }
    }

    fn sample_blender(&mut self, id: NodeId, blender: &Blender1DNode) {
        let KindRuntime::Blender1D {
            segment: Some(segment),
            weight,
        } = self.data.node_ref(id).kind
        else {
            return;
        };
        let (a, b) = blender.segments()[segment];
        let start = blender.children()[a];
        let end = blender.children()[b];

        let mut pose = std::mem::take(&mut self.data.node_mut(id).pose);
        if a == b {
            copy_pose(&self.data.node_ref(start).pose, &mut pose);
        } else {
            blend_poses(
                &self.data.node_ref(start).pose,
                &self.data.node_ref(end).pose,
                weight,
                &mut pose,
            );
        }
        self.data.node_mut(id).pose = pose;
    }

    fn sample_crossfade(&mut self, id: NodeId, dt: f32) {
        let Some(fade) = self.data.node_mut(id).kind.fade_mut() else {
            return;
        };
        if fade.is_blending() {
            fade.elapsed += dt;
        }
        let (current, target, p) = (fade.current, fade.target, fade.progress());

        let mut pose = std::mem::take(&mut self.data.node_mut(id).pose);
        match (current, target) {
            (Some(c), Some(t)) => blend_poses(
                &self.data.node_ref(c).pose,
                &self.data.node_ref(t).pose,
                p,
                &mut pose,
            ),
            (Some(only), None) | (None, Some(only)) => {
                copy_pose(&self.data.node_ref(only).pose, &mut pose)
            }
            (None, None) => {}
        }
        self.data.node_mut(id).pose = pose;

        if target.is_some() && p >= 1.0 {
            let faded_out = match &mut self.data.node_mut(id).kind {
                KindRuntime::StateMachine { fade, transition } => {
                    *transition = None;
                    fade.finish()
                }
                KindRuntime::Selector { fade } => fade.finish(),
                _ => None,
            };
            if let Some(previous) = faded_out {
                self.deactivate_child(id, previous);
            }
        }
    }
}

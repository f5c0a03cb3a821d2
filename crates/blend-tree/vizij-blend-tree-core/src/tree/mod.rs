//! Blend-tree definitions and the validating builder.
//!
//! A [`BlendTree`] is immutable and shared between players through an `Arc`.
//! The builder hands out dense handles for events, variables and nodes; names
//! exist for lookup while wiring things up and are never consulted at runtime.

pub mod nodes;

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::BlendTreeError;
use crate::ids::{EventId, IdAllocator, NodeId, VariableId};
use crate::pose::Skeleton;
use crate::variable::{VariableDecl, VariableKind, VariableValue};

pub use nodes::{
    AnimationNode, Blender1DNode, ClipEvent, NodeDef, NodeKind, Operand, SelectorNode,
    StateMachineNode, StateTransition, TransitionTrigger,
};

#[derive(Clone, Debug)]
pub struct BlendTree {
    skeleton: Option<Arc<Skeleton>>,
    events: Vec<String>,
    variables: Vec<VariableDecl>,
    nodes: Vec<NodeDef>,
    root: NodeId,
}

impl BlendTree {
    /// Skeleton the tree's clips animate. A tree without one cannot play.
    #[inline]
    pub fn skeleton(&self) -> Option<&Arc<Skeleton>> {
        self.skeleton.as_ref()
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn event_id(&self, name: &str) -> Option<EventId> {
        self.events
            .iter()
            .position(|n| n == name)
            .map(|i| EventId(i as u32))
    }

    pub fn event_name(&self, event: EventId) -> Option<&str> {
        self.events.get(event.index()).map(String::as_str)
    }

    #[inline]
    pub fn variables(&self) -> &[VariableDecl] {
        &self.variables
    }

    pub fn variable_id(&self, name: &str) -> Option<VariableId> {
        self.variables
            .iter()
            .position(|v| v.name == name)
            .map(|i| VariableId(i as u32))
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeDef> {
        self.nodes.get(id.index())
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|i| NodeId(i as u32))
    }

    /// Definitions in handle order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeDef)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Definition of a handle validated at build time.
    #[inline]
    pub(crate) fn def(&self, id: NodeId) -> &NodeDef {
        &self.nodes[id.index()]
    }
}

#[derive(Debug, Default)]
pub struct BlendTreeBuilder {
    ids: IdAllocator,
    skeleton: Option<Arc<Skeleton>>,
    events: Vec<String>,
    variables: Vec<VariableDecl>,
    nodes: Vec<NodeDef>,
    root: Option<NodeId>,
}

impl BlendTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skeleton(&mut self, skeleton: Arc<Skeleton>) -> &mut Self {
        self.skeleton = Some(skeleton);
        self
    }

    pub fn add_event(&mut self, name: impl Into<String>) -> EventId {
        self.events.push(name.into());
        self.ids.alloc_event()
    }

    pub fn add_variable(&mut self, name: impl Into<String>, default: VariableValue) -> VariableId {
        self.variables.push(VariableDecl {
            name: name.into(),
            default,
        });
        self.ids.alloc_variable()
    }

    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeDef {
            name: name.into(),
            kind,
        });
        self.ids.alloc_node()
    }

    pub fn add_animation(&mut self, name: impl Into<String>, node: AnimationNode) -> NodeId {
        self.add_node(name, NodeKind::Animation(node))
    }

    pub fn add_blender_1d(&mut self, name: impl Into<String>, node: Blender1DNode) -> NodeId {
        self.add_node(name, NodeKind::Blender1D(node))
    }

    pub fn add_selector(&mut self, name: impl Into<String>, node: SelectorNode) -> NodeId {
        self.add_node(name, NodeKind::Selector(node))
    }

    pub fn add_state_machine(&mut self, name: impl Into<String>, node: StateMachineNode) -> NodeId {
        self.add_node(name, NodeKind::StateMachine(node))
    }

    pub fn set_root(&mut self, root: NodeId) -> &mut Self {
        self.root = Some(root);
        self
    }

    /// Validates the definition and freezes it.
    pub fn build(self) -> Result<BlendTree, BlendTreeError> {
        let root = self.root.ok_or(BlendTreeError::MissingRoot)?;
        if root.index() >= self.nodes.len() {
            return Err(BlendTreeError::UnknownNode(root));
        }

        check_unique("event", self.events.iter().map(String::as_str))?;
        check_unique("variable", self.variables.iter().map(|v| v.name.as_str()))?;
        check_unique("node", self.nodes.iter().map(|n| n.name.as_str()))?;

        let validator = Validator {
            events: &self.events,
            variables: &self.variables,
            nodes: &self.nodes,
        };
        for node in &self.nodes {
            validator.check_node(node)?;
        }
        validator.check_structure(root)?;

        Ok(BlendTree {
            skeleton: self.skeleton,
            events: self.events,
            variables: self.variables,
            nodes: self.nodes,
            root,
        })
    }
}

fn check_unique<'a>(
    table: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), BlendTreeError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(BlendTreeError::DuplicateName {
                table,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_progress(node: &str, progress: f32) -> Result<(), BlendTreeError> {
    if (0.0..=1.0).contains(&progress) {
        Ok(())
    } else {
        Err(BlendTreeError::InvalidProgress {
            node: node.to_string(),
            progress,
        })
    }
}

fn check_blend_time(node: &str, blend_time: f32) -> Result<(), BlendTreeError> {
    if blend_time.is_finite() && blend_time >= 0.0 {
        Ok(())
    } else {
        Err(BlendTreeError::InvalidBlendTime {
            node: node.to_string(),
            blend_time,
        })
    }
}

struct Validator<'a> {
    events: &'a [String],
    variables: &'a [VariableDecl],
    nodes: &'a [NodeDef],
}

impl Validator<'_> {
    fn check_event(&self, event: EventId) -> Result<(), BlendTreeError> {
        if event.index() < self.events.len() {
            Ok(())
        } else {
            Err(BlendTreeError::UnknownEvent(event))
        }
    }

    fn variable(&self, id: VariableId) -> Result<&VariableDecl, BlendTreeError> {
        self.variables
            .get(id.index())
            .ok_or(BlendTreeError::UnknownVariable(id))
    }

    fn check_variable_kind(
        &self,
        node: &str,
        id: VariableId,
        accepted: &[VariableKind],
        expected: &'static str,
    ) -> Result<(), BlendTreeError> {
        let decl = self.variable(id)?;
        let actual = decl.default.kind();
        if accepted.contains(&actual) {
            Ok(())
        } else {
            Err(BlendTreeError::VariableKindMismatch {
                node: node.to_string(),
                variable: decl.name.clone(),
                expected,
                actual,
            })
        }
    }

    fn check_node(&self, node: &NodeDef) -> Result<(), BlendTreeError> {
        let name = node.name.as_str();
        for child in node.kind.children() {
            if child.index() >= self.nodes.len() {
                return Err(BlendTreeError::UnknownNode(*child));
            }
        }

        match &node.kind {
            NodeKind::Animation(anim) => {
                if let Some(clip) = &anim.clip {
                    let duration = clip.duration();
                    if !(duration.is_finite() && duration > 0.0) {
                        return Err(BlendTreeError::InvalidDuration {
                            node: name.to_string(),
                            duration,
                        });
                    }
                }
                for sp in &anim.sync_points {
                    self.check_event(sp.event)?;
                    check_progress(name, sp.progress)?;
                }
                for ev in &anim.events {
                    self.check_event(ev.event)?;
                    check_progress(name, ev.progress)?;
                }
            }
            NodeKind::Blender1D(blender) => {
                if blender.children().is_empty() {
                    return Err(BlendTreeError::EmptyComposite {
                        name: name.to_string(),
                    });
                }
                if let Some(control) = blender.control {
                    self.check_variable_kind(name, control, &[VariableKind::Float], "Float")?;
                }
            }
            NodeKind::Selector(selector) => {
                if selector.children.is_empty() {
                    return Err(BlendTreeError::EmptyComposite {
                        name: name.to_string(),
                    });
                }
                if let Some(switch) = selector.switch {
                    self.check_variable_kind(
                        name,
                        switch,
                        &[VariableKind::Int, VariableKind::Float],
                        "Int or Float",
                    )?;
                }
                check_blend_time(name, selector.blend_time)?;
            }
            NodeKind::StateMachine(machine) => {
                if machine.states.is_empty() {
                    return Err(BlendTreeError::EmptyComposite {
                        name: name.to_string(),
                    });
                }
                for tr in &machine.transitions {
                    for endpoint in [tr.from, tr.to] {
                        if !machine.states.contains(&endpoint) {
                            let state = self
                                .nodes
                                .get(endpoint.index())
                                .map(|n| n.name.clone())
                                .unwrap_or_else(|| format!("{endpoint:?}"));
                            return Err(BlendTreeError::InvalidTransition {
                                machine: name.to_string(),
                                state,
                            });
                        }
                    }
                    check_blend_time(name, tr.blend_time)?;
                    match tr.trigger {
                        TransitionTrigger::Event(event) => self.check_event(event)?,
                        TransitionTrigger::Condition {
                            variable, operand, ..
                        } => {
                            self.variable(variable)?;
                            if let Operand::Variable(rhs) = operand {
                                self.variable(rhs)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Every node has at most one parent and nothing reachable from the root
    /// loops back onto itself.
    fn check_structure(&self, root: NodeId) -> Result<(), BlendTreeError> {
        let mut parent_count = vec![0u32; self.nodes.len()];
        for node in self.nodes {
            for child in node.kind.children() {
                parent_count[child.index()] += 1;
                if parent_count[child.index()] > 1 {
                    return Err(BlendTreeError::SharedNode {
                        name: self.nodes[child.index()].name.clone(),
                    });
                }
            }
        }

        // 0 = unvisited, 1 = on the stack, 2 = done
        let mut marks = vec![0u8; self.nodes.len()];
        let mut stack = vec![(root, 0usize)];
        marks[root.index()] = 1;
        while let Some((id, next_child)) = stack.pop() {
            let children = self.nodes[id.index()].kind.children();
            match children.get(next_child) {
                Some(&child) => {
                    stack.push((id, next_child + 1));
                    match marks[child.index()] {
                        0 => {
                            marks[child.index()] = 1;
                            stack.push((child, 0));
                        }
                        1 => {
                            return Err(BlendTreeError::Cycle {
                                name: self.nodes[child.index()].name.clone(),
                            })
                        }
                        _ => {}
                    }
                }
                None => marks[id.index()] = 2,
            }
        }
        Ok(())
    }
}

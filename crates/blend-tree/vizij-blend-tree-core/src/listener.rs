//! Player observers.
//!
//! Listeners are shared handles; identity is the allocation, so attaching the
//! same handle twice or detaching an unknown one is a no-op.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ids::{EventId, NodeId};
use crate::state::NodeState;

/// Callbacks fired synchronously by the player. All methods default to no-ops.
pub trait PlayerListener {
    fn on_simulation_started(&mut self) {}

    fn on_node_state_changed(&mut self, _node: NodeId, _state: NodeState) {}

    fn on_event_triggered(&mut self, _event: EventId) {}

    /// A clip node's playhead passed one of its sync points.
    fn on_sync_point_reached(&mut self, _node: NodeId, _event: EventId) {}

    fn on_simulation_finished(&mut self) {}
}

pub type ListenerHandle = Rc<RefCell<dyn PlayerListener>>;

#[inline]
fn same_listener(a: &ListenerHandle, b: &ListenerHandle) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

#[derive(Default)]
pub struct ListenerSet {
    listeners: Vec<ListenerHandle>,
}

impl ListenerSet {
    /// Returns `false` when the listener was already attached.
    pub fn attach(&mut self, listener: ListenerHandle) -> bool {
        if self.listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    /// Returns `false` when the listener was not attached.
    pub fn detach(&mut self, listener: &ListenerHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !same_listener(l, listener));
        self.listeners.len() != before
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub(crate) fn notify(&self, mut f: impl FnMut(&mut dyn PlayerListener)) {
        for l in &self.listeners {
            f(&mut *l.borrow_mut());
        }
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.listeners.len())
            .finish()
    }
}

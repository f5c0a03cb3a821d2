//! Identifiers and simple allocators for blend-tree entities.
//!
//! Handles are dense indices issued by the tree builder. The runtime never looks
//! anything up by name; it indexes its arenas with these.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EventId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VariableId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EventId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl VariableId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Monotonic allocator for NodeId, EventId, and VariableId.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_node: u32,
    next_event: u32,
    next_variable: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node = self.next_node.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_event(&mut self) -> EventId {
        let id = EventId(self.next_event);
        self.next_event = self.next_event.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_variable(&mut self) -> VariableId {
        let id = VariableId(self.next_variable);
        self.next_variable = self.next_variable.wrapping_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_node(), NodeId(0));
        assert_eq!(alloc.alloc_node(), NodeId(1));
        assert_eq!(alloc.alloc_event(), EventId(0));
        assert_eq!(alloc.alloc_event(), EventId(1));
        assert_eq!(alloc.alloc_variable(), VariableId(0));
        assert_eq!(alloc.alloc_variable().index(), 1);
    }
}

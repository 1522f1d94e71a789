//! Flattened node storage.
//!
//! AST nodes live in a `Vec` owned by their template; children are referenced
//! by `NodeId` indices instead of boxes. The index is also the node's stable
//! identity, which the evaluator uses to key its per-render introspection
//! cache.

use crate::ast::{Node, NodeKind};
use crate::SourcePos;
use std::fmt;

/// Index of a node in its [`NodeArena`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Create from a raw u32 index.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    /// Get the raw u32 index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Arena of AST nodes for one template.
///
/// Nodes are allocated during parsing and never removed. The arena is owned
/// exclusively until the init pass completes; after that it is shared
/// read-only across renders.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        NodeArena { nodes: Vec::new() }
    }

    /// Allocate a node, returning its id.
    ///
    /// # Panics
    /// Panics if the arena exceeds `u32::MAX` nodes.
    pub fn alloc(&mut self, kind: NodeKind, pos: SourcePos) -> NodeId {
        let idx = u32::try_from(self.nodes.len())
            .unwrap_or_else(|_| panic!("node arena exceeded u32::MAX nodes"));
        self.nodes.push(Node { kind, pos });
        NodeId(idx)
    }

    /// Get a node by id.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Get a node by id, mutably. Only the init pass uses this.
    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all node ids in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(|i| {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "arena allocation is bounded by u32::MAX"
            )]
            let raw = i as u32;
            NodeId(raw)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_get() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(
            NodeKind::Text {
                text: "hello".to_owned(),
            },
            SourcePos::new(1, 1),
        );
        let b = arena.alloc(NodeKind::Comment, SourcePos::new(2, 1));

        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        assert!(matches!(arena.node(a).kind, NodeKind::Text { .. }));
        assert!(matches!(arena.node(b).kind, NodeKind::Comment));
        assert_eq!(arena.node(b).pos, SourcePos::new(2, 1));
    }

    #[test]
    fn ids_iterate_in_allocation_order() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(NodeKind::Comment, SourcePos::DUMMY);
        let b = arena.alloc(NodeKind::Comment, SourcePos::DUMMY);

        let ids: Vec<NodeId> = arena.ids().collect();
        assert_eq!(ids, vec![a, b]);
    }
}

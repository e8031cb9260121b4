//! Patch protocol between the differ and a live surface.
//!
//! Invariants:
//! - Patches are applied in order.
//! - Every patch carries the nodes/attributes it needs; appliers never consult
//!   the trees that produced it.
//! - Removals for a whole diff come first, then replacements, so an id freed
//!   anywhere in the tree is gone before any addition reuses it.
//! - Insert indices are positions in the parent's final child list and are
//!   valid when additions are applied in the emitted order.
//! - A text node keeps its identity across `UpdateText`.

use crate::types::{Attribute, Node, NodeId};

#[derive(Clone, Debug, PartialEq)]
pub enum Patch<M> {
    /// Render `child` and its subtree under `parent` at `index`.
    AddChild {
        parent: NodeId,
        index: usize,
        child: Node<M>,
    },
    /// Remove `child` and its subtree from `parent`.
    RemoveChild { parent: NodeId, child: Node<M> },
    /// Swap `old` for `new` in the same slot. `parent: None` addresses the root.
    ReplaceChild {
        parent: Option<NodeId>,
        old: Node<M>,
        new: Node<M>,
    },
    /// Reorder the current children of `parent` to exactly `order`.
    ReorderChildren { parent: NodeId, order: Vec<NodeId> },
    UpdateAttribute {
        element: NodeId,
        old: Attribute<M>,
        new: Attribute<M>,
    },
    AddAttribute {
        element: NodeId,
        attribute: Attribute<M>,
    },
    RemoveAttribute {
        element: NodeId,
        attribute: Attribute<M>,
    },
    UpdateText { node: NodeId, text: String },
    AddText {
        parent: NodeId,
        index: usize,
        node: Node<M>,
    },
    RemoveText { parent: NodeId, node: NodeId },
}

impl<M> Patch<M> {
    pub fn label(&self) -> &'static str {
        match self {
            Patch::AddChild { .. } => "add-child",
            Patch::RemoveChild { .. } => "remove-child",
            Patch::ReplaceChild { .. } => "replace-child",
            Patch::ReorderChildren { .. } => "reorder-children",
            Patch::UpdateAttribute { .. } => "update-attribute",
            Patch::AddAttribute { .. } => "add-attribute",
            Patch::RemoveAttribute { .. } => "remove-attribute",
            Patch::UpdateText { .. } => "update-text",
            Patch::AddText { .. } => "add-text",
            Patch::RemoveText { .. } => "remove-text",
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, Patch::RemoveChild { .. } | Patch::RemoveText { .. })
    }
}

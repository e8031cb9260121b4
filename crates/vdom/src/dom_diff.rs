//! Identity-keyed tree diffing to patch streams.
//!
//! Contract:
//! - Nodes are matched by `NodeId` only. Equal ids are always patched in place,
//!   never removed and re-added, even when their position among siblings moved.
//! - Per sibling list, `RemoveChild`/`RemoveText` are emitted exactly for the ids
//!   only in `old` and `AddChild`/`AddText` exactly for the ids only in `new`.
//! - Same id with a different node kind or tag is a `ReplaceChild`.
//! - A changed relative order of matched siblings costs one `ReorderChildren`.
//! - Attributes are matched by name (handlers by event name). The identity
//!   attribute's value is owned by the alignment pass: only its presence is
//!   diffed, never its value.
//! - A node that moves out of a replaced subtree is detached with its own
//!   removal, since the replaced subtree itself is not diffed.
//! - Output ordering is deterministic: all removals first (pre-order), then all
//!   replacements (pre-order), then attribute/text updates, in-place child diffs
//!   (new order), the reorder and additions (ascending index) per parent in
//!   pre-order. Hash maps are used for lookups only, never for emission order.
//!
//! Both trees are expected to be aligned (every id assigned, unique among
//! siblings). Duplicate sibling ids are tolerated: only the first occurrence
//! matches and later ones count as unmatched.
//!
//! Complexity: O(n) in the number of nodes of both trees.

use crate::dom_patch::Patch;
use crate::traverse::collect_ids;
use crate::types::{AttrKey, Attribute, IDENTITY_ATTRIBUTE, Node, NodeId};
use std::collections::{HashMap, HashSet};

pub fn diff<M: Clone + PartialEq>(old: &Node<M>, new: &Node<M>) -> Vec<Patch<M>> {
    let mut state = DiffState::new();
    if old.id() != new.id() {
        state.replacements.push(Patch::ReplaceChild {
            parent: None,
            old: old.clone(),
            new: new.clone(),
        });
    } else {
        state.diff_node(None, old, new);
    }
    let patches = state.finish(new);
    log::trace!(
        target: "mvu.diff",
        "diff {} -> {}: {} patches",
        old.id(),
        new.id(),
        patches.len()
    );
    patches
}

struct DiffState<M> {
    removals: Vec<Patch<M>>,
    replacements: Vec<Patch<M>>,
    updates: Vec<Patch<M>>,
}

impl<M: Clone + PartialEq> DiffState<M> {
    fn new() -> Self {
        Self {
            removals: Vec::new(),
            replacements: Vec::new(),
            updates: Vec::new(),
        }
    }

    fn finish(self, new_root: &Node<M>) -> Vec<Patch<M>> {
        let DiffState {
            mut removals,
            replacements,
            updates,
        } = self;
        if replacements
            .iter()
            .any(|p| matches!(p, Patch::ReplaceChild { parent: Some(_), .. }))
        {
            detach_moved_out(&replacements, new_root, &mut removals);
        }
        removals.extend(replacements);
        removals.extend(updates);
        removals
    }

    fn diff_node(&mut self, parent: Option<&NodeId>, old: &Node<M>, new: &Node<M>) {
        match (old, new) {
            (
                Node::Text { id, text },
                Node::Text {
                    text: next_text, ..
                },
            ) => {
                if text != next_text {
                    self.updates.push(Patch::UpdateText {
                        node: id.clone(),
                        text: next_text.clone(),
                    });
                }
            }
            (
                Node::Element {
                    id,
                    tag,
                    attributes,
                    children,
                },
                Node::Element {
                    tag: next_tag,
                    attributes: next_attrs,
                    children: next_children,
                    ..
                },
            ) if tag == next_tag => {
                self.diff_attributes(id, attributes, next_attrs);
                self.diff_children(id, children, next_children);
            }
            _ => self.replacements.push(Patch::ReplaceChild {
                parent: parent.cloned(),
                old: old.clone(),
                new: new.clone(),
            }),
        }
    }

    fn diff_attributes(&mut self, element: &NodeId, old: &[Attribute<M>], new: &[Attribute<M>]) {
        let old_by_key = index_attributes(old);
        let new_by_key = index_attributes(new);

        for (i, attr) in old.iter().enumerate() {
            if old_by_key.get(&attr.key()) != Some(&i) {
                continue;
            }
            if !new_by_key.contains_key(&attr.key()) {
                self.updates.push(Patch::RemoveAttribute {
                    element: element.clone(),
                    attribute: attr.clone(),
                });
            }
        }

        for (i, attr) in new.iter().enumerate() {
            if new_by_key.get(&attr.key()) != Some(&i) {
                continue;
            }
            match old_by_key.get(&attr.key()) {
                Some(&j) => {
                    if !attr.is_identity() && old[j] != *attr {
                        self.updates.push(Patch::UpdateAttribute {
                            element: element.clone(),
                            old: old[j].clone(),
                            new: attr.clone(),
                        });
                    }
                }
                None => {
                    let attribute = if attr.is_identity() {
                        Attribute::plain(IDENTITY_ATTRIBUTE, element.to_string())
                    } else {
                        attr.clone()
                    };
                    self.updates.push(Patch::AddAttribute {
                        element: element.clone(),
                        attribute,
                    });
                }
            }
        }
    }

    fn diff_children(&mut self, parent: &NodeId, old: &[Node<M>], new: &[Node<M>]) {
        let old_index = index_children(old);
        let new_index = index_children(new);

        for (i, child) in old.iter().enumerate() {
            let first = old_index.get(child.id()) == Some(&i);
            if first && new_index.contains_key(child.id()) {
                continue;
            }
            self.removals.push(removal(parent, child));
        }

        let mut kept: Vec<(usize, &NodeId)> = Vec::new();
        let mut additions = Vec::new();
        for (j, child) in new.iter().enumerate() {
            let first = new_index.get(child.id()) == Some(&j);
            match old_index.get(child.id()) {
                Some(&i) if first => {
                    self.diff_node(Some(parent), &old[i], child);
                    kept.push((i, child.id()));
                }
                _ => additions.push((j, child)),
            }
        }

        if kept.windows(2).any(|pair| pair[0].0 > pair[1].0) {
            self.updates.push(Patch::ReorderChildren {
                parent: parent.clone(),
                order: kept.iter().map(|(_, id)| (*id).clone()).collect(),
            });
        }

        for (index, child) in additions {
            self.updates.push(match child {
                Node::Text { .. } => Patch::AddText {
                    parent: parent.clone(),
                    index,
                    node: child.clone(),
                },
                Node::Element { .. } => Patch::AddChild {
                    parent: parent.clone(),
                    index,
                    child: child.clone(),
                },
            });
        }
    }
}

fn removal<M: Clone>(parent: &NodeId, child: &Node<M>) -> Patch<M> {
    match child {
        Node::Text { id, .. } => Patch::RemoveText {
            parent: parent.clone(),
            node: id.clone(),
        },
        Node::Element { .. } => Patch::RemoveChild {
            parent: parent.clone(),
            child: child.clone(),
        },
    }
}

/// Replaced subtrees are not diffed, so a node that moves out of one would
/// still be live when another replacement or an addition re-inserts it.
/// Detach such nodes during the removal phase.
fn detach_moved_out<M: Clone>(
    replacements: &[Patch<M>],
    new_root: &Node<M>,
    removals: &mut Vec<Patch<M>>,
) {
    let mut live_after = HashSet::new();
    collect_ids(new_root, &mut live_after);
    for patch in replacements {
        if let Patch::ReplaceChild {
            parent: Some(_),
            old,
            new,
        } = patch
        {
            let mut reinserted = HashSet::new();
            collect_ids(new, &mut reinserted);
            detach_descendants(old, &live_after, &reinserted, removals);
        }
    }
}

fn detach_descendants<M: Clone>(
    node: &Node<M>,
    live_after: &HashSet<NodeId>,
    reinserted: &HashSet<NodeId>,
    removals: &mut Vec<Patch<M>>,
) {
    for child in node.children() {
        if live_after.contains(child.id()) && !reinserted.contains(child.id()) {
            removals.push(removal(node.id(), child));
        } else {
            detach_descendants(child, live_after, reinserted, removals);
        }
    }
}

fn index_attributes<M>(attrs: &[Attribute<M>]) -> HashMap<AttrKey<'_>, usize> {
    let mut map = HashMap::with_capacity(attrs.len());
    for (i, attr) in attrs.iter().enumerate() {
        map.entry(attr.key()).or_insert(i);
    }
    map
}

fn index_children<M>(children: &[Node<M>]) -> HashMap<&NodeId, usize> {
    let mut map = HashMap::with_capacity(children.len());
    for (i, child) in children.iter().enumerate() {
        map.entry(child.id()).or_insert(i);
    }
    map
}

//! Identity preservation between render passes.
//!
//! A view has no memory between calls, so a freshly rendered tree carries
//! unassigned (or explicitly keyed) ids. `align` copies ids over from the live
//! tree wherever a fresh node is recognized as the same logical node:
//!
//! - keyed nodes keep their key and are matched with the live sibling of the
//!   same key;
//! - unkeyed nodes are matched positionally with the live unkeyed siblings
//!   (i-th with i-th);
//! - a match also needs the same node kind and tag, otherwise the fresh node
//!   gets a newly minted id;
//! - handler ids are copied per event name from the matched live element; a
//!   second handler for the same event on one element is dropped;
//! - the identity attribute is rewritten to the element's final token.
//!
//! The result is structurally identical to the fresh tree and becomes the live
//! tree of the next cycle.

use crate::ids::IdAllocator;
use crate::types::{Attribute, HandlerId, IDENTITY_ATTRIBUTE, Node, NodeId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub fn align<M>(previous: Option<&Node<M>>, mut fresh: Node<M>, ids: &mut IdAllocator) -> Node<M> {
    match previous {
        Some(prev) if matches(prev, &fresh) => align_matched(prev, &mut fresh, ids),
        _ => mint_subtree(&mut fresh, ids),
    }
    fresh
}

fn matches<M>(prev: &Node<M>, fresh: &Node<M>) -> bool {
    if !prev.same_shape(fresh) {
        return false;
    }
    match fresh.id() {
        NodeId::Keyed(_) => prev.id() == fresh.id(),
        NodeId::Unassigned | NodeId::Generated(_) => !prev.id().is_keyed(),
    }
}

fn align_matched<M>(prev: &Node<M>, fresh: &mut Node<M>, ids: &mut IdAllocator) {
    if !fresh.id().is_keyed() {
        fresh.set_id(prev.id().clone());
    }
    let id = fresh.id().clone();
    if let Node::Element {
        attributes,
        children,
        ..
    } = fresh
    {
        align_attributes(&id, prev.attributes(), attributes, ids);
        align_children(prev.children(), children, ids);
    }
}

fn mint_subtree<M>(fresh: &mut Node<M>, ids: &mut IdAllocator) {
    if !fresh.id().is_keyed() {
        fresh.set_id(ids.next_node_id());
    }
    let id = fresh.id().clone();
    if let Node::Element {
        attributes,
        children,
        ..
    } = fresh
    {
        align_attributes(&id, &[], attributes, ids);
        for child in children {
            mint_subtree(child, ids);
        }
    }
}

fn align_attributes<M>(
    element: &NodeId,
    prev: &[Attribute<M>],
    fresh: &mut Vec<Attribute<M>>,
    ids: &mut IdAllocator,
) {
    let mut prev_handlers: HashMap<&str, HandlerId> = HashMap::new();
    for handler in prev.iter().filter_map(Attribute::as_handler) {
        prev_handlers.entry(&*handler.event).or_insert(handler.id);
    }
    // One handler per event: the diff, the surface and the registry all key
    // handlers by event name.
    let mut events: HashSet<Arc<str>> = HashSet::new();
    fresh.retain(|attr| match attr.as_handler() {
        Some(handler) if !events.insert(handler.event.clone()) => {
            log::warn!(
                target: "mvu.align",
                "dropping duplicate {} handler on {}",
                handler.event,
                element
            );
            false
        }
        _ => true,
    });
    for attr in fresh.iter_mut() {
        if attr.is_identity() {
            *attr = Attribute::plain(IDENTITY_ATTRIBUTE, element.to_string());
        } else if let Attribute::Handler(handler) = attr {
            handler.id = match prev_handlers.get(&*handler.event) {
                Some(&id) => id,
                None => ids.next_handler_id(),
            };
        }
    }
}

fn align_children<M>(prev: &[Node<M>], fresh: &mut [Node<M>], ids: &mut IdAllocator) {
    let mut prev_keyed: HashMap<&NodeId, &Node<M>> = HashMap::new();
    let mut prev_unkeyed = Vec::new();
    for child in prev {
        if child.id().is_keyed() {
            prev_keyed.entry(child.id()).or_insert(child);
        } else {
            prev_unkeyed.push(child);
        }
    }

    let mut ordinal = 0usize;
    let mut seen_keys: HashSet<NodeId> = HashSet::new();
    for child in fresh.iter_mut() {
        let candidate = if child.id().is_keyed() {
            if !seen_keys.insert(child.id().clone()) {
                log::warn!(target: "mvu.align", "duplicate sibling key {}", child.id());
            }
            prev_keyed.get(child.id()).copied()
        } else {
            let candidate = prev_unkeyed.get(ordinal).copied();
            ordinal += 1;
            candidate
        };
        match candidate {
            Some(prev) if matches(prev, child) => align_matched(prev, child, ids),
            _ => mint_subtree(child, ids),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{element, text};
    use crate::dom_diff::diff;
    use crate::dom_patch::Patch;
    use crate::traverse::collect_ids;
    use crate::types::HandlerPayload;
    use std::collections::HashSet;

    #[derive(Clone, Debug, PartialEq)]
    enum Msg {
        Save,
        Cancel,
    }

    fn form(title: &str, extra: bool) -> Node<Msg> {
        let mut fields = element("fieldset")
            .child(element("input").attr("name", "title").attr("value", title))
            .child(element("button").on("click", Msg::Save).child(text("Save")));
        if extra {
            fields = fields.child(element("button").on("click", Msg::Cancel).child(text("Cancel")));
        }
        element("form").child(element("h1").child(text(title))).child(fields).build()
    }

    fn ids_of(node: &Node<Msg>) -> Vec<NodeId> {
        let mut out = Vec::new();
        fn walk(node: &Node<Msg>, out: &mut Vec<NodeId>) {
            out.push(node.id().clone());
            for child in node.children() {
                walk(child, out);
            }
        }
        walk(node, &mut out);
        out
    }

    #[test]
    fn first_render_mints_unique_ids() {
        let mut ids = IdAllocator::new();
        let tree = align(None, form("a", true), &mut ids);
        let mut seen = HashSet::new();
        collect_ids(&tree, &mut seen);
        assert_eq!(seen.len(), ids_of(&tree).len());
        assert!(ids_of(&tree).iter().all(NodeId::is_assigned));
    }

    #[test]
    fn same_logical_tree_keeps_every_id() {
        let mut ids = IdAllocator::new();
        let live = align(None, form("a", false), &mut ids);
        let minted = ids.minted_nodes();
        let next = align(Some(&live), form("b", false), &mut ids);
        assert_eq!(ids_of(&live), ids_of(&next));
        assert_eq!(ids.minted_nodes(), minted, "no new ids for unchanged structure");
    }

    #[test]
    fn aligned_rerender_diffs_to_in_place_updates() {
        let mut ids = IdAllocator::new();
        let live = align(None, form("a", false), &mut ids);
        let next = align(Some(&live), form("b", true), &mut ids);
        let patches = diff(&live, &next);
        assert!(patches.iter().all(|p| !p.is_removal()));
        assert_eq!(
            patches
                .iter()
                .filter(|p| matches!(p, Patch::AddChild { .. }))
                .count(),
            1
        );
        assert!(patches.iter().any(|p| matches!(p, Patch::UpdateText { .. })));
    }

    #[test]
    fn handler_ids_survive_payload_changes() {
        let mut ids = IdAllocator::new();
        let live: Node<Msg> = align(
            None,
            element("button").on("click", Msg::Save).build(),
            &mut ids,
        );
        let next = align(
            Some(&live),
            element("button").on("click", Msg::Cancel).build(),
            &mut ids,
        );
        let before = live.attributes()[0].as_handler().expect("handler").id;
        let after = next.attributes()[0].as_handler().expect("handler").id;
        assert_eq!(before, after);
        assert_ne!(before, HandlerId::INVALID);
    }

    #[test]
    fn tag_change_mints_new_identity() {
        let mut ids = IdAllocator::new();
        let live: Node<Msg> = align(None, element("div").child(element("span")).build(), &mut ids);
        let next = align(Some(&live), element("div").child(element("em")).build(), &mut ids);
        assert_eq!(live.id(), next.id());
        assert_ne!(live.children()[0].id(), next.children()[0].id());
    }

    #[test]
    fn keyed_children_follow_their_key_not_position() {
        let mut ids = IdAllocator::new();
        let render = |order: &[&str]| -> Node<Msg> {
            element("ul")
                .children(order.iter().map(|k| element("li").key(*k).child(text(*k))))
                .build()
        };
        let live = align(None, render(&["a", "b", "c"]), &mut ids);
        let next = align(Some(&live), render(&["c", "a", "b"]), &mut ids);

        let text_id = |tree: &Node<Msg>, key: &str| {
            tree.children()
                .iter()
                .find(|c| c.id() == &NodeId::keyed(key))
                .map(|c| c.children()[0].id().clone())
                .expect("child")
        };
        for key in ["a", "b", "c"] {
            assert_eq!(text_id(&live, key), text_id(&next, key));
        }
        let patches = diff(&live, &next);
        assert!(patches.iter().all(|p| matches!(p, Patch::ReorderChildren { .. })));
    }

    #[test]
    fn identity_attribute_tracks_element_token() {
        let mut ids = IdAllocator::new();
        let tree: Node<Msg> = align(
            None,
            element("section").attr("id", "whatever").key("main").build(),
            &mut ids,
        );
        assert_eq!(tree.attributes()[0], Attribute::plain("id", "main"));
    }

    #[test]
    fn second_handler_for_an_event_is_dropped() {
        let mut ids = IdAllocator::new();
        let render = || -> Node<Msg> {
            element("button")
                .on("click", Msg::Save)
                .attr("type", "button")
                .on("click", Msg::Cancel)
                .build()
        };
        let live = align(None, render(), &mut ids);
        let handlers: Vec<_> = live
            .attributes()
            .iter()
            .filter_map(Attribute::as_handler)
            .collect();
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].payload, HandlerPayload::Message(Msg::Save));
        assert_eq!(live.attributes().len(), 2);

        let next = align(Some(&live), render(), &mut ids);
        assert!(diff(&live, &next).is_empty());
    }
}

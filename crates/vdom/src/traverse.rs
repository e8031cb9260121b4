use crate::types::{Handler, Node, NodeId};
use std::collections::HashSet;

/// Visit every handler in `node`'s subtree in pre-order.
pub fn for_each_handler<'a, M>(node: &'a Node<M>, f: &mut impl FnMut(&'a NodeId, &'a Handler<M>)) {
    if let Node::Element {
        id,
        attributes,
        children,
        ..
    } = node
    {
        for handler in attributes.iter().filter_map(|a| a.as_handler()) {
            f(id, handler);
        }
        for child in children {
            for_each_handler(child, f);
        }
    }
}

pub fn collect_ids<M>(node: &Node<M>, out: &mut HashSet<NodeId>) {
    out.insert(node.id().clone());
    for child in node.children() {
        collect_ids(child, out);
    }
}

pub fn count_nodes<M>(node: &Node<M>) -> usize {
    1 + node.children().iter().map(count_nodes).sum::<usize>()
}

use crate::error::SurfaceError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use vdom::{Attribute, Handler, HandlerPayload, Node, NodeId};

/// Live nodes of a surface, keyed by identity token.
///
/// Handler payloads are erased on the way in: a surface only needs to know
/// which handler id listens for which event on which element.
pub(crate) struct SurfaceArena {
    live: HashMap<NodeId, NodeRecord>,
}

pub(crate) struct NodeRecord {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

pub(crate) enum NodeKind {
    Element {
        tag: Arc<str>,
        attributes: Vec<Attribute<()>>,
    },
    Text {
        text: String,
    },
}

impl SurfaceArena {
    pub(crate) fn new() -> Self {
        Self {
            live: HashMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.live.len()
    }

    pub(crate) fn get(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.live.get(id)
    }

    pub(crate) fn record(&self, id: &NodeId) -> Result<&NodeRecord, SurfaceError> {
        ensure_key(id)?;
        self.live
            .get(id)
            .ok_or_else(|| SurfaceError::MissingKey(id.clone()))
    }

    fn record_mut(&mut self, id: &NodeId) -> Result<&mut NodeRecord, SurfaceError> {
        ensure_key(id)?;
        self.live
            .get_mut(id)
            .ok_or_else(|| SurfaceError::MissingKey(id.clone()))
    }

    /// Every id in `node`'s subtree must be assigned, unique within the
    /// subtree and not live, except ids listed in `freed`.
    pub(crate) fn check_insertable<M>(
        &self,
        node: &Node<M>,
        freed: &HashSet<NodeId>,
    ) -> Result<(), SurfaceError> {
        let mut seen = HashSet::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let id = current.id();
            ensure_key(id)?;
            if !seen.insert(id) || (self.live.contains_key(id) && !freed.contains(id)) {
                return Err(SurfaceError::DuplicateKey(id.clone()));
            }
            stack.extend(current.children());
        }
        Ok(())
    }

    /// Insert a subtree without attaching it to `parent`'s child list.
    pub(crate) fn insert_subtree<M>(&mut self, node: &Node<M>, parent: Option<&NodeId>) {
        let kind = match node {
            Node::Element {
                tag, attributes, ..
            } => NodeKind::Element {
                tag: Arc::clone(tag),
                attributes: attributes.iter().map(erase).collect(),
            },
            Node::Text { text, .. } => NodeKind::Text { text: text.clone() },
        };
        self.live.insert(
            node.id().clone(),
            NodeRecord {
                kind,
                parent: parent.cloned(),
                children: node.children().iter().map(|c| c.id().clone()).collect(),
            },
        );
        for child in node.children() {
            self.insert_subtree(child, Some(node.id()));
        }
    }

    /// Remove `id` and its descendants, detaching it from its parent.
    pub(crate) fn remove_subtree(&mut self, id: &NodeId) -> Result<(), SurfaceError> {
        ensure_key(id)?;
        let record = self
            .live
            .remove(id)
            .ok_or_else(|| SurfaceError::MissingKey(id.clone()))?;
        if let Some(parent) = &record.parent
            && let Some(parent) = self.live.get_mut(parent)
        {
            parent.children.retain(|c| c != id);
        }
        let mut stack = record.children;
        while let Some(child) = stack.pop() {
            if let Some(removed) = self.live.remove(&child) {
                stack.extend(removed.children);
            }
        }
        Ok(())
    }

    pub(crate) fn subtree_ids(&self, id: &NodeId) -> HashSet<NodeId> {
        let mut out = HashSet::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(record) = self.live.get(&current) {
                stack.extend(record.children.iter().cloned());
            }
            out.insert(current);
        }
        out
    }

    pub(crate) fn children_mut(
        &mut self,
        parent: &NodeId,
    ) -> Result<&mut Vec<NodeId>, SurfaceError> {
        let record = self.record_mut(parent)?;
        match record.kind {
            NodeKind::Element { .. } => Ok(&mut record.children),
            NodeKind::Text { .. } => Err(SurfaceError::InvalidParent(parent.clone())),
        }
    }

    /// Position of `child` in `parent`'s child list.
    pub(crate) fn position(&self, parent: &NodeId, child: &NodeId) -> Result<usize, SurfaceError> {
        let record = self.record(parent)?;
        record
            .children
            .iter()
            .position(|c| c == child)
            .ok_or_else(|| SurfaceError::InvalidSibling {
                parent: parent.clone(),
                child: child.clone(),
            })
    }

    pub(crate) fn attributes_mut(
        &mut self,
        element: &NodeId,
    ) -> Result<&mut Vec<Attribute<()>>, SurfaceError> {
        match &mut self.record_mut(element)?.kind {
            NodeKind::Element { attributes, .. } => Ok(attributes),
            NodeKind::Text { .. } => Err(SurfaceError::WrongNodeKind(element.clone())),
        }
    }

    pub(crate) fn set_text(&mut self, node: &NodeId, text: &str) -> Result<(), SurfaceError> {
        match &mut self.record_mut(node)?.kind {
            NodeKind::Text { text: existing } => {
                existing.clear();
                existing.push_str(text);
                Ok(())
            }
            NodeKind::Element { .. } => Err(SurfaceError::WrongNodeKind(node.clone())),
        }
    }

    pub(crate) fn materialize(&self, id: &NodeId) -> Result<Node<()>, SurfaceError> {
        let record = self.record(id)?;
        let node = match &record.kind {
            NodeKind::Element { tag, attributes } => Node::Element {
                id: id.clone(),
                tag: Arc::clone(tag),
                attributes: attributes.clone(),
                children: record
                    .children
                    .iter()
                    .map(|child| self.materialize(child))
                    .collect::<Result<Vec<_>, _>>()?,
            },
            NodeKind::Text { text } => Node::Text {
                id: id.clone(),
                text: text.clone(),
            },
        };
        Ok(node)
    }
}

fn ensure_key(id: &NodeId) -> Result<(), SurfaceError> {
    if !id.is_assigned() {
        return Err(SurfaceError::InvalidKey(id.clone()));
    }
    Ok(())
}

pub(crate) fn erase<M>(attribute: &Attribute<M>) -> Attribute<()> {
    match attribute {
        Attribute::Plain { name, value } => Attribute::Plain {
            name: Arc::clone(name),
            value: value.clone(),
        },
        Attribute::Handler(handler) => Attribute::Handler(Handler {
            event: Arc::clone(&handler.event),
            id: handler.id,
            payload: HandlerPayload::Message(()),
        }),
    }
}

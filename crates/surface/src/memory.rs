use crate::arena::{NodeKind, SurfaceArena, erase};
use crate::error::SurfaceError;
use crate::{DocumentHost, Surface};
use core_types::{DomVersion, SurfaceHandle};
use std::collections::HashSet;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;
use vdom::dom_snapshot::{DomSnapshot, DomSnapshotOptions};
use vdom::{HandlerId, HeadContent, HeadPatch, Node, NodeId, Patch, escape_html};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// In-memory surface: an arena of live nodes plus title, head and history.
///
/// Every patch is validated against the live arena before it mutates
/// anything observable, so a rejected patch points at a desynchronized
/// patch stream rather than a half-applied one.
pub struct MemorySurface {
    arena: SurfaceArena,
    root: Option<NodeId>,
    handle: Option<SurfaceHandle>,
    version: DomVersion,
    title: String,
    head: Vec<HeadContent>,
    current: Url,
    history: Vec<Url>,
    loads: Vec<Url>,
}

impl MemorySurface {
    pub fn new(start: Url) -> Self {
        Self {
            arena: SurfaceArena::new(),
            root: None,
            handle: None,
            version: DomVersion::INITIAL,
            title: String::new(),
            head: Vec::new(),
            history: vec![start.clone()],
            current: start,
            loads: Vec::new(),
        }
    }

    pub fn handle(&self) -> Option<SurfaceHandle> {
        self.handle
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn head(&self) -> &[HeadContent] {
        &self.head
    }

    /// Every history entry, oldest first; the last one is the current URL.
    pub fn history(&self) -> &[Url] {
        &self.history
    }

    /// Full navigations requested through [`DocumentHost::load_url`].
    pub fn loads(&self) -> &[Url] {
        &self.loads
    }

    pub fn root(&self) -> Option<&NodeId> {
        self.root.as_ref()
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.arena.get(id).is_some()
    }

    pub fn text_of(&self, id: &NodeId) -> Option<&str> {
        match &self.arena.get(id)?.kind {
            NodeKind::Text { text } => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    /// Handler id listening for `event` on the live element `element`.
    pub fn listener(&self, element: &NodeId, event: &str) -> Option<HandlerId> {
        match &self.arena.get(element)?.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .filter_map(|a| a.as_handler())
                .find(|h| &*h.event == event)
                .map(|h| h.id),
            NodeKind::Text { .. } => None,
        }
    }

    /// Rebuild the live tree as a virtual tree with erased handler payloads.
    pub fn materialize(&self) -> Result<Node<()>, SurfaceError> {
        let root = self.root.as_ref().ok_or(SurfaceError::MissingRoot)?;
        self.arena.materialize(root)
    }

    pub fn snapshot(&self, options: DomSnapshotOptions) -> Result<DomSnapshot, SurfaceError> {
        Ok(DomSnapshot::new(&self.materialize()?, options))
    }

    /// Serialize the live body tree. Elements carry their identity token as `id`.
    pub fn to_html(&self) -> Result<String, SurfaceError> {
        let root = self.root.as_ref().ok_or(SurfaceError::MissingRoot)?;
        let mut out = String::new();
        self.write_html(root, &mut out)?;
        Ok(out)
    }

    /// Serialize title, head entries and body as one HTML document.
    pub fn document_html(&self) -> Result<String, SurfaceError> {
        let mut out = String::from("<!DOCTYPE html>\n<html><head>");
        let _ = write!(out, "<title>{}</title>", escape_html(&self.title));
        for entry in &self.head {
            out.push_str(&entry.to_html());
        }
        out.push_str("</head><body>");
        out.push_str(&self.to_html()?);
        out.push_str("</body></html>");
        Ok(out)
    }

    fn write_html(&self, id: &NodeId, out: &mut String) -> Result<(), SurfaceError> {
        let record = self.arena.record(id)?;
        match &record.kind {
            NodeKind::Text { text } => out.push_str(&escape_html(text)),
            NodeKind::Element { tag, attributes } => {
                let _ = write!(out, "<{tag} id=\"{}\"", escape_html(&id.to_string()));
                for attribute in attributes {
                    if let vdom::Attribute::Plain { name, value } = attribute
                        && !attribute.is_identity()
                    {
                        let _ = write!(out, " {name}=\"{}\"", escape_html(value));
                    }
                }
                out.push('>');
                for child in &record.children {
                    self.write_html(child, out)?;
                }
                let _ = write!(out, "</{tag}>");
            }
        }
        Ok(())
    }

    fn resolve(&self, url: &str) -> Result<Url, SurfaceError> {
        self.current
            .join(url)
            .map_err(|source| SurfaceError::InvalidUrl {
                url: url.to_string(),
                source,
            })
    }

    fn insert_child<M>(
        &mut self,
        parent: &NodeId,
        index: usize,
        child: &Node<M>,
    ) -> Result<(), SurfaceError> {
        let len = self.arena.children_mut(parent)?.len();
        if index > len {
            return Err(SurfaceError::InvalidIndex {
                parent: parent.clone(),
                index,
                len,
            });
        }
        self.arena.check_insertable(child, &HashSet::new())?;
        self.arena.insert_subtree(child, Some(parent));
        self.arena
            .children_mut(parent)?
            .insert(index, child.id().clone());
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: &NodeId,
        child: &NodeId,
        text: bool,
    ) -> Result<(), SurfaceError> {
        let is_text = matches!(self.arena.record(child)?.kind, NodeKind::Text { .. });
        if is_text != text {
            return Err(SurfaceError::WrongNodeKind(child.clone()));
        }
        self.arena.position(parent, child)?;
        self.arena.remove_subtree(child)
    }

    fn replace_child<M>(
        &mut self,
        parent: Option<&NodeId>,
        old: &NodeId,
        new: &Node<M>,
    ) -> Result<(), SurfaceError> {
        let slot = match parent {
            Some(parent) => Some(self.arena.position(parent, old)?),
            None if self.root.as_ref() == Some(old) => None,
            None => return Err(SurfaceError::InvalidSibling {
                parent: NodeId::Unassigned,
                child: old.clone(),
            }),
        };
        let freed = self.arena.subtree_ids(old);
        self.arena.check_insertable(new, &freed)?;
        self.arena.remove_subtree(old)?;
        self.arena.insert_subtree(new, parent);
        match (parent, slot) {
            (Some(parent), Some(slot)) => {
                self.arena
                    .children_mut(parent)?
                    .insert(slot, new.id().clone());
            }
            _ => self.root = Some(new.id().clone()),
        }
        Ok(())
    }

    fn reorder_children(&mut self, parent: &NodeId, order: &[NodeId]) -> Result<(), SurfaceError> {
        let children = self.arena.children_mut(parent)?;
        let current: HashSet<&NodeId> = children.iter().collect();
        let requested: HashSet<&NodeId> = order.iter().collect();
        if order.len() != children.len() || requested.len() != order.len() || current != requested {
            return Err(SurfaceError::InvalidReorder {
                parent: parent.clone(),
            });
        }
        *children = order.to_vec();
        Ok(())
    }
}

impl DocumentHost for MemorySurface {
    fn set_title(&mut self, title: &str) {
        if self.title != title {
            log::debug!(target: "mvu.surface", "title: {title:?}");
            self.title = title.to_string();
        }
    }

    fn apply_head(&mut self, patch: &HeadPatch) -> Result<(), SurfaceError> {
        let content = patch.content();
        let key = content.key();
        let position = self.head.iter().position(|entry| entry.key() == key);
        match (patch, position) {
            (HeadPatch::Add(_), None) => self.head.push(content.clone()),
            (HeadPatch::Add(_), Some(_)) => return Err(SurfaceError::DuplicateHeadKey(key)),
            (HeadPatch::Update(_), Some(i)) => self.head[i] = content.clone(),
            (HeadPatch::Remove(_), Some(i)) => {
                self.head.remove(i);
            }
            (HeadPatch::Update(_) | HeadPatch::Remove(_), None) => {
                return Err(SurfaceError::MissingHeadKey(key));
            }
        }
        Ok(())
    }

    fn push_url(&mut self, url: &str) -> Result<Url, SurfaceError> {
        let next = self.resolve(url)?;
        log::debug!(target: "mvu.surface", "push {next}");
        self.history.push(next.clone());
        self.current = next.clone();
        Ok(next)
    }

    fn replace_url(&mut self, url: &str) -> Result<Url, SurfaceError> {
        let next = self.resolve(url)?;
        log::debug!(target: "mvu.surface", "replace {} with {next}", self.current);
        if let Some(last) = self.history.last_mut() {
            *last = next.clone();
        }
        self.current = next.clone();
        Ok(next)
    }

    fn load_url(&mut self, url: &str) -> Result<Url, SurfaceError> {
        let next = self.resolve(url)?;
        log::info!(target: "mvu.surface", "load {next}");
        self.loads.push(next.clone());
        self.history.push(next.clone());
        self.current = next.clone();
        Ok(next)
    }

    fn current_url(&self) -> &Url {
        &self.current
    }

    fn version(&self) -> DomVersion {
        self.version
    }

    fn bump_version(&mut self, from: DomVersion, to: DomVersion) -> Result<(), SurfaceError> {
        if self.version != from {
            return Err(SurfaceError::VersionMismatch {
                expected: self.version,
                got: from,
            });
        }
        if to != from.next() {
            return Err(SurfaceError::NonMonotonicVersion { from, to });
        }
        self.version = to;
        Ok(())
    }
}

impl<M> Surface<M> for MemorySurface {
    fn render_initial(&mut self, root: &Node<M>) -> Result<SurfaceHandle, SurfaceError> {
        if self.root.is_some() {
            return Err(SurfaceError::AlreadyRendered);
        }
        self.arena.check_insertable(root, &HashSet::new())?;
        self.arena.insert_subtree(root, None);
        self.root = Some(root.id().clone());
        let handle = SurfaceHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed));
        self.handle = Some(handle);
        log::debug!(
            target: "mvu.surface",
            "rendered {} nodes as {handle:?}",
            self.arena.len()
        );
        Ok(handle)
    }

    fn apply_patch(&mut self, patch: &Patch<M>) -> Result<(), SurfaceError> {
        match patch {
            Patch::AddChild {
                parent,
                index,
                child,
            } => {
                if child.is_text() {
                    return Err(SurfaceError::WrongNodeKind(child.id().clone()));
                }
                self.insert_child(parent, *index, child)
            }
            Patch::AddText {
                parent,
                index,
                node,
            } => {
                if !node.is_text() {
                    return Err(SurfaceError::WrongNodeKind(node.id().clone()));
                }
                self.insert_child(parent, *index, node)
            }
            Patch::RemoveChild { parent, child } => self.remove_child(parent, child.id(), false),
            Patch::RemoveText { parent, node } => self.remove_child(parent, node, true),
            Patch::ReplaceChild { parent, old, new } => {
                self.replace_child(parent.as_ref(), old.id(), new)
            }
            Patch::ReorderChildren { parent, order } => self.reorder_children(parent, order),
            Patch::UpdateAttribute { element, old, new } => {
                let attributes = self.arena.attributes_mut(element)?;
                let slot = attributes
                    .iter_mut()
                    .find(|a| a.key() == old.key())
                    .ok_or_else(|| SurfaceError::MissingAttribute {
                        element: element.clone(),
                        name: old.name(),
                    })?;
                *slot = erase(new);
                Ok(())
            }
            Patch::AddAttribute { element, attribute } => {
                let attributes = self.arena.attributes_mut(element)?;
                if attributes.iter().any(|a| a.key() == attribute.key()) {
                    return Err(SurfaceError::DuplicateAttribute {
                        element: element.clone(),
                        name: attribute.name(),
                    });
                }
                attributes.push(erase(attribute));
                Ok(())
            }
            Patch::RemoveAttribute { element, attribute } => {
                let attributes = self.arena.attributes_mut(element)?;
                let position = attributes
                    .iter()
                    .position(|a| a.key() == attribute.key())
                    .ok_or_else(|| SurfaceError::MissingAttribute {
                        element: element.clone(),
                        name: attribute.name(),
                    })?;
                attributes.remove(position);
                Ok(())
            }
            Patch::UpdateText { node, text } => self.arena.set_text(node, text),
        }
    }
}

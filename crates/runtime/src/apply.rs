//! Patch application against a surface plus the handler table.
//!
//! Ordering contract:
//! - Handlers leaving the tree are unregistered before the surface mutation,
//!   so a racing event never resolves against an element that is gone.
//! - Handlers entering the tree are registered after the surface mutation, so
//!   a resolvable handler always has a live element.
//! - A handler whose id survives an update has its payload swapped after the
//!   surface mutation.

use crate::error::RuntimeError;
use crate::registry::HandlerRegistry;
use surface::Surface;
use vdom::{Attribute, Patch};

pub(crate) fn apply_patch<M, S>(
    surface: &mut S,
    registry: &HandlerRegistry<M>,
    patch: &Patch<M>,
) -> Result<(), RuntimeError>
where
    M: Clone + PartialEq,
    S: Surface<M>,
{
    match patch {
        Patch::AddChild { child, .. } | Patch::AddText { node: child, .. } => {
            surface.apply_patch(patch)?;
            registry.register_subtree(child)?;
        }
        Patch::RemoveChild { child, .. } => {
            registry.unregister_subtree(child);
            surface.apply_patch(patch)?;
        }
        Patch::ReplaceChild { old, new, .. } => {
            registry.unregister_subtree(old);
            surface.apply_patch(patch)?;
            registry.register_subtree(new)?;
        }
        Patch::UpdateAttribute { old, new, .. } => {
            match (old.as_handler(), new.as_handler()) {
                (Some(before), Some(after)) if before.id == after.id => {
                    surface.apply_patch(patch)?;
                    registry.replace(after);
                }
                _ => {
                    if let Some(before) = old.as_handler() {
                        registry.unregister(before.id);
                    }
                    surface.apply_patch(patch)?;
                    register_attribute(registry, new)?;
                }
            }
        }
        Patch::AddAttribute { attribute, .. } => {
            surface.apply_patch(patch)?;
            register_attribute(registry, attribute)?;
        }
        Patch::RemoveAttribute { attribute, .. } => {
            if let Some(handler) = attribute.as_handler() {
                registry.unregister(handler.id);
            }
            surface.apply_patch(patch)?;
        }
        Patch::RemoveText { .. } | Patch::ReorderChildren { .. } | Patch::UpdateText { .. } => {
            surface.apply_patch(patch)?;
        }
    }
    Ok(())
}

fn register_attribute<M: Clone + PartialEq>(
    registry: &HandlerRegistry<M>,
    attribute: &Attribute<M>,
) -> Result<(), RuntimeError> {
    match attribute.as_handler() {
        Some(handler) => registry.register(handler),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surface::MemorySurface;
    use url::Url;
    use vdom::builder::element;
    use vdom::{HandlerId, IdAllocator, Node, NodeId, align, diff};

    #[derive(Clone, Debug, PartialEq)]
    enum Msg {
        Open(u8),
        Close,
    }

    fn render(
        live: Option<&Node<Msg>>,
        fresh: Node<Msg>,
        ids: &mut IdAllocator,
    ) -> Node<Msg> {
        align(live, fresh, ids)
    }

    fn setup(tree: &Node<Msg>) -> (MemorySurface, HandlerRegistry<Msg>) {
        let mut surface = MemorySurface::new(Url::parse("https://app.test/").expect("url"));
        surface.render_initial(tree).expect("render");
        let registry = HandlerRegistry::new();
        registry.register_subtree(tree).expect("register");
        (surface, registry)
    }

    fn apply_all(
        surface: &mut MemorySurface,
        registry: &HandlerRegistry<Msg>,
        patches: &[Patch<Msg>],
    ) {
        for patch in patches {
            apply_patch(surface, registry, patch).expect("apply");
        }
    }

    fn handler_id(surface: &MemorySurface, key: &str, event: &str) -> HandlerId {
        surface.listener(&NodeId::keyed(key), event).expect("listener")
    }

    #[test]
    fn removed_subtree_unregisters_its_handlers() {
        let mut ids = IdAllocator::new();
        let live = render(
            None,
            element("div")
                .key("root")
                .child(element("button").key("open").on("click", Msg::Open(1)))
                .child(element("button").key("close").on("click", Msg::Close))
                .build(),
            &mut ids,
        );
        let (mut surface, registry) = setup(&live);
        let close = handler_id(&surface, "close", "click");

        let next = render(
            Some(&live),
            element("div")
                .key("root")
                .child(element("button").key("open").on("click", Msg::Open(1)))
                .build(),
            &mut ids,
        );
        apply_all(&mut surface, &registry, &diff(&live, &next));
        assert!(!registry.contains(close));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn payload_change_keeps_the_handler_id() {
        let mut ids = IdAllocator::new();
        let live = render(
            None,
            element("button").key("b").on("click", Msg::Open(1)).build(),
            &mut ids,
        );
        let (mut surface, registry) = setup(&live);
        let id = handler_id(&surface, "b", "click");

        let next = render(
            Some(&live),
            element("button").key("b").on("click", Msg::Open(2)).build(),
            &mut ids,
        );
        apply_all(&mut surface, &registry, &diff(&live, &next));
        assert_eq!(handler_id(&surface, "b", "click"), id);
        let registered = registry.get(id).expect("registered");
        assert_eq!(registered.payload, vdom::HandlerPayload::Message(Msg::Open(2)));
    }

    #[test]
    fn added_and_removed_attributes_track_handlers() {
        let mut ids = IdAllocator::new();
        let live = render(None, element("a").key("link").build(), &mut ids);
        let (mut surface, registry) = setup(&live);
        assert!(registry.is_empty());

        let with_handler = render(
            Some(&live),
            element("a").key("link").on("click", Msg::Close).build(),
            &mut ids,
        );
        apply_all(&mut surface, &registry, &diff(&live, &with_handler));
        let id = handler_id(&surface, "link", "click");
        assert!(registry.contains(id));

        let without = render(Some(&with_handler), element("a").key("link").build(), &mut ids);
        apply_all(&mut surface, &registry, &diff(&with_handler, &without));
        assert!(!registry.contains(id));
        assert_eq!(surface.listener(&NodeId::keyed("link"), "click"), None);
    }

    #[test]
    fn replaced_node_swaps_registrations() {
        let mut ids = IdAllocator::new();
        let live = render(
            None,
            element("div")
                .key("root")
                .child(element("span").key("x").on("click", Msg::Close))
                .build(),
            &mut ids,
        );
        let (mut surface, registry) = setup(&live);
        let before = handler_id(&surface, "x", "click");

        let next = render(
            Some(&live),
            element("div")
                .key("root")
                .child(element("em").key("x").on("click", Msg::Close))
                .build(),
            &mut ids,
        );
        apply_all(&mut surface, &registry, &diff(&live, &next));
        let after = handler_id(&surface, "x", "click");
        assert_ne!(before, after);
        assert!(!registry.contains(before));
        assert!(registry.contains(after));
    }

    #[test]
    fn surface_rejection_is_reported() {
        let mut ids = IdAllocator::new();
        let live = render(None, element("div").key("root").build(), &mut ids);
        let (mut surface, registry) = setup(&live);
        let stray: Patch<Msg> = Patch::RemoveText {
            parent: NodeId::keyed("root"),
            node: NodeId::keyed("gone"),
        };
        assert!(matches!(
            apply_patch(&mut surface, &registry, &stray),
            Err(RuntimeError::Surface(_))
        ));
    }
}

//! Minimal constructors for virtual trees.

use crate::types::{Attribute, Decoder, Handler, HandlerId, HandlerPayload, Node, NodeId};
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub struct ElementBuilder<M> {
    id: NodeId,
    tag: Arc<str>,
    attributes: Vec<Attribute<M>>,
    children: Vec<Node<M>>,
}

pub fn element<M>(tag: impl Into<Arc<str>>) -> ElementBuilder<M> {
    ElementBuilder {
        id: NodeId::Unassigned,
        tag: tag.into(),
        attributes: Vec::new(),
        children: Vec::new(),
    }
}

pub fn text<M>(value: impl Into<String>) -> Node<M> {
    Node::Text {
        id: NodeId::Unassigned,
        text: value.into(),
    }
}

/// Text node with an explicit key.
pub fn keyed_text<M>(key: impl Into<Arc<str>>, value: impl Into<String>) -> Node<M> {
    Node::Text {
        id: NodeId::keyed(key),
        text: value.into(),
    }
}

impl<M> ElementBuilder<M> {
    pub fn key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.id = NodeId::keyed(key);
        self
    }

    pub fn attr(mut self, name: impl Into<Arc<str>>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::plain(name, value));
        self
    }

    pub fn on(mut self, event: impl Into<Arc<str>>, message: M) -> Self {
        self.attributes.push(Attribute::Handler(Handler {
            event: event.into(),
            id: HandlerId::INVALID,
            payload: HandlerPayload::Message(message),
        }));
        self
    }

    pub fn child(mut self, child: impl Into<Node<M>>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node<M>>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Node<M> {
        Node::Element {
            id: self.id,
            tag: self.tag,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

impl<M: 'static> ElementBuilder<M> {
    pub fn on_decoded<T>(mut self, event: impl Into<Arc<str>>, f: fn(T) -> M) -> Self
    where
        T: DeserializeOwned + 'static,
    {
        self.attributes.push(Attribute::Handler(Handler {
            event: event.into(),
            id: HandlerId::INVALID,
            payload: HandlerPayload::Decode(Decoder::new(f)),
        }));
        self
    }
}

impl<M> From<ElementBuilder<M>> for Node<M> {
    fn from(builder: ElementBuilder<M>) -> Self {
        builder.build()
    }
}

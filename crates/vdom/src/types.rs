use crate::head::HeadContent;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Attribute whose value always mirrors the owning element's identity token.
pub const IDENTITY_ATTRIBUTE: &str = "id";

/// Identity token of a node.
///
/// Two nodes are the same logical node iff their ids are equal. Views leave
/// ids `Unassigned` or pick an explicit `Keyed` id; `Generated` ids are minted
/// by an [`IdAllocator`](crate::IdAllocator) and owned by the runtime.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeId {
    Unassigned,
    Generated(u64),
    Keyed(Arc<str>),
}

impl NodeId {
    pub fn keyed(key: impl Into<Arc<str>>) -> Self {
        NodeId::Keyed(key.into())
    }

    pub fn is_keyed(&self) -> bool {
        matches!(self, NodeId::Keyed(_))
    }

    pub fn is_assigned(&self) -> bool {
        !matches!(self, NodeId::Unassigned)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Unassigned => f.write_str("?"),
            NodeId::Generated(n) => write!(f, "n{n}"),
            NodeId::Keyed(key) => f.write_str(key),
        }
    }
}

/// Identity of a registered event handler, distinct from any node id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

impl HandlerId {
    /// Reserved sentinel for "not yet minted".
    pub const INVALID: HandlerId = HandlerId(0);
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("handler expects a `{shape}` payload but the event carried none")]
    MissingPayload { shape: &'static str },
    #[error("event payload does not match `{shape}`: {source}")]
    Shape {
        shape: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Turns raw event data into a message, typed by a declared data shape `T`.
///
/// Equality is by identity of the wrapped function and shape, so a view that
/// rebuilds the same decoder on every render produces equal handlers.
pub struct Decoder<M> {
    shape: &'static str,
    type_id: TypeId,
    fn_addr: usize,
    decode: Arc<dyn Fn(Value) -> Result<M, serde_json::Error> + Send + Sync>,
}

impl<M: 'static> Decoder<M> {
    pub fn new<T>(f: fn(T) -> M) -> Self
    where
        T: DeserializeOwned + 'static,
    {
        Self {
            shape: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            fn_addr: f as usize,
            decode: Arc::new(move |value| serde_json::from_value::<T>(value).map(f)),
        }
    }
}

impl<M> Decoder<M> {
    pub fn shape(&self) -> &'static str {
        self.shape
    }

    pub fn decode(&self, value: Value) -> Result<M, DecodeError> {
        (self.decode)(value).map_err(|source| DecodeError::Shape {
            shape: self.shape,
            source,
        })
    }
}

impl<M> Clone for Decoder<M> {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape,
            type_id: self.type_id,
            fn_addr: self.fn_addr,
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<M> PartialEq for Decoder<M> {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.fn_addr == other.fn_addr
    }
}

impl<M> fmt::Debug for Decoder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder").field("shape", &self.shape).finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HandlerPayload<M> {
    Message(M),
    Decode(Decoder<M>),
}

/// Event binding carried as an attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Handler<M> {
    pub event: Arc<str>,
    pub id: HandlerId,
    pub payload: HandlerPayload<M>,
}

impl<M: Clone> Handler<M> {
    /// Produce the message for one firing of this handler.
    pub fn resolve(&self, payload: Option<Value>) -> Result<M, DecodeError> {
        match &self.payload {
            HandlerPayload::Message(message) => Ok(message.clone()),
            HandlerPayload::Decode(decoder) => match payload {
                Some(value) => decoder.decode(value),
                None => Err(DecodeError::MissingPayload {
                    shape: decoder.shape(),
                }),
            },
        }
    }
}

/// Attribute lookup key; plain attributes and handlers live in separate namespaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttrKey<'a> {
    Plain(&'a str),
    Event(&'a str),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Attribute<M> {
    Plain { name: Arc<str>, value: String },
    Handler(Handler<M>),
}

impl<M> Attribute<M> {
    pub fn plain(name: impl Into<Arc<str>>, value: impl Into<String>) -> Self {
        Attribute::Plain {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> AttrKey<'_> {
        match self {
            Attribute::Plain { name, .. } => AttrKey::Plain(name),
            Attribute::Handler(handler) => AttrKey::Event(&handler.event),
        }
    }

    /// Name as it appears on a surface (`on{event}` for handlers).
    pub fn name(&self) -> String {
        match self {
            Attribute::Plain { name, .. } => name.to_string(),
            Attribute::Handler(handler) => format!("on{}", handler.event),
        }
    }

    pub fn as_handler(&self) -> Option<&Handler<M>> {
        match self {
            Attribute::Handler(handler) => Some(handler),
            Attribute::Plain { .. } => None,
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Attribute::Plain { name, .. } if &**name == IDENTITY_ATTRIBUTE)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node<M> {
    Element {
        id: NodeId,
        tag: Arc<str>,
        attributes: Vec<Attribute<M>>,
        children: Vec<Node<M>>,
    },
    Text {
        id: NodeId,
        text: String,
    },
}

impl<M> Node<M> {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::Element { id, .. } | Node::Text { id, .. } => id,
        }
    }

    pub fn set_id(&mut self, new_id: NodeId) {
        match self {
            Node::Element { id, .. } | Node::Text { id, .. } => *id = new_id,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text { .. })
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Node::Element { tag, .. } => Some(tag),
            Node::Text { .. } => None,
        }
    }

    pub fn attributes(&self) -> &[Attribute<M>] {
        match self {
            Node::Element { attributes, .. } => attributes,
            Node::Text { .. } => &[],
        }
    }

    pub fn children(&self) -> &[Node<M>] {
        match self {
            Node::Element { children, .. } => children,
            Node::Text { .. } => &[],
        }
    }

    /// True when both nodes could occupy the same live slot without a replace.
    pub fn same_shape(&self, other: &Node<M>) -> bool {
        match (self, other) {
            (Node::Text { .. }, Node::Text { .. }) => true,
            (Node::Element { tag: a, .. }, Node::Element { tag: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// A full rendered page: title, body tree and out-of-band head entries.
#[derive(Clone, Debug, PartialEq)]
pub struct Document<M> {
    pub title: String,
    pub head: Vec<HeadContent>,
    pub body: Node<M>,
}

impl<M> Document<M> {
    pub fn new(title: impl Into<String>, body: Node<M>) -> Self {
        Self {
            title: title.into(),
            head: Vec::new(),
            body,
        }
    }

    pub fn with_head(mut self, head: Vec<HeadContent>) -> Self {
        self.head = head;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq)]
    enum Msg {
        Clicked,
        Typed(String),
    }

    #[derive(Deserialize)]
    struct InputData {
        value: String,
    }

    fn typed(data: InputData) -> Msg {
        Msg::Typed(data.value)
    }

    #[test]
    fn node_id_display_is_the_identity_token() {
        assert_eq!(NodeId::Generated(42).to_string(), "n42");
        assert_eq!(NodeId::keyed("nav-home").to_string(), "nav-home");
        assert_eq!(NodeId::Unassigned.to_string(), "?");
    }

    #[test]
    fn message_handler_resolves_without_payload() {
        let handler = Handler {
            event: Arc::from("click"),
            id: HandlerId(3),
            payload: HandlerPayload::Message(Msg::Clicked),
        };
        assert_eq!(handler.resolve(None).expect("resolve"), Msg::Clicked);
    }

    #[test]
    fn decoder_handler_decodes_declared_shape() {
        let handler = Handler {
            event: Arc::from("input"),
            id: HandlerId(4),
            payload: HandlerPayload::Decode(Decoder::new(typed)),
        };
        let msg = handler
            .resolve(Some(serde_json::json!({ "value": "hello" })))
            .expect("decode");
        assert_eq!(msg, Msg::Typed("hello".into()));
        assert!(matches!(
            handler.resolve(None),
            Err(DecodeError::MissingPayload { .. })
        ));
        assert!(matches!(
            handler.resolve(Some(serde_json::json!(12))),
            Err(DecodeError::Shape { .. })
        ));
    }

    #[test]
    fn decoders_compare_by_function() {
        fn other(data: InputData) -> Msg {
            Msg::Typed(data.value.to_uppercase())
        }
        let a: Decoder<Msg> = Decoder::new(typed);
        let b: Decoder<Msg> = Decoder::new(typed);
        let c: Decoder<Msg> = Decoder::new(other);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn handler_attribute_name_uses_event() {
        let attr: Attribute<Msg> = Attribute::Handler(Handler {
            event: Arc::from("click"),
            id: HandlerId(1),
            payload: HandlerPayload::Message(Msg::Clicked),
        });
        assert_eq!(attr.name(), "onclick");
        assert_eq!(attr.key(), AttrKey::Event("click"));
        assert!(Attribute::<Msg>::plain("id", "x").is_identity());
    }
}

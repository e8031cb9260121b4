use core_types::DomVersion;
use vdom::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("surface is at {expected}, batch starts at {got}")]
    VersionMismatch { expected: DomVersion, got: DomVersion },
    #[error("batch does not advance by one version ({from} -> {to})")]
    NonMonotonicVersion { from: DomVersion, to: DomVersion },
    #[error("node id must be assigned before it reaches a surface")]
    InvalidKey(NodeId),
    #[error("node `{0}` is already live")]
    DuplicateKey(NodeId),
    #[error("node `{0}` is not live")]
    MissingKey(NodeId),
    #[error("node `{0}` has the wrong kind for this operation")]
    WrongNodeKind(NodeId),
    #[error("node `{0}` cannot be used as a parent")]
    InvalidParent(NodeId),
    #[error("node `{child}` is not a child of `{parent}`")]
    InvalidSibling { parent: NodeId, child: NodeId },
    #[error("index {index} is out of range for `{parent}` with {len} children")]
    InvalidIndex {
        parent: NodeId,
        index: usize,
        len: usize,
    },
    #[error("reorder of `{parent}` does not cover its current children")]
    InvalidReorder { parent: NodeId },
    #[error("element `{element}` has no attribute `{name}`")]
    MissingAttribute { element: NodeId, name: String },
    #[error("element `{element}` already has attribute `{name}`")]
    DuplicateAttribute { element: NodeId, name: String },
    #[error("head entry `{0}` is already present")]
    DuplicateHeadKey(String),
    #[error("head entry `{0}` is not present")]
    MissingHeadKey(String),
    #[error("surface already holds a rendered tree")]
    AlreadyRendered,
    #[error("surface has no rendered tree")]
    MissingRoot,
    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

//! Virtual tree model and reconciliation.
//!
//! A render cycle goes `view -> align -> diff`: the freshly rendered tree is
//! aligned against the live tree so unchanged logical nodes keep their ids,
//! then diffed by id into an ordered patch stream for a surface.

pub mod align;
pub mod builder;
pub mod dom_diff;
#[cfg(any(test, feature = "dom-snapshot"))]
pub mod dom_snapshot;
pub mod head;
pub mod traverse;

mod dom_patch;
mod ids;
mod types;

pub use crate::align::align;
pub use crate::dom_diff::diff;
pub use crate::dom_patch::Patch;
pub use crate::head::{HeadContent, HeadPatch, diff_head, escape_html};
pub use crate::ids::IdAllocator;
pub use crate::types::{
    AttrKey, Attribute, DecodeError, Decoder, Document, Handler, HandlerId, HandlerPayload,
    IDENTITY_ATTRIBUTE, Node, NodeId,
};

//! Renderable surfaces.
//!
//! A surface is whatever the runtime renders into. It only ever sees patch
//! streams produced by `vdom::diff`, head patches and navigation requests; it
//! never consults the virtual trees themselves.

mod arena;
mod error;
mod memory;

pub use crate::error::SurfaceError;
pub use crate::memory::MemorySurface;

use core_types::{DomVersion, SurfaceHandle};
use url::Url;
use vdom::{HeadPatch, Node, Patch};

/// Document-level state of a surface: title, head entries, history, version.
pub trait DocumentHost {
    fn set_title(&mut self, title: &str);

    fn apply_head(&mut self, patch: &HeadPatch) -> Result<(), SurfaceError>;

    /// Push a history entry. Relative URLs resolve against the current one.
    fn push_url(&mut self, url: &str) -> Result<Url, SurfaceError>;

    /// Overwrite the current history entry.
    fn replace_url(&mut self, url: &str) -> Result<Url, SurfaceError>;

    /// Full navigation away from the running program.
    fn load_url(&mut self, url: &str) -> Result<Url, SurfaceError>;

    fn current_url(&self) -> &Url;

    fn version(&self) -> DomVersion;

    /// Close a patch batch. `from` must be the current version and `to` its successor.
    fn bump_version(&mut self, from: DomVersion, to: DomVersion) -> Result<(), SurfaceError>;
}

/// Tree operations of a surface for messages of type `M`.
pub trait Surface<M>: DocumentHost {
    /// Materialize `root` on an empty surface.
    fn render_initial(&mut self, root: &Node<M>) -> Result<SurfaceHandle, SurfaceError>;

    /// Apply one patch. Patches must be applied in the order the differ emitted them.
    fn apply_patch(&mut self, patch: &Patch<M>) -> Result<(), SurfaceError>;
}

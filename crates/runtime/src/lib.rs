//! Model-View-Update runtime.
//!
//! Drives a [`Program`] against a [`surface::Surface`]: a single consumer
//! serializes messages, renders, reconciles the live tree and dispatches
//! commands. Hosts report events through an [`EventSink`]; effects run on a
//! [`CommandExecutor`].

mod apply;
mod command;
mod config;
mod error;
mod program;
mod registry;
mod runtime;

pub use crate::command::{Command, CommandContext, CommandExecutor, NoEffects};
pub use crate::config::{ConfigError, RuntimeConfig};
pub use crate::error::{CommandError, RuntimeError};
pub use crate::program::Program;
pub use crate::registry::{DispatchOutcome, EventSink, HandlerRegistry};
pub use crate::runtime::Runtime;
pub use bus::MessageSender;

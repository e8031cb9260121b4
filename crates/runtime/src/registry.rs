//! Handler registration table.
//!
//! The render loop is the only writer; [`EventSink`]s read it from whatever
//! thread the host reports raw events on. Registrations change only while a
//! patch is applied, ordered against the surface mutation by the applier.

use crate::error::RuntimeError;
use bus::MessageSender;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use vdom::traverse::for_each_handler;
use vdom::{DecodeError, Handler, HandlerId, Node};

type Table<M> = Arc<RwLock<HashMap<HandlerId, Handler<M>>>>;

pub struct HandlerRegistry<M> {
    table: Table<M>,
}

impl<M> Clone for HandlerRegistry<M> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<M> Default for HandlerRegistry<M> {
    fn default() -> Self {
        Self {
            table: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<M: Clone + PartialEq> HandlerRegistry<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering an equal handler again is a no-op; a different handler
    /// under a live id means the id source is broken.
    pub fn register(&self, handler: &Handler<M>) -> Result<(), RuntimeError> {
        let mut table = self.table.write();
        match table.get(&handler.id) {
            Some(existing) if existing == handler => Ok(()),
            Some(_) => Err(RuntimeError::DuplicateHandler {
                id: handler.id,
                event: handler.event.to_string(),
            }),
            None => {
                table.insert(handler.id, handler.clone());
                Ok(())
            }
        }
    }

    /// Swap the payload of an already registered handler in place.
    pub fn replace(&self, handler: &Handler<M>) {
        self.table.write().insert(handler.id, handler.clone());
    }

    pub fn unregister(&self, id: HandlerId) -> bool {
        self.table.write().remove(&id).is_some()
    }

    pub fn register_subtree(&self, node: &Node<M>) -> Result<(), RuntimeError> {
        let mut result = Ok(());
        for_each_handler(node, &mut |_, handler| {
            if result.is_ok() {
                result = self.register(handler);
            }
        });
        result
    }

    pub fn unregister_subtree(&self, node: &Node<M>) {
        let mut table = self.table.write();
        for_each_handler(node, &mut |_, handler| {
            table.remove(&handler.id);
        });
    }

    pub fn get(&self, id: HandlerId) -> Option<Handler<M>> {
        self.table.read().get(&id).cloned()
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.table.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    pub fn sink(&self, sender: MessageSender<M>) -> EventSink<M> {
        EventSink {
            table: Arc::clone(&self.table),
            sender,
        }
    }
}

#[derive(Debug)]
pub enum DispatchOutcome {
    Enqueued,
    /// The handler was removed before the event was delivered.
    UnknownHandler,
    DecodeFailed(DecodeError),
    /// The runtime is gone.
    Closed,
}

impl DispatchOutcome {
    pub fn is_enqueued(&self) -> bool {
        matches!(self, DispatchOutcome::Enqueued)
    }
}

/// Host-side entry point: turns "handler `id` fired" into a queued message.
pub struct EventSink<M> {
    table: Table<M>,
    sender: MessageSender<M>,
}

impl<M> Clone for EventSink<M> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            sender: self.sender.clone(),
        }
    }
}

impl<M: Clone> EventSink<M> {
    pub fn dispatch(&self, id: HandlerId, payload: Option<Value>) -> DispatchOutcome {
        let resolved = {
            let table = self.table.read();
            match table.get(&id) {
                Some(handler) => handler.resolve(payload),
                None => {
                    log::debug!(target: "mvu.runtime", "event for unknown handler {id} ignored");
                    return DispatchOutcome::UnknownHandler;
                }
            }
        };
        match resolved {
            Ok(message) => match self.sender.send(message) {
                Ok(()) => DispatchOutcome::Enqueued,
                Err(_) => DispatchOutcome::Closed,
            },
            Err(error) => {
                log::warn!(target: "mvu.runtime", "handler {id}: {error}");
                DispatchOutcome::DecodeFailed(error)
            }
        }
    }
}

//! Identity allocation.
//!
//! A single allocator hands out node and handler ids for the lifetime of a
//! runtime. It is never reset between renders, so an id minted for a new node
//! can never collide with an id that is still live on the surface.

use crate::types::{HandlerId, NodeId};

#[derive(Debug)]
pub struct IdAllocator {
    next_node: u64,
    next_handler: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next_node: 1,
            next_handler: 1,
        }
    }

    pub fn next_node_id(&mut self) -> NodeId {
        let id = NodeId::Generated(self.next_node);
        self.next_node += 1;
        id
    }

    pub fn next_handler_id(&mut self) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        id
    }

    /// Number of node ids minted so far.
    pub fn minted_nodes(&self) -> u64 {
        self.next_node - 1
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

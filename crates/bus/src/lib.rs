//! Single-consumer message queue for the render loop.
//!
//! Producers (event sinks, command executors, timers) hold cloneable
//! [`MessageSender`]s; the runtime owns the one [`Mailbox`]. Messages are
//! delivered strictly FIFO. Commands that are still running hold an
//! [`InFlightGuard`] so the consumer can tell "idle" from "waiting for work".

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BusError {
    #[error("mailbox is closed")]
    Closed,
}

pub struct Mailbox<M> {
    rx: Receiver<M>,
    tx: Sender<M>,
    senders: Arc<AtomicUsize>,
    in_flight: InFlight,
}

impl<M> Mailbox<M> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            rx,
            tx,
            senders: Arc::new(AtomicUsize::new(0)),
            in_flight: InFlight::default(),
        }
    }

    /// New producer handle. Counted by [`Mailbox::sender_count`].
    pub fn sender(&self) -> MessageSender<M> {
        self.senders.fetch_add(1, Ordering::Relaxed);
        MessageSender {
            tx: self.tx.clone(),
            senders: Arc::clone(&self.senders),
        }
    }

    /// Enqueue from the consumer side; does not count as a producer.
    pub fn post(&self, message: M) {
        // The mailbox owns a receiver, so the channel cannot be disconnected here.
        let _ = self.tx.send(message);
    }

    pub fn try_next(&self) -> Option<M> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn next_timeout(&self, timeout: Duration) -> Option<M> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Live producer handles created through [`Mailbox::sender`].
    pub fn sender_count(&self) -> usize {
        self.senders.load(Ordering::Acquire)
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Next message if there is one, or `None` once the queue is drained and
    /// nothing is in flight.
    ///
    /// The in-flight count is read before the queue: a command sends its
    /// messages before releasing its guard, so an idle count followed by an
    /// empty queue means nothing else can arrive.
    pub fn next_or_quiescent(&self, poll: Duration) -> Option<M> {
        loop {
            let idle = self.in_flight.is_idle();
            if let Some(message) = self.try_next() {
                return Some(message);
            }
            if idle {
                return None;
            }
            if let Some(message) = self.next_timeout(poll) {
                return Some(message);
            }
        }
    }
}

impl<M> Default for Mailbox<M> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MessageSender<M> {
    tx: Sender<M>,
    senders: Arc<AtomicUsize>,
}

impl<M> MessageSender<M> {
    pub fn send(&self, message: M) -> Result<(), BusError> {
        self.tx.send(message).map_err(|_| {
            log::debug!(target: "mvu.bus", "message dropped: mailbox closed");
            BusError::Closed
        })
    }
}

impl<M> Clone for MessageSender<M> {
    fn clone(&self) -> Self {
        self.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            tx: self.tx.clone(),
            senders: Arc::clone(&self.senders),
        }
    }
}

impl<M> Drop for MessageSender<M> {
    fn drop(&mut self) {
        self.senders.fetch_sub(1, Ordering::Release);
    }
}

/// Number of commands that may still produce messages.
#[derive(Clone, Debug, Default)]
pub struct InFlight {
    count: Arc<AtomicUsize>,
}

impl InFlight {
    pub fn guard(&self) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            count: Arc::clone(&self.count),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_idle(&self) -> bool {
        self.count() == 0
    }
}

/// Marks one command as in flight until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Release);
    }
}

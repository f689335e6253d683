//! Bounded event queue between interrupt-level producers and the main loop.
//!
//! Producers (timers, front panel, clock input, USB host) hold an
//! [`EventSender`] and post without blocking or allocating. The main loop owns
//! the [`EventQueue`] and pulls at most one event per pass.
//!
//! Overflow policy: when the queue is full the event being posted is dropped
//! and counted. Events already queued are never displaced, so worst-case
//! latency for a queued event is bounded by the capacity.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use transit_types::Event;

/// Default queue depth.
pub const DEFAULT_QUEUE_CAPACITY: usize = 40;

/// Cloneable producer handle. Safe to use from any thread.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<Event>,
    dropped: Arc<AtomicUsize>,
}

impl EventSender {
    /// Post an event. Returns `false` if it was dropped because the queue is full.
    pub fn post(&self, event: Event) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(e)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::trace!(target: "events", "queue full, dropped {:?}", e.kind());
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Number of events dropped on overflow since creation.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer half, owned by the main loop.
pub struct EventQueue {
    rx: Receiver<Event>,
    sender: EventSender,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            rx,
            sender: EventSender {
                tx,
                dropped: Arc::new(AtomicUsize::new(0)),
            },
        }
    }

    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    pub fn post(&self, event: Event) -> bool {
        self.sender.post(event)
    }

    /// Pop the oldest event, if any.
    pub fn next(&self) -> Option<Event> {
        match self.rx.try_recv() {
            Ok(e) => Some(e),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.rx.capacity().unwrap_or(0)
    }

    pub fn dropped(&self) -> usize {
        self.sender.dropped()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

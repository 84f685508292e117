//! In-memory EventBus implementation
//!
//! MemoryEventBus keeps the most recent events for replay and uses a
//! broadcast channel for live subscribers. Both are bounded by the same
//! capacity, so a long session does not retain its whole event history.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use super::SegueEvent;
use super::bus::{EventBus, EventSeq};
use crate::request::RequestId;

/// In-memory implementation of EventBus
pub struct MemoryEventBus {
    /// Most recent events with sequence numbers, oldest first
    events: Mutex<VecDeque<(EventSeq, SegueEvent)>>,
    /// Events kept for replay
    retention: usize,
    /// Next sequence number to assign
    next_seq: AtomicU64,
    /// Broadcast channel for live subscribers
    tx: broadcast::Sender<(EventSeq, SegueEvent)>,
}

impl MemoryEventBus {
    /// Create a new MemoryEventBus keeping `capacity` events for replay and
    /// buffering as many for each live subscriber
    pub fn new(capacity: usize) -> Self {
        let retention = capacity.max(1);
        let (tx, _) = broadcast::channel(retention);
        Self {
            events: Mutex::new(VecDeque::with_capacity(retention)),
            retention,
            next_seq: AtomicU64::new(0),
            tx,
        }
    }

    fn events(&self) -> MutexGuard<'_, VecDeque<(EventSeq, SegueEvent)>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventBus for MemoryEventBus {
    fn publish(&self, event: SegueEvent) -> EventSeq {
        // Assign and store under one lock so history stays in seq order
        let mut events = self.events();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        if events.len() == self.retention {
            events.pop_front();
        }
        events.push_back((seq, event.clone()));
        drop(events);

        // Broadcast to live subscribers (ignore if no receivers)
        let _ = self.tx.send((seq, event));

        seq
    }

    fn subscribe(&self) -> broadcast::Receiver<(EventSeq, SegueEvent)> {
        self.tx.subscribe()
    }

    fn events_from(&self, seq: EventSeq) -> Vec<(EventSeq, SegueEvent)> {
        self.events()
            .iter()
            .filter(|(s, _)| *s >= seq)
            .cloned()
            .collect()
    }

    fn request_events(&self, request_id: &RequestId) -> Vec<(EventSeq, SegueEvent)> {
        self.events()
            .iter()
            .filter(|(_, event)| event.request_id() == Some(request_id))
            .cloned()
            .collect()
    }

    fn current_seq(&self) -> EventSeq {
        self.next_seq.load(Ordering::SeqCst)
    }
}

//! EventBus trait definition
//!
//! Publishing is synchronous: the orchestrator publishes from inside its
//! critical sections, which must never suspend.

use tokio::sync::broadcast;

use super::SegueEvent;
use crate::request::RequestId;

/// Sequence number for events (monotonically increasing)
pub type EventSeq = u64;

/// Event bus for publishing and subscribing to SegueEvents
///
/// Implementations must support:
/// - Publishing events with sequence numbers
/// - Live subscriptions via broadcast channel
/// - Historical replay for late joiners
/// - Request-scoped event retrieval
pub trait EventBus: Send + Sync {
    /// Publish an event, returns its sequence number
    fn publish(&self, event: SegueEvent) -> EventSeq;

    /// Subscribe to all events from now (live stream)
    fn subscribe(&self) -> broadcast::Receiver<(EventSeq, SegueEvent)>;

    /// Get retained events starting from a sequence number (for replay)
    fn events_from(&self, seq: EventSeq) -> Vec<(EventSeq, SegueEvent)>;

    /// Get all events concerning one generation request
    fn request_events(&self, request_id: &RequestId) -> Vec<(EventSeq, SegueEvent)>;

    /// Current sequence number (high water mark)
    fn current_seq(&self) -> EventSeq;
}

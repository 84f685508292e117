//! Event system for observing a session
//!
//! The orchestrator announces every request transition and tree mutation
//! on an [`EventBus`]; the presentation layer subscribes or replays.

pub mod bus;
pub mod memory;
pub mod types;

pub use bus::{EventBus, EventSeq};
pub use memory::MemoryEventBus;
pub use types::SegueEvent;

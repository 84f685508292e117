//! Layered configuration (user file, then project file)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_TOPIC_SEPARATOR, EventsConfig, RawEventsConfig,
    RawSegueConfig, RawSessionConfig, SegueConfig, SessionConfig,
};

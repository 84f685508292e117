use serde::{Deserialize, Serialize};

use crate::context::Difficulty;

/// Default event retention and broadcast capacity of the session event bus
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default joiner for the closing-flow topic summary
pub const DEFAULT_TOPIC_SEPARATOR: &str = " → ";

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSegueConfig {
    #[serde(default)]
    pub session: RawSessionConfig,

    #[serde(default)]
    pub events: RawEventsConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSessionConfig {
    /// Difficulty requested for the root segment
    pub initial_difficulty: Option<Difficulty>,

    /// Joiner for the closing-flow topic summary
    pub topic_separator: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawEventsConfig {
    /// Events kept for replay and buffered per live subscriber
    pub capacity: Option<usize>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SegueConfig {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub initial_difficulty: Difficulty,
    pub topic_separator: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_difficulty: Difficulty::Easy,
            topic_separator: DEFAULT_TOPIC_SEPARATOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = SegueConfig::default();
        assert_eq!(config.session.initial_difficulty, Difficulty::Easy);
        assert_eq!(config.session.topic_separator, DEFAULT_TOPIC_SEPARATOR);
        assert_eq!(config.events.capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = SegueConfig {
            session: SessionConfig {
                initial_difficulty: Difficulty::Hard,
                topic_separator: " / ".to_string(),
            },
            events: EventsConfig { capacity: 16 },
        };

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: SegueConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_raw_config_partial_parsing() {
        let toml_str = r#"
[session]
initial_difficulty = "medium"
"#;
        let raw: RawSegueConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(raw.session.initial_difficulty, Some(Difficulty::Medium));
        assert!(raw.session.topic_separator.is_none());
        assert!(raw.events.capacity.is_none());
    }

    #[test]
    fn test_raw_config_empty_uses_none() {
        let raw: RawSegueConfig = toml::from_str("").unwrap();

        assert!(raw.session.initial_difficulty.is_none());
        assert!(raw.events.capacity.is_none());
    }
}

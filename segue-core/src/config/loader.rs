use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::{
    EventsConfig, RawEventsConfig, RawSegueConfig, RawSessionConfig, SegueConfig, SessionConfig,
};
use crate::error::ConfigError;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<SegueConfig, ConfigError> {
        let mut raw = RawSegueConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        Ok(Self::finalize(raw))
    }

    /// Load a single config file, defaults filling the gaps
    pub fn load_from(path: &Path) -> Result<SegueConfig, ConfigError> {
        Ok(Self::finalize(Self::read_raw(path)?))
    }

    /// Parse config text, defaults filling the gaps
    pub fn parse(contents: &str) -> Result<SegueConfig, ConfigError> {
        let raw: RawSegueConfig = toml::from_str(contents)?;
        Ok(Self::finalize(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("segue").join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with SEGUE_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("SEGUE_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".segue/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawSegueConfig, ConfigError> {
        debug!(path = %path.display(), "Reading config layer");
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawSegueConfig, overlay: RawSegueConfig) -> RawSegueConfig {
        RawSegueConfig {
            session: RawSessionConfig {
                initial_difficulty: overlay
                    .session
                    .initial_difficulty
                    .or(base.session.initial_difficulty),
                topic_separator: overlay
                    .session
                    .topic_separator
                    .or(base.session.topic_separator),
            },
            events: RawEventsConfig {
                capacity: overlay.events.capacity.or(base.events.capacity),
            },
        }
    }

    fn finalize(raw: RawSegueConfig) -> SegueConfig {
        let session_defaults = SessionConfig::default();
        let events_defaults = EventsConfig::default();
        SegueConfig {
            session: SessionConfig {
                initial_difficulty: raw
                    .session
                    .initial_difficulty
                    .unwrap_or(session_defaults.initial_difficulty),
                topic_separator: raw
                    .session
                    .topic_separator
                    .unwrap_or(session_defaults.topic_separator),
            },
            events: EventsConfig {
                capacity: raw.events.capacity.unwrap_or(events_defaults.capacity),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EVENT_CAPACITY;
    use crate::context::Difficulty;
    use tempfile::TempDir;

    #[test]
    fn test_merge_overlay_wins_when_set() {
        let base: RawSegueConfig = toml::from_str(
            r#"
[session]
initial_difficulty = "easy"
topic_separator = " / "

[events]
capacity = 8
"#,
        )
        .unwrap();
        let overlay: RawSegueConfig = toml::from_str(
            r#"
[session]
initial_difficulty = "hard"
"#,
        )
        .unwrap();

        let merged = ConfigLoader::finalize(ConfigLoader::merge_raw(base, overlay));

        assert_eq!(merged.session.initial_difficulty, Difficulty::Hard);
        assert_eq!(merged.session.topic_separator, " / ");
        assert_eq!(merged.events.capacity, 8);
    }

    #[test]
    fn test_parse_applies_defaults() {
        let config = ConfigLoader::parse("[events]\ncapacity = 32\n").unwrap();

        assert_eq!(config.events.capacity, 32);
        assert_eq!(config.session.initial_difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_parse_rejects_unknown_difficulty() {
        let result = ConfigLoader::parse("[session]\ninitial_difficulty = \"extreme\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\ntopic_separator = \" | \"\n").unwrap();

        let config = ConfigLoader::load_from(&path).unwrap();

        assert_eq!(config.session.topic_separator, " | ");
        assert_eq!(config.events.capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn test_load_from_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = ConfigLoader::load_from(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}

//! Configuration for the friendship engine
//!
//! Loaded from TOML:
//!
//! ```toml
//! [store]
//! path = "rapport.db"
//! busy_timeout_ms = 5000
//!
//! [engine]
//! policy = "lenient"   # or "strict"
//!
//! [logging]
//! filter = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A field has an unusable value
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

/// How invalid transitions are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Invalid transitions are no-ops reported as `Outcome::Skipped`
    #[default]
    Lenient,

    /// Invalid transitions return `EngineError::{AlreadyExists, NotFound, Forbidden}`
    Strict,
}

/// Store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// SQLite database path; `:memory:` for a private in-memory database
    #[serde(default = "default_path")]
    pub path: String,

    /// How long a writer waits on a locked database before failing
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Engine behaviour settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Reporting of invalid transitions
    #[serde(default)]
    pub policy: TransitionPolicy,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Store settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Engine settings
    #[serde(default)]
    pub engine: EngineSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

fn default_path() -> String {
    ":memory:".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: default_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl StoreSettings {
    /// Busy timeout as Duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "store.path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "logging.filter".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Lenient policy, in-memory store
    pub fn lenient() -> Self {
        Self::default()
    }

    /// Strict policy, in-memory store
    pub fn strict() -> Self {
        Self {
            engine: EngineSettings {
                policy: TransitionPolicy::Strict,
            },
            ..Self::default()
        }
    }

    /// Same settings against the database at `path`
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.store.path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.store.path, ":memory:");
        assert_eq!(config.store.busy_timeout(), Duration::from_secs(5));
        assert_eq!(config.engine.policy, TransitionPolicy::Lenient);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_presets() {
        assert_eq!(EngineConfig::lenient().engine.policy, TransitionPolicy::Lenient);
        assert_eq!(EngineConfig::strict().engine.policy, TransitionPolicy::Strict);
        assert_eq!(
            EngineConfig::strict().with_path("friends.db").store.path,
            "friends.db"
        );
    }

    #[test]
    fn test_parse_full_toml() {
        let config = EngineConfig::from_toml(
            r#"
            [store]
            path = "rapport.db"
            busy_timeout_ms = 250

            [engine]
            policy = "strict"

            [logging]
            filter = "rapport_engine=debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.path, "rapport.db");
        assert_eq!(config.store.busy_timeout_ms, 250);
        assert_eq!(config.engine.policy, TransitionPolicy::Strict);
        assert_eq!(config.logging.filter, "rapport_engine=debug");
    }

    #[test]
    fn test_parse_empty_toml_uses_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config.store.path, ":memory:");
        assert_eq!(config.engine.policy, TransitionPolicy::Lenient);
    }

    #[test]
    fn test_rejects_unknown_policy() {
        let result = EngineConfig::from_toml("[engine]\npolicy = \"paranoid\"\n");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_rejects_empty_path() {
        let result = EngineConfig::from_toml("[store]\npath = \"  \"\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rapport.toml");
        std::fs::write(&path, "[engine]\npolicy = \"strict\"\n").unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.engine.policy, TransitionPolicy::Strict);

        let missing = EngineConfig::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::FileRead(_))));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = EngineConfig::strict();
        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: EngineConfig = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.engine.policy, TransitionPolicy::Strict);
        assert_eq!(deserialized.store.path, config.store.path);
    }
}

//! Application settings and connection profiles

use crate::core::adapter::ReaderConfig;
use crate::core::console::ConsoleConfig;
use crate::core::logger::LogFormat;
use crate::core::transport::WebSocketConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Platform gave us no config directory
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// Reading or writing the file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be rendered
    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Named profile does not exist
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default connection
    pub connection: WebSocketConfig,
    /// Read timing
    pub reader: ReaderConfig,
    /// Console behaviour
    pub console: ConsoleConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Saved connection profiles
    pub profiles: Vec<ConnectionProfile>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            connection: WebSocketConfig::default(),
            reader: ReaderConfig::default(),
            console: ConsoleConfig::default(),
            logging: LoggingConfig::default(),
            profiles: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Default config file location
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        super::config_dir()
            .map(|dir| dir.join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load config from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Look up a saved profile by name
    pub fn profile(&self, name: &str) -> Result<&ConnectionProfile, ConfigError> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (e.g. "info", "wsterm_core=debug")
    pub level: String,
    /// Emit diagnostics as JSON
    pub json: bool,
    /// Write diagnostics to this file instead of stderr
    pub file: Option<PathBuf>,
    /// Session capture format
    pub capture_format: LogFormat,
    /// Timestamp capture entries
    pub capture_timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
            file: None,
            capture_format: LogFormat::Text,
            capture_timestamps: true,
        }
    }
}

/// Connection profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Profile name
    pub name: String,
    /// Profile description
    pub description: Option<String>,
    /// Connection settings
    pub connection: WebSocketConfig,
    /// Console settings override
    pub console: Option<ConsoleConfig>,
}

impl ConnectionProfile {
    /// Create a new WebSocket profile
    pub fn websocket(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            connection: WebSocketConfig::new(host),
            console: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.connection = WebSocketConfig::new("10.0.0.7").port(8080);
        config.reader.prompt_marker = '#';
        config.profiles.push(ConnectionProfile::websocket("bench", "192.168.0.57"));
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.profile("bench").unwrap().connection.host, "192.168.0.57");
        assert!(matches!(loaded.profile("nope"), Err(ConfigError::UnknownProfile(_))));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [connection]
            host = "pirate.local"

            [reader]
            poll_interval_ms = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.connection.host, "pirate.local");
        assert_eq!(config.connection.path, "/ws");
        assert_eq!(config.reader.poll_interval_ms, 20);
        assert_eq!(config.reader.probe_interval_ms, 50);
        assert_eq!(config.console, ConsoleConfig::default());
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "connection = 5").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(ConfigError::Parse(_))));
    }
}

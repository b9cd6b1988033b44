//! Runtime configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::store::DEFAULT_EVENT_CAPACITY;
use crate::{SyncConfig, WordList};

/// Settings shared by the library and the operator binary.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ShwordleConfig {
    /// SQLite file holding sessions and moves.
    #[serde(default = "default_database_path")]
    database_path: String,

    /// Newline-separated word list; the embedded list when absent.
    #[serde(default)]
    word_list: Option<PathBuf>,

    /// Poll period in milliseconds for cross-process sync; 0 disables it.
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,

    /// Capacity of the store change-event channel.
    #[serde(default = "default_event_capacity")]
    event_capacity: usize,
}

fn default_database_path() -> String {
    "shwordle.db".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for ShwordleConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            word_list: None,
            poll_interval_ms: default_poll_interval_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl ShwordleConfig {
    /// Loads configuration from a TOML file. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed TOML or unknown value types.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        info!(database_path = %config.database_path, "Config loaded successfully");
        Ok(config)
    }

    /// Overrides the database path.
    pub fn with_database_path(mut self, path: impl Into<String>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Sync policy implied by `poll_interval_ms`.
    pub fn sync(&self) -> SyncConfig {
        match self.poll_interval_ms {
            0 => SyncConfig::events_only(),
            ms => SyncConfig::polling(Duration::from_millis(ms)),
        }
    }

    /// Loads the configured word list, or the embedded one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a configured list cannot be loaded.
    #[instrument(skip(self))]
    pub fn dictionary(&self) -> Result<WordList, ConfigError> {
        match &self.word_list {
            Some(path) => WordList::from_file(path),
            None => Ok(WordList::embedded()),
        }
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use chrono::Duration;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Main configuration struct matching the guestbook.yml schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestbookConfig {
    #[serde(default = "default_listen_addr", alias = "listenAddr")]
    pub listen_addr: String,

    #[serde(default = "default_data_dir", alias = "dataDir")]
    pub data_dir: PathBuf,

    /// Entries per page
    #[serde(default = "default_page_size", alias = "pageSize")]
    pub page_size: u64,

    /// Minimum gap between accepted posts from the same (user agent, IP)
    #[serde(default = "default_cooldown_minutes", alias = "cooldownMinutes")]
    pub cooldown_minutes: u64,

    /// Messages with this many characters or more are rejected
    #[serde(default = "default_max_message_length", alias = "maxMessageLength")]
    pub max_message_length: usize,

    #[serde(default)]
    pub moderation: ModerationConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_listen_addr() -> String {
    String::from("0.0.0.0:8181")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_page_size() -> u64 {
    10
}

fn default_cooldown_minutes() -> u64 {
    60
}

fn default_max_message_length() -> usize {
    500
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Words flagged in addition to the built-in list
    #[serde(default, alias = "extraWords")]
    pub extra_words: Vec<String>,

    /// Words that contain a profane substring but must never be flagged
    #[serde(default, alias = "allowedWords")]
    pub allowed_words: Vec<String>,
}

impl Default for GuestbookConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            data_dir: default_data_dir(),
            page_size: default_page_size(),
            cooldown_minutes: default_cooldown_minutes(),
            max_message_length: default_max_message_length(),
            moderation: ModerationConfig::default(),
            config_path: None,
        }
    }
}

impl GuestbookConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: GuestbookConfig = serde_yaml::from_str(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "page_size",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_message_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_message_length",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Get the data directory, resolved relative to config file
    pub fn data_dir(&self) -> PathBuf {
        self.resolve_path(&self.data_dir)
    }

    /// Cooldown window; absurdly large values saturate instead of wrapping.
    pub fn cooldown(&self) -> Duration {
        i64::try_from(self.cooldown_minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .unwrap_or(Duration::MAX)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            if let Some(parent) = config_path.parent() {
                parent.join(path)
            } else {
                path.to_path_buf()
            }
        } else {
            path.to_path_buf()
        }
    }
}

//! Application config file (`config.toml`).
//!
//! Only process-level options live here. Timer settings are kept in the
//! store under `settings` and edited with `focusflow settings`.

use crate::persistence;
use crate::view;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Lower bound for the view polling interval.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    ReadError { path: PathBuf, message: String },
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            poll_interval_ms: default_poll_interval_ms(),
            log_filter: default_log_filter(),
        }
    }
}

fn default_database_path() -> PathBuf {
    persistence::default_db_path()
}

fn default_poll_interval_ms() -> u64 {
    view::DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Config {
    /// Loads `path`, or the default config file location when `None`.
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) => Self::load_from(&path),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// `<config dir>/focusflow/config.toml` on this platform.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "focusflow", "FocusFlow")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Polling interval for views, never below [`MIN_POLL_INTERVAL_MS`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

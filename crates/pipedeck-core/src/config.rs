//! Application configuration management.
//!
//! This module handles loading and saving the console configuration: the API
//! base URL, request deadline, server revision, response envelope and the
//! durable storage backend.
//!
//! Configuration is stored at `~/.config/pipedeck/config.json`. Environment
//! variables (`PIPEDECK_*`) override file values; see [`Config::apply_env`].

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Application name used for config/data directory paths
const APP_NAME: &str = "pipedeck";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default API base URL; endpoint paths carry their own `/v1` prefix.
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// Per-request deadline in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find {0} directory")]
    NoDirectory(&'static str),

    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Server API generation. Selects the auth paths and the default envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiRevision {
    /// `/auth/*` endpoints, payload is the response body
    Classic,
    /// `/v1/user/*` endpoints, payload is wrapped in `{code, data, msg}`
    #[default]
    Versioned,
}

impl ApiRevision {
    pub fn default_envelope(self) -> Envelope {
        match self {
            ApiRevision::Classic => Envelope::Bare,
            ApiRevision::Versioned => Envelope::Wrapped,
        }
    }
}

impl FromStr for ApiRevision {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(ApiRevision::Classic),
            "versioned" => Ok(ApiRevision::Versioned),
            _ => Err(ConfigError::InvalidValue {
                key: "revision",
                value: s.to_string(),
            }),
        }
    }
}

/// How deep the payload sits inside a successful response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    /// The body is the payload
    Bare,
    /// The body is `{code, data, msg}` and the payload is `data`
    Wrapped,
}

impl FromStr for Envelope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bare" => Ok(Envelope::Bare),
            "wrapped" => Ok(Envelope::Wrapped),
            _ => Err(ConfigError::InvalidValue {
                key: "envelope",
                value: s.to_string(),
            }),
        }
    }
}

/// Where the credential and profile are persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "keyring" => Ok(StorageBackend::Keyring),
            _ => Err(ConfigError::InvalidValue {
                key: "storage",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub revision: ApiRevision,
    pub envelope: Option<Envelope>,
    pub storage: StorageBackend,
    pub data_dir: Option<PathBuf>,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            revision: ApiRevision::default(),
            envelope: None,
            storage: StorageBackend::default(),
            data_dir: None,
            last_username: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoDirectory("config"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the durable session file.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDirectory("data"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// The envelope in effect: the explicit override, else the revision's default.
    pub fn effective_envelope(&self) -> Envelope {
        self.envelope
            .unwrap_or_else(|| self.revision.default_envelope())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Apply `PIPEDECK_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PIPEDECK_API_URL") {
            self.api_base_url = url;
        }
        if let Some(secs) = lookup("PIPEDECK_TIMEOUT_SECS") {
            self.request_timeout_secs = secs.trim().parse().map_err(|_| {
                ConfigError::InvalidValue {
                    key: "PIPEDECK_TIMEOUT_SECS",
                    value: secs.clone(),
                }
            })?;
        }
        if let Some(revision) = lookup("PIPEDECK_REVISION") {
            self.revision = revision.parse()?;
        }
        if let Some(envelope) = lookup("PIPEDECK_ENVELOPE") {
            self.envelope = Some(envelope.parse()?);
        }
        if let Some(storage) = lookup("PIPEDECK_STORAGE") {
            self.storage = storage.parse()?;
        }
        if let Some(dir) = lookup("PIPEDECK_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if self.request_timeout_secs == 0 {
            warn!("Request timeout of 0s is not allowed, using default");
            self.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }
        Ok(())
    }
}

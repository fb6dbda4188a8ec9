//! Configuration management for fieldsync.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "fieldsync";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "fieldsync.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "FIELDSYNC_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FIELDSYNC_`, sections split on `__`)
/// 2. TOML config file at `~/.config/fieldsync/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local storage configuration.
    pub storage: StorageConfig,
    /// Remote document store configuration.
    pub remote: RemoteConfig,
    /// Change notification configuration.
    pub events: EventsConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/fieldsync/fieldsync.db`
    pub database_path: Option<PathBuf>,
}

/// How documents are created on the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushMode {
    /// `POST {collection}`; the remote assigns its own key. A retried push
    /// whose earlier success was never acknowledged creates a duplicate.
    #[default]
    Create,
    /// `PUT {collection}/{id}` using the local id as the remote key, so
    /// repeated submissions collapse to one remote record.
    Idempotent,
}

/// Remote document store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the document store.
    pub base_url: String,
    /// Basic-Auth user name. No credentials are sent when unset.
    pub username: Option<String>,
    /// Basic-Auth password.
    pub password: Option<String>,
    /// Upper bound on the connectivity probe, in seconds.
    pub probe_timeout_secs: u64,
    /// Upper bound on a single document push, in seconds.
    pub request_timeout_secs: u64,
    /// Remote collection receiving distribution documents.
    pub distributions_db: String,
    /// Remote collection receiving GPS photo documents.
    pub gps_photos_db: String,
    /// Document creation strategy.
    pub push_mode: PushMode,
}

/// Change notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Number of events buffered per subscriber before the oldest are dropped.
    pub channel_capacity: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5984".to_string(),
            username: None,
            password: None,
            probe_timeout_secs: 10,
            request_timeout_secs: 30,
            distributions_db: "omvs_distributions".to_string(),
            gps_photos_db: "omvs_gps_photos".to_string(),
            push_mode: PushMode::Create,
        }
    }
}

impl RemoteConfig {
    /// Upper bound on the connectivity probe.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Upper bound on a single document push.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.remote.base_url).map_err(|e| {
            Error::ConfigValidation {
                message: format!("invalid base_url '{}': {e}", self.remote.base_url),
            }
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::ConfigValidation {
                message: format!("base_url must use http or https, got '{}'", url.scheme()),
            });
        }

        if self.remote.probe_timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "probe_timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.remote.request_timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "request_timeout_secs must be greater than 0".to_string(),
            });
        }

        for (name, value) in [
            ("distributions_db", &self.remote.distributions_db),
            ("gps_photos_db", &self.remote.gps_photos_db),
        ] {
            if value.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must not be empty"),
                });
            }
        }

        if self.events.channel_capacity == 0 {
            return Err(Error::ConfigValidation {
                message: "channel_capacity must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the probe timeout as a Duration.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        self.remote.probe_timeout()
    }
}

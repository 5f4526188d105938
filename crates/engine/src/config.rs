//! Engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `SHOPSTATE_STORAGE_DIR` - Root directory for file storage (default: `.shopstate`)
//! - `SHOPSTATE_ORIGIN` - Origin name, a subdirectory of the storage dir (default: `default`)
//! - `SHOPSTATE_KEY_PREFIX` - Prefix for collection storage keys (default: `shopstate`)
//! - `SHOPSTATE_EVENT_CAPACITY` - Change fan-out buffer size (default: 64)
//! - `SHOPSTATE_POLL_INTERVAL_MS` - Poll interval for foreign changes (default: 500)

use std::path::PathBuf;
use std::time::Duration;

use shopstate_core::CollectionKind;
use thiserror::Error;

use crate::storage::{StorageError, StorageKey, is_valid_segment};

const DEFAULT_STORAGE_DIR: &str = ".shopstate";
const DEFAULT_ORIGIN: &str = "default";
const DEFAULT_KEY_PREFIX: &str = "shopstate";
const DEFAULT_EVENT_CAPACITY: usize = 64;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Root directory holding one subdirectory per origin
    pub storage_dir: PathBuf,
    /// Origin this context belongs to
    pub origin: String,
    /// Prefix for the cart and favorites storage keys
    pub key_prefix: String,
    /// Buffer size of storage fan-out and change broadcast channels
    pub event_capacity: usize,
    /// How often to poll storage for changes made by other processes
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            origin: DEFAULT_ORIGIN.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let storage_dir = PathBuf::from(get("SHOPSTATE_STORAGE_DIR", DEFAULT_STORAGE_DIR));

        let origin = get("SHOPSTATE_ORIGIN", DEFAULT_ORIGIN);
        validate_segment("SHOPSTATE_ORIGIN", &origin)?;

        let key_prefix = get("SHOPSTATE_KEY_PREFIX", DEFAULT_KEY_PREFIX);
        validate_segment("SHOPSTATE_KEY_PREFIX", &key_prefix)?;

        let event_capacity = get(
            "SHOPSTATE_EVENT_CAPACITY",
            &DEFAULT_EVENT_CAPACITY.to_string(),
        )
        .parse::<usize>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("SHOPSTATE_EVENT_CAPACITY".to_string(), e.to_string())
        })?;
        if event_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPSTATE_EVENT_CAPACITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let poll_interval_ms = get(
            "SHOPSTATE_POLL_INTERVAL_MS",
            &DEFAULT_POLL_INTERVAL_MS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("SHOPSTATE_POLL_INTERVAL_MS".to_string(), e.to_string())
        })?;
        if poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPSTATE_POLL_INTERVAL_MS".to_string(),
                format!("must be at least {MIN_POLL_INTERVAL_MS}"),
            ));
        }

        Ok(Self {
            storage_dir,
            origin,
            key_prefix,
            event_capacity,
            poll_interval: Duration::from_millis(poll_interval_ms),
        })
    }

    /// Directory of this configuration's origin.
    ///
    /// The origin is checked here as well as in [`Self::from_lookup`], since
    /// callers may set `origin` directly.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidOrigin`] unless `origin` is a single
    /// path segment inside `storage_dir`.
    pub fn origin_dir(&self) -> Result<PathBuf, StorageError> {
        if !is_valid_segment(&self.origin) {
            return Err(StorageError::InvalidOrigin(self.origin.clone()));
        }
        Ok(self.storage_dir.join(&self.origin))
    }

    /// Storage key of one collection kind.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if `key_prefix` was changed to an
    /// invalid value after loading.
    pub fn storage_key(&self, kind: CollectionKind) -> Result<StorageKey, StorageError> {
        StorageKey::for_kind(&self.key_prefix, kind)
    }
}

fn validate_segment(name: &str, value: &str) -> Result<(), ConfigError> {
    if is_valid_segment(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            name.to_string(),
            "use ASCII letters, digits, '.', '-' or '_'".to_string(),
        ))
    }
}

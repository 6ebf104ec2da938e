//! # Client Configuration
//!
//! Configuration is loaded from environment variables (or a JSON document)
//! and validated up front so a misconfigured client fails before it talks to
//! the backend.
//!
//! | variable | default |
//! |---|---|
//! | `IDENTITY_API_URL` | `http://127.0.0.1:3001/api` |
//! | `IDENTITY_REQUEST_TIMEOUT_SECS` | `10` |
//! | `IDENTITY_HEARTBEAT_SECS` | `30` |
//! | `IDENTITY_DETECT_INTERVAL_MS` | `500` |
//! | `IDENTITY_DETECT_ATTEMPTS` | `12` |
//! | `IDENTITY_STORAGE_DIR` | `data` |

use std::path::PathBuf;
use std::time::Duration;

use lib_utils::envs::{get_env_or, get_env_parse_or};
use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3001/api";

/// Identity client configuration.
///
/// JSON documents may only contain the fields below; unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the identity service, without trailing slash.
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub detect_interval_ms: u64,
    pub detect_attempts: u32,
    /// Where the file-backed cookie / local-storage slots live.
    pub storage_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 10,
            heartbeat_interval_secs: 30,
            detect_interval_ms: 500,
            detect_attempts: 12,
            storage_dir: PathBuf::from("data"),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            api_base_url: get_env_or("IDENTITY_API_URL", &defaults.api_base_url)
                .trim_end_matches('/')
                .to_string(),
            request_timeout_secs: get_env_parse_or("IDENTITY_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
            heartbeat_interval_secs: get_env_parse_or("IDENTITY_HEARTBEAT_SECS", defaults.heartbeat_interval_secs)?,
            detect_interval_ms: get_env_parse_or("IDENTITY_DETECT_INTERVAL_MS", defaults.detect_interval_ms)?,
            detect_attempts: get_env_parse_or("IDENTITY_DETECT_ATTEMPTS", defaults.detect_attempts)?,
            storage_dir: PathBuf::from(get_env_or(
                "IDENTITY_STORAGE_DIR",
                &defaults.storage_dir.to_string_lossy(),
            )),
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration document; missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(
                "api_base_url must start with http:// or https://".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > 120 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be between 1 and 120".to_string(),
            ));
        }

        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Invalid("heartbeat_interval_secs must be positive".to_string()));
        }

        if self.detect_interval_ms == 0 || self.detect_attempts == 0 {
            return Err(ConfigError::Invalid(
                "provider detection needs a positive interval and attempt count".to_string(),
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn detect_interval(&self) -> Duration {
        Duration::from_millis(self.detect_interval_ms)
    }
}

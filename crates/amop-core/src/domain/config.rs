//! AMOP configuration with validation.
//!
//! ```toml
//! default_timeout_ms = 5000
//! verify_timeout_ms = 5000
//! announce_topics_on_subscribe = true
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: String, value: String },

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),
}

/// Runtime settings for the AMOP facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmopConfig {
    /// Timeout applied when a publish does not give one.
    pub default_timeout_ms: u64,
    /// How long a verification challenge waits for its signature.
    pub verify_timeout_ms: u64,
    /// Re-announce local topics to all peers when subscriptions change.
    pub announce_topics_on_subscribe: bool,
}

impl Default for AmopConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 5_000,
            verify_timeout_ms: 5_000,
            announce_topics_on_subscribe: true,
        }
    }
}

impl AmopConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `AMOP_DEFAULT_TIMEOUT_MS` and
    /// `AMOP_VERIFY_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(ms) = parse_ms(&lookup, "AMOP_DEFAULT_TIMEOUT_MS")? {
            config.default_timeout_ms = ms;
        }
        if let Some(ms) = parse_ms(&lookup, "AMOP_VERIFY_TIMEOUT_MS")? {
            config.verify_timeout_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "default_timeout_ms cannot be 0".into(),
            ));
        }
        if self.verify_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "verify_timeout_ms cannot be 0".into(),
            ));
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }
}

fn parse_ms<F>(lookup: &F, var: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value,
            })
        })
        .transpose()
}

//! Configuration types for the presence client.

use crate::errors::PresenceClientError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Presence client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application id registered with the presence service.
    pub application_id: u64,
    /// Explicit service socket path. When unset, the standard socket
    /// locations are probed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
    /// Handshake timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            application_id: 0,
            socket_path: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse as
    /// TOML, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PresenceClientError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| PresenceClientError::Config(format!("cannot read config file: {}", e)))?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| PresenceClientError::Config(format!("invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), PresenceClientError> {
        if self.application_id == 0 {
            return Err(PresenceClientError::Config(
                "Application id cannot be 0".to_string(),
            ));
        }

        if self.timeout_ms == 0 {
            return Err(PresenceClientError::Config(
                "Timeout cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the handshake timeout duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Builder for creating a `Config`.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the application id.
    #[must_use]
    pub fn application_id(mut self, id: u64) -> Self {
        self.config.application_id = id;
        self
    }

    /// Sets an explicit service socket path, bypassing discovery.
    #[must_use]
    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.socket_path = Some(path.into());
        self
    }

    /// Sets the handshake timeout in milliseconds.
    #[must_use]
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Config, PresenceClientError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

//! Application configuration structures.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::probe::http::FetchConfig;
use crate::probe::ping::PingConfig;

use super::validation::{ConfigError, require_non_zero};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "websites.yaml";

// =============================================================================
// Website
// =============================================================================

/// One configured host.
///
/// The URL is passed to the probes as written; duplicates are allowed and
/// simply produce duplicate outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Website {
    /// Display name.
    pub name: String,
    /// Target URL (e.g. `https://www.example.com`).
    pub url: String,
}

impl Website {
    /// Create a new website entry.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hosts to ping and fetch, in display order.
    pub websites: Vec<Website>,

    /// ICMP probe settings.
    #[serde(default)]
    pub ping: PingConfig,

    /// HTTP fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl AppConfig {
    /// Build a configuration for the given hosts with default probe settings.
    pub fn new(websites: Vec<Website>) -> Self {
        Self {
            websites,
            ping: PingConfig::default(),
            fetch: FetchConfig::default(),
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.websites.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one website must be configured".to_string(),
            ));
        }

        for (index, website) in self.websites.iter().enumerate() {
            if website.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "website #{} name cannot be empty",
                    index + 1
                )));
            }
            if website.url.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "website '{}' url cannot be empty",
                    website.name
                )));
            }
        }

        // Validate ping settings
        if self.ping.count == 0 {
            return Err(ConfigError::ValidationError(
                "ping.count must be at least 1".to_string(),
            ));
        }
        require_non_zero("ping.timeout", self.ping.timeout)?;

        // Validate fetch settings
        require_non_zero("fetch.timeout", self.fetch.timeout)?;

        Ok(())
    }

    /// URLs of all configured websites, in configuration order.
    pub fn urls(&self) -> Vec<String> {
        self.websites.iter().map(|w| w.url.clone()).collect()
    }
}

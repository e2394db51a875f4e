//! Controller configuration.
//!
//! Supports both programmatic and file-based configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("XML url content is expected <= {maximum}, got {length}")]
    XmlTooLong { length: usize, maximum: usize },
}

const DEFAULT_RETRY_DELAY_MS: u64 = 10_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Name of the target forwarder to command.
    pub target_routing_service: String,

    /// Delay between send attempts for an outstanding command.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-send wait bound for an admin reply.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Forwarder group this controller belongs to; enables the
    /// `forwarder-group` filter.
    #[serde(default)]
    pub group_name: Option<String>,

    /// Ordered discovery filter registrations.
    #[serde(default)]
    pub filters: Vec<FilterKind>,
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl ControllerConfig {
    pub fn new(target_routing_service: &str) -> Self {
        Self {
            target_routing_service: target_routing_service.to_string(),
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            group_name: None,
            filters: Vec::new(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_routing_service.is_empty() {
            return Err(ConfigError::Invalid(
                "target_routing_service must not be empty".to_string(),
            ));
        }

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms is expected > 0".to_string(),
            ));
        }

        if self.filters.contains(&FilterKind::ForwarderGroup) && self.group_name.is_none() {
            return Err(ConfigError::Invalid(
                "filter 'forwarder-group' requires group_name".to_string(),
            ));
        }

        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Built-in discovery filters addressable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    VendorTopics,
    ForwarderEntities,
    ForwarderGroup,
    WildcardPartitions,
}

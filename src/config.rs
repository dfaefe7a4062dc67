//! Configuration management for Palisade.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{PalisadeError, Result};

/// Main configuration for the Palisade service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PalisadeConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitSettings,
}

impl Default for PalisadeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            rate_limiting: RateLimitSettings::default(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

/// Per-client admission limits.
///
/// All four values must be positive; construction-time validation is the
/// host's responsibility, via [`RateLimitSettings::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Burst cap: admitted requests allowed in any trailing minute
    #[serde(default = "default_requests_per_minute")]
    pub max_requests_per_minute: u32,

    /// Sustained cap: admitted requests allowed in any trailing hour
    #[serde(default = "default_requests_per_hour")]
    pub max_requests_per_hour: u32,

    /// Longest message accepted, in characters
    #[serde(default = "default_message_length")]
    pub max_message_length: usize,

    /// Minimum spacing between two admitted requests from one client
    #[serde(default = "default_cooldown_period_ms")]
    pub cooldown_period_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests_per_minute: default_requests_per_minute(),
            max_requests_per_hour: default_requests_per_hour(),
            max_message_length: default_message_length(),
            cooldown_period_ms: default_cooldown_period_ms(),
        }
    }
}

fn default_requests_per_minute() -> u32 {
    8
}

fn default_requests_per_hour() -> u32 {
    40
}

fn default_message_length() -> usize {
    1000
}

fn default_cooldown_period_ms() -> u64 {
    3000
}

impl RateLimitSettings {
    /// Reject zero limits before the engine is built. A zero anywhere
    /// would make every request unserviceable or the cooldown meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.max_requests_per_minute == 0 {
            return Err(PalisadeError::Config(
                "max_requests_per_minute must be positive".to_string(),
            ));
        }
        if self.max_requests_per_hour == 0 {
            return Err(PalisadeError::Config(
                "max_requests_per_hour must be positive".to_string(),
            ));
        }
        if self.max_message_length == 0 {
            return Err(PalisadeError::Config(
                "max_message_length must be positive".to_string(),
            ));
        }
        if self.cooldown_period_ms == 0 {
            return Err(PalisadeError::Config(
                "cooldown_period_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl PalisadeConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: PalisadeConfig = serde_yaml::from_str(&contents)
            .map_err(|e| PalisadeError::Config(e.to_string()))?;
        Ok(config)
    }
}

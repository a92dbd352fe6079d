//! Configuration management for Turnstile.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::ratelimit::RateLimitPolicy;

/// Main configuration for the Turnstile service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnstileConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Requests allowed per window per key; zero denies every request
    #[serde(default = "default_max_requests", alias = "max")]
    pub max_requests: u64,

    /// Body text returned on denial
    pub message: Option<String>,

    /// Refund requests that complete with a 2xx/3xx status
    #[serde(default)]
    pub skip_successful_requests: bool,

    /// Refund requests that complete with a 4xx/5xx status
    #[serde(default)]
    pub skip_failed_requests: bool,

    /// Interval between periodic sweeps of expired counters, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            max_requests: default_max_requests(),
            message: None,
            skip_successful_requests: false,
            skip_failed_requests: false,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_max_requests() -> u64 {
    100
}

fn default_sweep_interval() -> u64 {
    60
}

impl RateLimitingConfig {
    /// Build the policy this configuration describes.
    pub fn to_policy(&self) -> RateLimitPolicy {
        let mut policy = RateLimitPolicy::new(
            Duration::from_millis(self.window_ms),
            self.max_requests,
        );
        if let Some(ref message) = self.message {
            policy = policy.with_message(message.clone());
        }
        if self.skip_successful_requests {
            policy = policy.skip_successful_requests();
        }
        if self.skip_failed_requests {
            policy = policy.skip_failed_requests();
        }
        policy
    }
}

impl TurnstileConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TurnstileConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::TurnstileError::Config(e.to_string()))?;
        Ok(config)
    }
}

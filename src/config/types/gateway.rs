//! Gateway connection configuration types

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Where and how to reach the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// WebSocket URL of the OneBot implementation
    #[serde(default = "default_url")]
    pub url: String,
    /// Access token presented during the handshake
    #[serde(default = "empty_secret", skip_serializing)]
    pub access_token: SecretString,
    /// Limit for opening the transport and receiving the acknowledgement
    #[serde(default = "default_handshake_timeout", with = "humantime_serde")]
    pub handshake_timeout: Duration,
    /// A session with no inbound traffic for this long is considered dead (0 disables)
    #[serde(default = "default_idle_timeout", with = "humantime_serde")]
    pub idle_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            url: default_url(),
            access_token: empty_secret(),
            handshake_timeout: default_handshake_timeout(),
            idle_timeout: default_idle_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Idle limit, or `None` when liveness checking is disabled
    pub fn idle_limit(&self) -> Option<Duration> {
        (!self.idle_timeout.is_zero()).then_some(self.idle_timeout)
    }
}

fn default_url() -> String {
    "ws://127.0.0.1:3001".to_string()
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_handshake_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_idle_timeout() -> Duration {
    Duration::from_secs(60)
}

/// Reconnection policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Reconnect after a session ends
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// First backoff interval
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Backoff ceiling
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,
    /// Growth factor between consecutive waits
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Randomization factor in [0, 1]
    #[serde(default)]
    pub jitter: f64,
    /// Consecutive token rejections tolerated before giving up
    #[serde(default = "default_auth_retry_budget")]
    pub auth_retry_budget: u32,
    /// Consecutive failed attempts before giving up (unlimited when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            enabled: true,
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            multiplier: default_multiplier(),
            jitter: 0.0,
            auth_retry_budget: default_auth_retry_budget(),
            max_attempts: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_auth_retry_budget() -> u32 {
    3
}

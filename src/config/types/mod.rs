//! Configuration types module

pub mod gateway;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::EventType;
use crate::error::Error;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Event types forwarded to the sink
    #[serde(default = "default_subscriptions")]
    pub subscriptions: Vec<EventType>,

    /// Gateway connection
    #[serde(default)]
    pub gateway: gateway::GatewayConfig,

    /// Reconnection policy
    #[serde(default)]
    pub reconnect: gateway::ReconnectConfig,

    /// Logging
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            subscriptions: default_subscriptions(),
            gateway: gateway::GatewayConfig::default(),
            reconnect: gateway::ReconnectConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default file location and environment
    ///
    /// Layers, lowest precedence first:
    /// 1. Default values
    /// 2. Config file (if present)
    /// 3. Environment variable overrides
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config(None)
    }

    /// Subscribed event types without duplicates, in configured order
    pub fn subscribed_types(&self) -> Vec<EventType> {
        let mut seen = HashSet::new();
        self.subscriptions
            .iter()
            .filter(|event_type| seen.insert(*event_type))
            .cloned()
            .collect()
    }
}

fn default_subscriptions() -> Vec<EventType> {
    vec![EventType::GroupMessage]
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(Error::Config(format!(
                "Invalid log format: {}. Valid options: pretty, json",
                s
            ))),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

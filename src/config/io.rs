//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use secrecy::SecretString;

use super::types::Config;
use crate::core::EventType;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file (`path`, or the default location) if it exists, otherwise defaults
/// 2. Environment variable overrides (includes `.env`)
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => super::paths::config_path(),
    };

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else if path.is_some() {
        return Err(Error::Config(format!(
            "Config file {} does not exist",
            config_path.display()
        )));
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config)?;

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    // Detect format by extension
    let config: Config = if path.extension().is_some_and(|ext| ext == "json") {
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        // Try TOML first, then JSON5
        toml::from_str(&content)
            .or_else(|_| json5::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads `.env` first, then overlays any set variables. Env vars have the
/// highest precedence: defaults < file < env.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    dotenvy::dotenv().ok();
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary variable lookup
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    // Gateway overrides
    if let Some(url) = lookup("BOTPROXY_GATEWAY_URL") {
        config.gateway.url = url;
    }
    if let Some(token) = lookup("BOTPROXY_ACCESS_TOKEN") {
        config.gateway.access_token = SecretString::from(token);
    }
    if let Some(timeout) = lookup("BOTPROXY_HANDSHAKE_TIMEOUT") {
        config.gateway.handshake_timeout = parse_duration("BOTPROXY_HANDSHAKE_TIMEOUT", &timeout)?;
    }
    if let Some(timeout) = lookup("BOTPROXY_IDLE_TIMEOUT") {
        config.gateway.idle_timeout = parse_duration("BOTPROXY_IDLE_TIMEOUT", &timeout)?;
    }

    // Reconnect overrides
    if let Some(v) = lookup("BOTPROXY_RECONNECT") {
        config.reconnect.enabled = v != "false" && v != "0";
    }
    if let Some(budget) = lookup("BOTPROXY_AUTH_RETRY_BUDGET") {
        config.reconnect.auth_retry_budget = budget.trim().parse().map_err(|_| {
            Error::Config(format!("BOTPROXY_AUTH_RETRY_BUDGET must be a number, got '{}'", budget))
        })?;
    }
    if let Some(attempts) = lookup("BOTPROXY_MAX_ATTEMPTS") {
        config.reconnect.max_attempts = Some(attempts.trim().parse().map_err(|_| {
            Error::Config(format!("BOTPROXY_MAX_ATTEMPTS must be a number, got '{}'", attempts))
        })?);
    }

    // Subscription overrides
    if let Some(list) = lookup("BOTPROXY_SUBSCRIPTIONS") {
        config.subscriptions = list
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<EventType>)
            .collect::<Result<_>>()?;
    }

    // Log overrides
    if let Some(level) = lookup("RUST_LOG") {
        config.log.level = level;
    }
    if let Some(format) = lookup("BOTPROXY_LOG_FORMAT") {
        config.log.format = format.parse()?;
    }

    Ok(())
}

fn parse_duration(key: &str, value: &str) -> Result<std::time::Duration> {
    humantime_serde::re::humantime::parse_duration(value.trim())
        .map_err(|e| Error::Config(format!("{} is not a duration ('{}'): {}", key, value, e)))
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        toml::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.gateway.url = "ws://10.1.1.1:6700".to_string();
        config.gateway.access_token = SecretString::from("never-written");
        config.reconnect.max_attempts = Some(4);
        save_config(&config, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("never-written"));

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.gateway.url, "ws://10.1.1.1:6700");
        assert_eq!(loaded.reconnect.max_attempts, Some(4));
        assert_eq!(loaded.gateway.handshake_timeout, Duration::from_secs(10));
        assert!(loaded.gateway.access_token.expose_secret().is_empty());
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        save_config(&Config::default(), &path).unwrap();
        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.subscriptions, Config::default().subscriptions);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BOTPROXY_GATEWAY_URL", "ws://gateway:3001"),
            ("BOTPROXY_ACCESS_TOKEN", "T1"),
            ("BOTPROXY_HANDSHAKE_TIMEOUT", "3s"),
            ("BOTPROXY_SUBSCRIPTIONS", "group_message, notice"),
            ("BOTPROXY_AUTH_RETRY_BUDGET", "1"),
            ("BOTPROXY_RECONNECT", "false"),
            ("BOTPROXY_LOG_FORMAT", "json"),
        ]);
        let mut config = Config::default();
        apply_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.gateway.url, "ws://gateway:3001");
        assert_eq!(config.gateway.access_token.expose_secret(), "T1");
        assert_eq!(config.gateway.handshake_timeout, Duration::from_secs(3));
        assert_eq!(config.subscriptions, vec![EventType::GroupMessage, EventType::Notice]);
        assert_eq!(config.reconnect.auth_retry_budget, 1);
        assert!(!config.reconnect.enabled);
        assert_eq!(config.log.format, super::super::types::LogFormat::Json);
    }

    #[test]
    fn test_bad_override_values() {
        let mut config = Config::default();
        let result = apply_overrides(&mut config, |key| {
            (key == "BOTPROXY_HANDSHAKE_TIMEOUT").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }
}

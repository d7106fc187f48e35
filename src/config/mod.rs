//! Configuration module - Modular configuration management
//!
//! - types/mod.rs: Core configuration types (Config, LogConfig)
//! - types/gateway.rs: Gateway connection and reconnection policy
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

// Re-export core config types
pub use types::{Config, LogConfig, LogFormat};

// Re-export gateway types
pub use types::gateway::{GatewayConfig, ReconnectConfig};

// Re-export IO and utilities
pub use io::{apply_env_overrides, apply_overrides, load_config, load_config_from_path, save_config};
pub use paths::{config_dir, config_path};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};

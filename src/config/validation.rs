//! Configuration validation
//!
//! Validates configuration and reports issues.

use secrecy::ExposeSecret;

use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_gateway_config(config, result);
    result = validate_reconnect_config(config, result);
    result = validate_subscriptions(config, result);

    result
}

fn validate_gateway_config(
    config: &Config,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    match url::Url::parse(&config.gateway.url) {
        Ok(url) if matches!(url.scheme(), "ws" | "wss") => {}
        Ok(url) => {
            result = result.with_error(
                ValidationIssue::new(
                    "gateway.url",
                    format!("Unsupported scheme '{}'", url.scheme()),
                )
                .with_suggestion("Use a ws:// or wss:// URL"),
            );
        }
        Err(e) => {
            result = result.with_error(
                ValidationIssue::new("gateway.url", format!("Invalid URL: {}", e))
                    .with_suggestion("Set BOTPROXY_GATEWAY_URL, e.g. ws://127.0.0.1:3001"),
            );
        }
    }

    if config.gateway.access_token.expose_secret().is_empty() {
        result = result.with_warning(
            ValidationIssue::new(
                "gateway.access_token",
                "No access token configured. Gateways that require one will reject the handshake.",
            )
            .with_suggestion("Set BOTPROXY_ACCESS_TOKEN environment variable"),
        );
    }

    if config.gateway.handshake_timeout.is_zero() {
        result = result.with_error(ValidationIssue::new(
            "gateway.handshake_timeout",
            "Handshake timeout must be greater than zero",
        ));
    }

    result
}

fn validate_reconnect_config(
    config: &Config,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    let reconnect = &config.reconnect;

    if reconnect.max_delay < reconnect.initial_delay {
        result = result.with_error(ValidationIssue::new(
            "reconnect.max_delay",
            "max_delay is shorter than initial_delay",
        ));
    }

    if reconnect.multiplier < 1.0 {
        result = result.with_error(
            ValidationIssue::new("reconnect.multiplier", "Multiplier must be at least 1.0")
                .with_suggestion("Backoff waits must not shrink between attempts"),
        );
    }

    if !(0.0..=1.0).contains(&reconnect.jitter) {
        result = result.with_error(ValidationIssue::new(
            "reconnect.jitter",
            "Jitter must be within [0, 1]",
        ));
    }

    if reconnect.auth_retry_budget == 0 {
        result = result.with_error(
            ValidationIssue::new(
                "reconnect.auth_retry_budget",
                "Auth retry budget must be at least 1",
            )
            .with_suggestion("A single rejected handshake would otherwise be fatal"),
        );
    }

    if reconnect.max_attempts == Some(0) {
        result = result.with_error(ValidationIssue::new(
            "reconnect.max_attempts",
            "max_attempts must be at least 1 when set",
        ));
    }

    result
}

fn validate_subscriptions(
    config: &Config,
    mut result: ConfigValidationResult,
) -> ConfigValidationResult {
    if config.subscriptions.is_empty() {
        result = result.with_warning(
            ValidationIssue::new(
                "subscriptions",
                "No event types subscribed. Events will be received and dropped.",
            )
            .with_suggestion("Add \"group_message\" to subscriptions"),
        );
    }

    result
}

//! Error types for BotProxy

use thiserror::Error;

/// Result type alias using BotProxy's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for BotProxy
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Gateway connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Gateway wire protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Downstream handler error
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// The reconnection policy gave up
    #[error("Reconnection attempts exhausted after {attempts} tries: {last}")]
    RetriesExhausted {
        /// Number of consecutive failed attempts
        attempts: u32,
        /// Description of the last failure
        last: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Connection(e) => e.is_transient(),
            Error::Protocol(_) | Error::Io(_) => true,
            _ => false,
        }
    }

    /// Check if error means the gateway refused our credential
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Error::Connection(ConnectionError::AuthRejected(_)))
    }
}

/// Failure to establish or keep a gateway session.
///
/// The context strings never contain the access token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The transport could not be opened or was lost
    #[error("Gateway unreachable: {0}")]
    Unreachable(String),

    /// The gateway refused the access token
    #[error("Gateway rejected authentication: {0}")]
    AuthRejected(String),

    /// No acknowledgement or traffic within the configured interval
    #[error("Gateway timed out: {0}")]
    Timeout(String),
}

impl ConnectionError {
    /// Transient failures are retried without touching the auth budget
    pub fn is_transient(&self) -> bool {
        !matches!(self, ConnectionError::AuthRejected(_))
    }
}

/// A frame that could not be turned into an event
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is not valid JSON or lacks required fields
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),
}

/// Failure raised by a downstream consumer while handling an event
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Wrapped downstream failure
    #[error("Handler failed: {0}")]
    Downstream(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Wrap any downstream error
    pub fn downstream(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        HandlerError::Downstream(err.into())
    }
}

//! Connection lifecycle states

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where the supervisor is in the connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No resources held
    Idle,
    /// Connector invoked, waiting for the handshake
    Connecting,
    /// Session established
    Authenticated,
    /// Subscriptions registered
    Subscribed,
    /// Reading and dispatching frames
    Receiving,
    /// Transport released
    Disconnected,
    /// Waiting out the backoff interval
    Reconnecting,
}

impl ConnectionState {
    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticated => "authenticated",
            ConnectionState::Subscribed => "subscribed",
            ConnectionState::Receiving => "receiving",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }

    /// Whether a live session exists in this state
    pub fn has_session(&self) -> bool {
        matches!(
            self,
            ConnectionState::Authenticated
                | ConnectionState::Subscribed
                | ConnectionState::Receiving
        )
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub at: DateTime<Utc>,
}

impl Transition {
    pub(crate) fn new(from: ConnectionState, to: ConnectionState) -> Self {
        Transition {
            from,
            to,
            at: Utc::now(),
        }
    }
}

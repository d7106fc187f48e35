//! Core event types shared by the protocol, registry and supervisor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::segment::MessageSegment;
use crate::error::Error;

/// Event type tag used to route envelopes to subscriptions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventType {
    /// Message posted in a group
    GroupMessage,
    /// Direct message to the bot
    PrivateMessage,
    /// Echo of a message the bot account sent itself
    MessageSent,
    /// Group/friend notice (joins, recalls, pokes, ...)
    Notice,
    /// Friend or group join request
    Request,
    /// Gateway heartbeat
    Heartbeat,
    /// Gateway lifecycle (connect/enable/disable)
    Lifecycle,
    /// Any other post type, kept by name
    Other(String),
}

impl EventType {
    /// Whether events of this type carry a message payload
    pub fn is_message(&self) -> bool {
        matches!(
            self,
            EventType::GroupMessage | EventType::PrivateMessage | EventType::MessageSent
        )
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::GroupMessage => write!(f, "group_message"),
            EventType::PrivateMessage => write!(f, "private_message"),
            EventType::MessageSent => write!(f, "message_sent"),
            EventType::Notice => write!(f, "notice"),
            EventType::Request => write!(f, "request"),
            EventType::Heartbeat => write!(f, "heartbeat"),
            EventType::Lifecycle => write!(f, "lifecycle"),
            EventType::Other(name) => write!(f, "{}", name),
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        match name.as_str() {
            "group_message" | "group" => Ok(EventType::GroupMessage),
            "private_message" | "private" => Ok(EventType::PrivateMessage),
            "message_sent" => Ok(EventType::MessageSent),
            "notice" => Ok(EventType::Notice),
            "request" => Ok(EventType::Request),
            "heartbeat" => Ok(EventType::Heartbeat),
            "lifecycle" => Ok(EventType::Lifecycle),
            "" => Err(Error::Config("Event type must not be empty".to_string())),
            _ => Ok(EventType::Other(name)),
        }
    }
}

impl TryFrom<String> for EventType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.to_string()
    }
}

/// Where an event came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceContext {
    /// Bot account that received the event
    pub self_id: Option<String>,
    /// Originating group, if any
    pub group_id: Option<String>,
    /// Sender of the message
    pub sender_id: Option<String>,
    /// Sender display name (group card, falling back to nickname)
    pub sender_name: Option<String>,
    /// Gateway message ID
    pub message_id: Option<String>,
}

/// One inbound notification from the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Routing tag
    pub event_type: EventType,
    /// Finer-grained kind (notice_type, request_type, meta_event_type)
    pub detail: Option<String>,
    /// Sub-type reported by the gateway
    pub sub_type: Option<String>,
    /// Source context
    pub source: SourceContext,
    /// Ordered message payload; empty for non-message events
    pub segments: Vec<MessageSegment>,
    /// When the gateway produced the event
    pub time: Option<DateTime<Utc>>,
}

impl EventEnvelope {
    /// Create an envelope with no payload
    pub fn new(event_type: EventType) -> Self {
        EventEnvelope {
            event_type,
            detail: None,
            sub_type: None,
            source: SourceContext::default(),
            segments: Vec::new(),
            time: None,
        }
    }

    /// Set the message payload
    pub fn with_segments(mut self, segments: Vec<MessageSegment>) -> Self {
        self.segments = segments;
        self
    }

    /// Set the source context
    pub fn with_source(mut self, source: SourceContext) -> Self {
        self.source = source;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_parsing() {
        assert_eq!("group_message".parse::<EventType>().unwrap(), EventType::GroupMessage);
        assert_eq!("Group".parse::<EventType>().unwrap(), EventType::GroupMessage);
        assert_eq!("notice".parse::<EventType>().unwrap(), EventType::Notice);
        assert_eq!(
            "guild_event".parse::<EventType>().unwrap(),
            EventType::Other("guild_event".to_string())
        );
        assert!("  ".parse::<EventType>().is_err());
    }

    #[test]
    fn test_event_type_display_round_trips() {
        for ty in [
            EventType::GroupMessage,
            EventType::PrivateMessage,
            EventType::MessageSent,
            EventType::Heartbeat,
            EventType::Other("guild_event".into()),
        ] {
            assert_eq!(ty.to_string().parse::<EventType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_event_type_serde_as_string() {
        let json = serde_json::to_string(&EventType::PrivateMessage).unwrap();
        assert_eq!(json, "\"private_message\"");
        let back: EventType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EventType::PrivateMessage);
    }
}

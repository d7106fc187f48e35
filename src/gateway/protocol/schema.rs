//! Gateway protocol schema
//!
//! Wire format of OneBot v11 frames as pushed over a forward WebSocket.
//! These structs are deliberately loose: implementations disagree on whether
//! IDs are numbers or strings and on which optional fields they send.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Return code some gateways send when the access token is wrong
pub const RETCODE_TOKEN_INVALID: i64 = 1403;

/// Return code for a missing access token
pub const RETCODE_TOKEN_MISSING: i64 = 1401;

/// Top-level frame: either a pushed event or an action response
#[derive(Debug, Clone, Deserialize)]
pub struct RawFrame {
    /// Event family (`message`, `notice`, `request`, `meta_event`, ...)
    pub post_type: Option<String>,
    /// `group` / `private` for message events
    pub message_type: Option<String>,
    /// Kind of notice
    pub notice_type: Option<String>,
    /// Kind of request
    pub request_type: Option<String>,
    /// `heartbeat` / `lifecycle` for meta events
    pub meta_event_type: Option<String>,
    /// Event sub-type
    pub sub_type: Option<String>,
    /// Unix timestamp in seconds
    pub time: Option<i64>,
    /// Bot account
    pub self_id: Option<Value>,
    /// Sender / subject user
    pub user_id: Option<Value>,
    /// Originating group
    pub group_id: Option<Value>,
    /// Message ID
    pub message_id: Option<Value>,
    /// Message payload
    pub message: Option<RawMessage>,
    /// CQ-code rendering of the message
    pub raw_message: Option<String>,
    /// Sender details
    pub sender: Option<RawSender>,
    /// Action status (`ok`/`failed`) or heartbeat status object
    pub status: Option<Value>,
    /// Action return code
    pub retcode: Option<i64>,
    /// Action correlation token
    pub echo: Option<Value>,
}

/// Message payload: segment array or CQ-code string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawMessage {
    /// Array format
    Segments(Vec<RawSegment>),
    /// String format with embedded CQ codes
    Cq(String),
}

/// One segment in array format
#[derive(Debug, Clone, Deserialize)]
pub struct RawSegment {
    /// Segment type
    #[serde(rename = "type")]
    pub kind: String,
    /// Segment parameters; `null` is treated as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Sender block of a message event
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSender {
    /// Account nickname
    pub nickname: Option<String>,
    /// Group card (per-group display name)
    pub card: Option<String>,
}

impl RawSender {
    /// Preferred display name: non-empty card, else nickname
    pub fn display_name(&self) -> Option<String> {
        self.card
            .as_deref()
            .filter(|c| !c.is_empty())
            .or(self.nickname.as_deref())
            .map(str::to_string)
    }
}

/// Render an ID that may arrive as a number or a string
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

//! Gateway Protocol - OneBot v11 over a forward WebSocket
//!
//! This module is the deserialization boundary between the gateway's wire
//! format and the crate's own [`EventEnvelope`] model.
//!
//! ## Frame Types
//!
//! - **Events** carry a `post_type` and are pushed by the gateway
//! - **Action responses** carry `status`/`retcode`/`echo` and answer requests
//!
//! Message payloads arrive either as a segment array or as a CQ-code string;
//! both produce the same [`MessageSegment`] sequence.

pub mod cq;
pub mod schema;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::core::{EventEnvelope, EventType, MediaKind, MessageSegment, SourceContext};
use crate::error::ProtocolError;

pub use schema::{
    id_string, RawFrame, RawMessage, RawSegment, RETCODE_TOKEN_INVALID, RETCODE_TOKEN_MISSING,
};

/// A decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Gateway-pushed event
    Event(EventEnvelope),
    /// Response to an action call
    ActionResponse {
        /// Whether the gateway reported success
        ok: bool,
        /// Return code
        retcode: i64,
    },
}

impl Frame {
    /// Whether this frame tells us the access token was refused
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Frame::ActionResponse { ok: false, retcode }
                if *retcode == RETCODE_TOKEN_INVALID
                    || *retcode == RETCODE_TOKEN_MISSING
                    || *retcode == 401
                    || *retcode == 403
        )
    }

    /// Self ID carried by a lifecycle `connect` event
    pub fn lifecycle_connect_id(&self) -> Option<&str> {
        match self {
            Frame::Event(envelope)
                if envelope.event_type == EventType::Lifecycle
                    && envelope.sub_type.as_deref() == Some("connect") =>
            {
                envelope.source.self_id.as_deref()
            }
            _ => None,
        }
    }
}

/// Parse one text frame
pub fn parse_frame(text: &str) -> Result<Frame, ProtocolError> {
    let raw: RawFrame = serde_json::from_str(text)
        .map_err(|e| ProtocolError::MalformedFrame(format!("invalid JSON: {}", e)))?;

    match raw.post_type.clone() {
        Some(post_type) => into_envelope(&post_type, raw).map(Frame::Event),
        None if raw.retcode.is_some() || raw.echo.is_some() => Ok(Frame::ActionResponse {
            ok: raw.status.as_ref().and_then(Value::as_str) == Some("ok"),
            retcode: raw.retcode.unwrap_or_default(),
        }),
        None => Err(ProtocolError::MalformedFrame(
            "frame has neither post_type nor retcode".to_string(),
        )),
    }
}

fn into_envelope(post_type: &str, raw: RawFrame) -> Result<EventEnvelope, ProtocolError> {
    let (event_type, detail) = match post_type {
        "message" => {
            let event_type = match raw.message_type.as_deref() {
                Some("group") => EventType::GroupMessage,
                Some("private") => EventType::PrivateMessage,
                Some(other) => EventType::Other(format!("{}_message", other)),
                None => {
                    return Err(ProtocolError::MalformedFrame(
                        "message event without message_type".to_string(),
                    ))
                }
            };
            (event_type, raw.message_type.clone())
        }
        "message_sent" => (EventType::MessageSent, raw.message_type.clone()),
        "notice" => (EventType::Notice, raw.notice_type.clone()),
        "request" => (EventType::Request, raw.request_type.clone()),
        "meta_event" => {
            let event_type = match raw.meta_event_type.as_deref() {
                Some("heartbeat") => EventType::Heartbeat,
                Some("lifecycle") => EventType::Lifecycle,
                Some(other) => EventType::Other(other.to_string()),
                None => EventType::Other("meta_event".to_string()),
            };
            (event_type, raw.meta_event_type.clone())
        }
        other => (EventType::Other(other.to_string()), None),
    };

    let segments = match (&raw.message, &raw.raw_message) {
        (Some(message), _) => decode_message(message),
        (None, Some(cq_string)) => cq::parse(cq_string),
        (None, None) if event_type.is_message() => {
            return Err(ProtocolError::MalformedFrame(format!(
                "{} event without message payload",
                event_type
            )))
        }
        (None, None) => Vec::new(),
    };

    let source = SourceContext {
        self_id: raw.self_id.as_ref().and_then(id_string),
        group_id: raw.group_id.as_ref().and_then(id_string),
        sender_id: raw.user_id.as_ref().and_then(id_string),
        sender_name: raw.sender.as_ref().and_then(|s| s.display_name()),
        message_id: raw.message_id.as_ref().and_then(id_string),
    };

    Ok(EventEnvelope {
        event_type,
        detail,
        sub_type: raw.sub_type,
        source,
        segments,
        time: raw.time.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
    })
}

/// Convert a message payload in either format into segments
pub fn decode_message(message: &RawMessage) -> Vec<MessageSegment> {
    match message {
        RawMessage::Segments(segments) => segments
            .iter()
            .map(|s| segment_from_wire(&s.kind, &s.data))
            .collect(),
        RawMessage::Cq(text) => cq::parse(text),
    }
}

/// Map one wire segment onto the crate's segment model
pub(crate) fn segment_from_wire(kind: &str, data: &Map<String, Value>) -> MessageSegment {
    match kind {
        "text" => {
            if let Some(text) = data.get("text").and_then(Value::as_str) {
                return MessageSegment::text(text);
            }
        }
        "at" => {
            if let Some(target) = data.get("qq").and_then(id_string) {
                return MessageSegment::mention(target);
            }
        }
        _ => {
            if let Some(media) = MediaKind::from_wire(kind) {
                let reference = ["file", "url", "file_id"]
                    .iter()
                    .find_map(|key| data.get(*key).and_then(id_string))
                    .unwrap_or_default();
                return MessageSegment::media(media, reference);
            }
        }
    }
    MessageSegment::unknown(json!({ "type": kind, "data": data }))
}

//! Message segments - the atomic parts of a composite chat message

use serde::{Deserialize, Serialize};

/// Kind of media a segment references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Picture or sticker
    Image,
    /// Voice clip
    Record,
    /// Video clip
    Video,
    /// Uploaded file
    File,
}

impl MediaKind {
    /// Map a wire segment type to a media kind
    pub fn from_wire(kind: &str) -> Option<Self> {
        match kind {
            "image" => Some(MediaKind::Image),
            "record" => Some(MediaKind::Record),
            "video" => Some(MediaKind::Video),
            "file" => Some(MediaKind::File),
            _ => None,
        }
    }

    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Record => "record",
            MediaKind::Video => "video",
            MediaKind::File => "file",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of a composite message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageSegment {
    /// Literal text
    Text { text: String },
    /// Mention of a user (or `all`)
    Mention { target: String },
    /// Reference to a media object held by the gateway
    Media { kind: MediaKind, reference: String },
    /// Segment the decoder does not understand, kept verbatim
    Unknown { raw: serde_json::Value },
}

impl MessageSegment {
    /// Create a text segment
    pub fn text(text: impl Into<String>) -> Self {
        MessageSegment::Text { text: text.into() }
    }

    /// Create a mention segment
    pub fn mention(target: impl Into<String>) -> Self {
        MessageSegment::Mention {
            target: target.into(),
        }
    }

    /// Create a media segment
    pub fn media(kind: MediaKind, reference: impl Into<String>) -> Self {
        MessageSegment::Media {
            kind,
            reference: reference.into(),
        }
    }

    /// Create an unknown segment
    pub fn unknown(raw: serde_json::Value) -> Self {
        MessageSegment::Unknown { raw }
    }

    /// Get the text content if this is a text segment
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageSegment::Text { text } => Some(text),
            _ => None,
        }
    }
}

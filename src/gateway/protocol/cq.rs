//! CQ-code parsing for gateways that send messages in string format
//!
//! `hi [CQ:at,qq=42] [CQ:image,file=a.jpg]` becomes a segment sequence using
//! the same mapping as the array format.

use serde_json::{Map, Value};

use super::segment_from_wire;
use crate::core::MessageSegment;

const CQ_OPEN: &str = "[CQ:";

/// Parse a CQ-code string into segments
pub fn parse(input: &str) -> Vec<MessageSegment> {
    let mut segments = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let Some(start) = rest.find(CQ_OPEN) else {
            push_text(&mut segments, rest);
            break;
        };
        let Some(len) = rest[start..].find(']') else {
            // unterminated code stays literal
            push_text(&mut segments, rest);
            break;
        };

        push_text(&mut segments, &rest[..start]);
        segments.push(parse_code(&rest[start + CQ_OPEN.len()..start + len]));
        rest = &rest[start + len + 1..];
    }

    segments
}

fn push_text(segments: &mut Vec<MessageSegment>, raw: &str) {
    if !raw.is_empty() {
        segments.push(MessageSegment::text(unescape_text(raw)));
    }
}

fn parse_code(body: &str) -> MessageSegment {
    let mut parts = body.split(',');
    let kind = parts.next().unwrap_or_default().trim();
    let mut data = Map::new();
    for part in parts {
        if let Some((key, value)) = part.split_once('=') {
            data.insert(key.to_string(), Value::String(unescape_param(value)));
        }
    }
    segment_from_wire(kind, &data)
}

fn unescape_text(raw: &str) -> String {
    raw.replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&amp;", "&")
}

fn unescape_param(raw: &str) -> String {
    raw.replace("&#44;", ",")
        .replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&amp;", "&")
}

//! Message decoder - renders a segment sequence as flat text
//!
//! Text segments contribute their literal content, mentions become `@<id>`,
//! media references become `[<kind>:<reference>]` and unknown segments are
//! dropped. Decoding never fails.

use std::fmt::Write as _;

use crate::core::MessageSegment;

/// Decode an ordered segment sequence into a single string
pub fn decode(segments: &[MessageSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        // Writing into a String cannot fail
        let _ = write_segment(&mut out, segment);
    }
    out
}

fn write_segment(out: &mut String, segment: &MessageSegment) -> std::fmt::Result {
    match segment {
        MessageSegment::Text { text } => out.write_str(text),
        MessageSegment::Mention { target } => write!(out, "@{}", target),
        MessageSegment::Media { kind, reference } if reference.is_empty() => {
            write!(out, "[{}]", kind)
        }
        MessageSegment::Media { kind, reference } => write!(out, "[{}:{}]", kind, reference),
        MessageSegment::Unknown { .. } => Ok(()),
    }
}

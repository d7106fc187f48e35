//! Core module - Fundamental types and traits for BotProxy
//!
//! This module defines the gateway-independent data model:
//! - Event envelopes and their routing tags
//! - Message segments
//! - The sink trait that downstream consumers implement
//!
//! The wire protocol and the supervisor only exchange these types, so a
//! different gateway binding can reuse the registry and decoder unchanged.

pub mod segment;
pub mod sink;
pub mod types;

pub use segment::{MediaKind, MessageSegment};
pub use sink::{ChannelSink, DecodedMessage, MessageSink, StdoutSink};
pub use types::{EventEnvelope, EventType, SourceContext};

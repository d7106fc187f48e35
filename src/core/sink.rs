//! Sink trait - Abstract interface for downstream consumers
//!
//! The proxy does not interpret decoded messages. It hands each one to a
//! `MessageSink`, which may print it, queue it or forward it elsewhere.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use super::types::{EventType, SourceContext};
use crate::error::HandlerError;

/// A decoded message ready for a consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedMessage {
    /// Event type the message arrived as
    pub event_type: EventType,
    /// Where it came from
    pub source: SourceContext,
    /// Flat text rendering of the segments
    pub text: String,
}

/// Consumer of decoded messages
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Accept one decoded message
    async fn accept(&self, message: DecodedMessage) -> Result<(), HandlerError>;
}

/// Writes each decoded message as one line on standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

#[async_trait]
impl MessageSink for StdoutSink {
    async fn accept(&self, message: DecodedMessage) -> Result<(), HandlerError> {
        let mut stdout = tokio::io::stdout();
        let mut line = message.text;
        line.push('\n');
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(HandlerError::downstream)?;
        stdout.flush().await.map_err(HandlerError::downstream)
    }
}

/// Forwards decoded messages into a bounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<DecodedMessage>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its queue
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DecodedMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ChannelSink { tx }, rx)
    }
}

#[async_trait]
impl MessageSink for ChannelSink {
    async fn accept(&self, message: DecodedMessage) -> Result<(), HandlerError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| HandlerError::downstream("message queue closed"))
    }
}

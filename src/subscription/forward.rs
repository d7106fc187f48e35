//! Decode-and-forward handler: the bridge between the registry and a sink

use std::sync::Arc;

use async_trait::async_trait;

use super::traits::EventHandler;
use crate::core::{DecodedMessage, EventEnvelope, MessageSink};
use crate::decoder::decode;
use crate::error::HandlerError;

/// Runs the decoder over each envelope and hands the text to a sink
pub struct ForwardHandler {
    sink: Arc<dyn MessageSink>,
}

impl ForwardHandler {
    /// Create a handler forwarding into `sink`
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        ForwardHandler { sink }
    }
}

#[async_trait]
impl EventHandler for ForwardHandler {
    fn name(&self) -> &str {
        "forward"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), HandlerError> {
        let message = DecodedMessage {
            event_type: envelope.event_type.clone(),
            source: envelope.source.clone(),
            text: decode(&envelope.segments),
        };
        self.sink.accept(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChannelSink, EventType, MessageSegment, SourceContext};

    #[tokio::test]
    async fn test_forwards_decoded_text_with_context() {
        let (sink, mut rx) = ChannelSink::new(1);
        let handler = ForwardHandler::new(Arc::new(sink));
        let envelope = EventEnvelope::new(EventType::GroupMessage)
            .with_source(SourceContext {
                group_id: Some("123".into()),
                sender_id: Some("42".into()),
                ..Default::default()
            })
            .with_segments(vec![MessageSegment::text("hi "), MessageSegment::mention("42")]);

        handler.handle(&envelope).await.unwrap();

        let message = rx.recv().await.unwrap();
        assert_eq!(message.text, "hi @42");
        assert_eq!(message.source.group_id.as_deref(), Some("123"));
        assert_eq!(message.event_type, EventType::GroupMessage);
    }
}

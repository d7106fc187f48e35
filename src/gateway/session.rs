//! Gateway session - one authenticated WebSocket connection

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;
use uuid::Uuid;

use super::protocol::{parse_frame, Frame};
use crate::error::{ConnectionError, Error, ProtocolError, Result};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Binary frames carry the same JSON as text frames and must be UTF-8
pub(crate) fn binary_text(bytes: &[u8]) -> std::result::Result<&str, ProtocolError> {
    std::str::from_utf8(bytes)
        .map_err(|e| ProtocolError::MalformedFrame(format!("binary frame is not UTF-8: {}", e)))
}

/// Public facts about a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    /// Identifier assigned by the gateway (the bot's self ID)
    pub id: String,
    /// Locally generated ID for this transport
    pub connection_id: Uuid,
    /// Endpoint the session is connected to
    pub endpoint: String,
    /// When the handshake completed
    pub established_at: DateTime<Utc>,
}

/// An authenticated connection to the gateway.
///
/// The session exclusively owns its transport; dropping it releases the
/// socket.
pub struct Session {
    info: SessionInfo,
    stream: WsStream,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("info", &self.info).finish()
    }
}

impl Session {
    pub(crate) fn new(id: String, endpoint: String, stream: WsStream) -> Self {
        Session {
            info: SessionInfo {
                id,
                connection_id: Uuid::new_v4(),
                endpoint,
                established_at: Utc::now(),
            },
            stream,
        }
    }

    /// Gateway-assigned session ID
    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// Session details
    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when the gateway closes the connection,
    /// `Err(Error::Protocol)` for a frame that cannot be parsed (the session
    /// stays usable) and `Err(Error::Connection)` when the transport fails or
    /// stays silent longer than `idle_timeout`.
    pub async fn next_frame(&mut self, idle_timeout: Option<Duration>) -> Result<Option<Frame>> {
        loop {
            let next = match idle_timeout {
                Some(limit) => tokio::time::timeout(limit, self.stream.next())
                    .await
                    .map_err(|_| {
                        ConnectionError::Timeout(format!("no traffic for {:?}", limit))
                    })?,
                None => self.stream.next().await,
            };

            let message = match next {
                None => return Ok(None),
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    return Err(ConnectionError::Unreachable(format!("read failed: {}", e)).into())
                }
            };

            match message {
                Message::Text(text) => {
                    return parse_frame(text.as_str()).map(Some).map_err(Error::from)
                }
                Message::Binary(bytes) => {
                    let text = binary_text(&bytes)?;
                    return parse_frame(text).map(Some).map_err(Error::from);
                }
                Message::Close(frame) => {
                    debug!("Gateway closed session {}: {:?}", self.info.id, frame);
                    return Ok(None);
                }
                // ping/pong are answered by the transport
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    /// Close the connection with a normal close frame
    pub async fn close(mut self) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "shutdown".into(),
        };
        if let Err(e) = self.stream.send(Message::Close(Some(frame))).await {
            debug!("Close frame not delivered to {}: {}", self.info.endpoint, e);
        }
    }
}

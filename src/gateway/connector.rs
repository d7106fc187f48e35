//! Transport connector - opens the socket and performs the token handshake
//!
//! The handshake follows OneBot v11 forward WebSocket conventions:
//! the token travels as `Authorization: Bearer <token>` on the upgrade
//! request, and the gateway acknowledges with a lifecycle `connect` meta
//! event whose `self_id` becomes the session ID.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info};

use super::protocol::parse_frame;
use super::session::{binary_text, Session, WsStream};
use crate::config::GatewayConfig;
use crate::error::ConnectionError;

/// Something that can produce a live [`Session`]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Endpoint this connector dials, for logging
    fn endpoint(&self) -> &str;

    /// Open and authenticate a new session
    async fn connect(&self) -> Result<Session, ConnectionError>;
}

/// WebSocket connector for OneBot gateways
pub struct WsConnector {
    endpoint: String,
    token: SecretString,
    handshake_timeout: Duration,
}

impl std::fmt::Debug for WsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnector")
            .field("endpoint", &self.endpoint)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish_non_exhaustive()
    }
}

impl WsConnector {
    /// Create a connector
    pub fn new(
        endpoint: impl Into<String>,
        token: SecretString,
        handshake_timeout: Duration,
    ) -> Self {
        WsConnector {
            endpoint: endpoint.into(),
            token,
            handshake_timeout,
        }
    }

    /// Create a connector from gateway configuration
    pub fn from_config(config: &GatewayConfig) -> Self {
        WsConnector::new(
            config.url.clone(),
            config.access_token.clone(),
            config.handshake_timeout,
        )
    }
}

#[async_trait]
impl Connector for WsConnector {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connect(&self) -> Result<Session, ConnectionError> {
        connect(&self.endpoint, &self.token, self.handshake_timeout).await
    }
}

/// Open `endpoint`, present `token`, and wait for the gateway's
/// acknowledgement for at most `handshake_timeout`.
pub async fn connect(
    endpoint: &str,
    token: &SecretString,
    handshake_timeout: Duration,
) -> Result<Session, ConnectionError> {
    let url = url::Url::parse(endpoint).map_err(|e| {
        ConnectionError::Unreachable(format!("invalid endpoint {}: {}", endpoint, e))
    })?;
    if url.scheme() != "ws" && url.scheme() != "wss" {
        return Err(ConnectionError::Unreachable(format!(
            "unsupported scheme '{}', expected ws or wss",
            url.scheme()
        )));
    }

    let mut request = endpoint
        .into_client_request()
        .map_err(|e| ConnectionError::Unreachable(format!("invalid request: {}", e)))?;

    let secret = token.expose_secret();
    if !secret.is_empty() {
        let value = HeaderValue::from_str(&format!("Bearer {}", secret)).map_err(|_| {
            ConnectionError::AuthRejected("access token is not a valid header value".to_string())
        })?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let deadline = Instant::now() + handshake_timeout;
    debug!("Opening gateway transport to {}", endpoint);

    let (mut stream, _response) =
        match tokio::time::timeout_at(deadline, tokio_tungstenite::connect_async(request)).await {
            Err(_) => {
                return Err(ConnectionError::Timeout(format!(
                    "transport not open after {:?}",
                    handshake_timeout
                )))
            }
            Ok(Err(WsError::Http(response))) => {
                let status = response.status();
                let reason = format!("upgrade refused with HTTP {}", status);
                return Err(
                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        ConnectionError::AuthRejected(reason)
                    } else {
                        ConnectionError::Unreachable(reason)
                    },
                );
            }
            Ok(Err(e)) => return Err(ConnectionError::Unreachable(e.to_string())),
            Ok(Ok(pair)) => pair,
        };

    let session_id = match tokio::time::timeout_at(deadline, await_ack(&mut stream)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(ConnectionError::Timeout(format!(
                "no lifecycle acknowledgement within {:?}",
                handshake_timeout
            )))
        }
    };

    info!("Gateway {} acknowledged session {}", endpoint, session_id);
    Ok(Session::new(session_id, endpoint.to_string(), stream))
}

/// Read frames until the lifecycle `connect` event arrives
async fn await_ack(stream: &mut WsStream) -> Result<String, ConnectionError> {
    while let Some(message) = stream.next().await {
        let message = message.map_err(|e| {
            ConnectionError::Unreachable(format!("handshake read failed: {}", e))
        })?;

        let text = match message {
            Message::Text(text) => text.as_str().to_string(),
            Message::Binary(bytes) => match binary_text(&bytes) {
                Ok(text) => text.to_string(),
                Err(e) => {
                    debug!("Discarding pre-handshake frame: {}", e);
                    continue;
                }
            },
            Message::Close(Some(frame)) if frame.code == CloseCode::Policy => {
                return Err(ConnectionError::AuthRejected(format!(
                    "gateway closed with policy violation: {}",
                    frame.reason.as_str()
                )))
            }
            Message::Close(_) => break,
            _ => continue,
        };

        match parse_frame(&text) {
            Ok(frame) if frame.is_auth_failure() => {
                return Err(ConnectionError::AuthRejected(
                    "gateway reported an invalid access token".to_string(),
                ))
            }
            Ok(frame) => {
                if let Some(id) = frame.lifecycle_connect_id() {
                    return Ok(id.to_string());
                }
                debug!("Discarding pre-handshake frame");
            }
            Err(e) => debug!("Discarding unparseable pre-handshake frame: {}", e),
        }
    }

    Err(ConnectionError::Unreachable(
        "gateway closed the connection during handshake".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_websocket_scheme() {
        let err = connect("http://127.0.0.1:3001", &SecretString::from("t"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_refused_port_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = connect(
            &format!("ws://127.0.0.1:{}", port),
            &SecretString::from("t"),
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ConnectionError::Unreachable(_)), "got {:?}", err);
    }

    #[test]
    fn test_debug_hides_token() {
        let connector = WsConnector::new(
            "ws://127.0.0.1:3001",
            SecretString::from("hG8dQqGk6jGC"),
            Duration::from_secs(5),
        );
        let rendered = format!("{:?}", connector);
        assert!(!rendered.contains("hG8dQqGk6jGC"));
        assert!(rendered.contains("127.0.0.1:3001"));
    }
}

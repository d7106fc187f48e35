//! In-process OneBot gateway used by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;

pub const SELF_ID: &str = "10001";

/// How the mock gateway behaves on each connection
#[derive(Debug, Clone)]
pub struct Script {
    token: Option<String>,
    reject_first: u32,
    ack: bool,
    preamble: Vec<Message>,
    frames: Vec<Message>,
    close_after_frames: bool,
}

impl Script {
    pub fn new() -> Self {
        Script {
            token: None,
            reject_first: 0,
            ack: true,
            preamble: Vec::new(),
            frames: Vec::new(),
            close_after_frames: false,
        }
    }

    /// Refuse upgrades that do not carry this bearer token
    pub fn token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Refuse the first `n` upgrades regardless of the token
    pub fn reject_first(mut self, n: u32) -> Self {
        self.reject_first = n;
        self
    }

    /// Never send the lifecycle acknowledgement
    pub fn without_ack(mut self) -> Self {
        self.ack = false;
        self
    }

    /// Send this frame after the acknowledgement
    pub fn frame(mut self, frame: impl Into<String>) -> Self {
        self.frames.push(Message::Text(frame.into().into()));
        self
    }

    /// Send this binary frame after the acknowledgement
    pub fn binary_frame(mut self, bytes: Vec<u8>) -> Self {
        self.frames.push(Message::Binary(bytes.into()));
        self
    }

    /// Send this binary frame before the acknowledgement
    pub fn binary_before_ack(mut self, bytes: Vec<u8>) -> Self {
        self.preamble.push(Message::Binary(bytes.into()));
        self
    }

    /// Close each connection once its frames are sent
    pub fn close_after_frames(mut self) -> Self {
        self.close_after_frames = true;
        self
    }
}

pub struct MockGateway {
    pub url: String,
    attempts: Arc<AtomicU32>,
    accepted: Arc<AtomicU32>,
    task: JoinHandle<()>,
}

impl MockGateway {
    pub async fn start(script: Script) -> MockGateway {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let attempts = Arc::new(AtomicU32::new(0));
        let accepted = Arc::new(AtomicU32::new(0));

        let task = {
            let attempts = attempts.clone();
            let accepted = accepted.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    tokio::spawn(serve(stream, attempt, script.clone(), accepted.clone()));
                }
            })
        };

        MockGateway {
            url,
            attempts,
            accepted,
            task,
        }
    }

    /// Upgrade requests seen so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Upgrades that were accepted
    pub fn accepted(&self) -> u32 {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl Drop for MockGateway {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(stream: TcpStream, attempt: u32, script: Script, accepted: Arc<AtomicU32>) {
    let refuse = attempt <= script.reject_first;
    let expected = script.token.clone().map(|t| format!("Bearer {}", t));

    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let presented = request
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok());
        let authorized = expected.as_deref().map_or(true, |e| presented == Some(e));

        if refuse || !authorized {
            let mut error = ErrorResponse::new(Some("token invalid".to_string()));
            *error.status_mut() = StatusCode::UNAUTHORIZED;
            return Err(error);
        }
        Ok(response)
    };

    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
        return;
    };
    accepted.fetch_add(1, Ordering::SeqCst);

    for frame in &script.preamble {
        if ws.send(frame.clone()).await.is_err() {
            return;
        }
    }
    if script.ack && ws.send(Message::Text(lifecycle_connect(SELF_ID).into())).await.is_err() {
        return;
    }
    for frame in &script.frames {
        if ws.send(frame.clone()).await.is_err() {
            return;
        }
    }

    if script.close_after_frames {
        let _ = ws.close(None).await;
        return;
    }
    while let Some(Ok(message)) = ws.next().await {
        if message.is_close() {
            break;
        }
    }
}

pub fn lifecycle_connect(self_id: &str) -> String {
    json!({
        "time": 1_700_000_000,
        "self_id": self_id.parse::<i64>().unwrap(),
        "post_type": "meta_event",
        "meta_event_type": "lifecycle",
        "sub_type": "connect",
    })
    .to_string()
}

pub fn group_message(group_id: i64, user_id: i64, message: Value) -> String {
    json!({
        "time": 1_700_000_001,
        "self_id": SELF_ID.parse::<i64>().unwrap(),
        "post_type": "message",
        "message_type": "group",
        "sub_type": "normal",
        "message_id": 77,
        "group_id": group_id,
        "user_id": user_id,
        "message": message,
        "sender": { "user_id": user_id, "nickname": "alice", "card": "" },
    })
    .to_string()
}

pub fn text_message(group_id: i64, text: &str) -> String {
    group_message(group_id, 42, json!([{ "type": "text", "data": { "text": text } }]))
}

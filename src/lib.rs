//! # BotProxy
//!
//! A resilient client for OneBot v11 chat gateways. BotProxy keeps a single
//! authenticated WebSocket session alive, subscribes to typed event streams
//! and hands each decoded message to a downstream sink.
//!
//! ## Features
//!
//! - **Token handshake:** Bearer-token authentication with a bounded retry budget
//! - **Typed events:** Group, private, notice and meta events routed by type
//! - **Message decoding:** Segment arrays and CQ-code strings flattened to text
//! - **Self-healing:** Exponential backoff reconnection with cancellable waits
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use botproxy::core::{EventType, StdoutSink};
//! use botproxy::gateway::WsConnector;
//! use botproxy::subscription::ForwardHandler;
//! use botproxy::supervisor::Supervisor;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test::block_on(async {
//! let config = botproxy::Config::from_env()?;
//! let mut supervisor = Supervisor::from_config(WsConnector::from_config(&config.gateway), &config);
//! supervisor.subscribe(EventType::GroupMessage, Arc::new(ForwardHandler::new(Arc::new(StdoutSink))));
//! supervisor.run(CancellationToken::new()).await?;
//! # Ok::<(), botproxy::Error>(())
//! # });
//! ```

pub mod config;
pub mod core;
pub mod decoder;
pub mod error;
pub mod gateway;
pub mod subscription;
pub mod supervisor;

pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");

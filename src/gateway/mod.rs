//! Gateway module - outbound link to a OneBot event source
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐        ┌──────────────────────────┐
//! │        Supervisor        │        │   OneBot implementation  │
//! │  (connect / reconnect)   │        │    ws://127.0.0.1:3001   │
//! └────────────┬─────────────┘        └────────────▲─────────────┘
//!              │ Connector::connect                │
//!              ▼                                   │ Bearer token
//!        ┌───────────┐      WebSocket frames       │
//!        │  Session  │◄────────────────────────────┘
//!        └─────┬─────┘
//!              │ protocol::parse_frame
//!              ▼
//!        EventEnvelope
//! ```

pub mod connector;
pub mod protocol;
pub mod session;

pub use connector::{connect, Connector, WsConnector};
pub use protocol::{parse_frame, Frame};
pub use session::{Session, SessionInfo};

//! Subscription module - event routing from the receive loop to consumers
//!
//! Handlers implement the `EventHandler` trait and are registered into a
//! `SubscriptionRegistry` under an event type. The receive loop calls
//! `dispatch` once per envelope, in arrival order.
//!
//! ## Built-in Handlers
//!
//! - **forward**: decode the message payload and pass it to a `MessageSink`
//! - **handler_fn**: wrap a plain closure

mod forward;
mod registry;
mod traits;

// Core trait and adapters
pub use traits::{handler_fn, EventHandler, FnHandler};

// Registry
pub use registry::{DispatchReport, Subscription, SubscriptionId, SubscriptionRegistry};

// Built-in handlers
pub use forward::ForwardHandler;

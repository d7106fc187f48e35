//! Core handler trait

use async_trait::async_trait;

use crate::core::EventEnvelope;
use crate::error::HandlerError;

/// A callback invoked for every envelope of the type it is subscribed to
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs when the handler fails
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Handle one envelope.
    ///
    /// The envelope is borrowed for the duration of the call only; a handler
    /// that offloads work to a spawned task must copy what it needs.
    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), HandlerError>;
}

/// Adapter that turns a synchronous closure into an [`EventHandler`]
pub struct FnHandler<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a handler
pub fn handler_fn<F>(name: impl Into<String>, f: F) -> FnHandler<F>
where
    F: Fn(&EventEnvelope) -> Result<(), HandlerError> + Send + Sync,
{
    FnHandler { name: name.into(), f }
}

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&EventEnvelope) -> Result<(), HandlerError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), HandlerError> {
        (self.f)(envelope)
    }
}

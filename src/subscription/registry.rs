//! Subscription registry - routes envelopes to handlers by event type

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::traits::EventHandler;
use crate::core::{EventEnvelope, EventType};

/// Identifier returned by [`SubscriptionRegistry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A handler bound to an event type
#[derive(Clone)]
pub struct Subscription {
    /// Registration handle
    pub id: SubscriptionId,
    /// Event type the handler receives
    pub event_type: EventType,
    /// The handler itself
    pub handler: Arc<dyn EventHandler>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .field("handler", &self.handler.name())
            .finish()
    }
}

/// Outcome of dispatching one envelope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that completed successfully
    pub delivered: usize,
    /// Handlers that returned an error
    pub failed: usize,
}

impl DispatchReport {
    /// Total handlers invoked
    pub fn invoked(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Registry of event subscriptions
pub struct SubscriptionRegistry {
    subscriptions: HashMap<EventType, Vec<Subscription>>,
    next_id: u64,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        SubscriptionRegistry {
            subscriptions: HashMap::new(),
            next_id: 0,
        }
    }

    /// Register a handler for an event type.
    ///
    /// Handlers for the same type run in registration order.
    pub fn subscribe(
        &mut self,
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        debug!("Subscribing {} to {}", handler.name(), event_type);
        self.subscriptions
            .entry(event_type.clone())
            .or_default()
            .push(Subscription {
                id,
                event_type,
                handler,
            });
        id
    }

    /// Invoke every handler registered for the envelope's type.
    ///
    /// A failing handler is logged and does not stop later handlers.
    /// Envelopes with no subscribers are dropped.
    pub async fn dispatch(&self, envelope: &EventEnvelope) -> DispatchReport {
        let mut report = DispatchReport::default();
        let Some(subscriptions) = self.subscriptions.get(&envelope.event_type) else {
            return report;
        };

        for subscription in subscriptions {
            match subscription.handler.handle(envelope).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        "Handler {} failed on {} event: {}",
                        subscription.handler.name(),
                        envelope.event_type,
                        e
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Subscriptions for one event type, in dispatch order
    pub fn get(&self, event_type: &EventType) -> &[Subscription] {
        self.subscriptions
            .get(event_type)
            .map(|s| s.as_slice())
            .unwrap_or_default()
    }

    /// Whether any handler listens for this type
    pub fn has_subscribers(&self, event_type: &EventType) -> bool {
        !self.get(event_type).is_empty()
    }

    /// Get subscription count
    pub fn count(&self) -> usize {
        self.subscriptions.values().map(Vec::len).sum()
    }

    /// List subscribed event types
    pub fn event_types(&self) -> Vec<&EventType> {
        self.subscriptions.keys().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::subscription::handler_fn;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, label: &str) -> Arc<dyn EventHandler> {
        let log = Arc::clone(log);
        let label = label.to_string();
        Arc::new(handler_fn(label.clone(), move |_envelope: &EventEnvelope| {
            log.lock().unwrap().push(label.clone());
            Ok(())
        }))
    }

    #[tokio::test]
    async fn test_dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubscriptionRegistry::new();
        for label in ["s1", "s2", "s3", "s4"] {
            registry.subscribe(EventType::GroupMessage, recorder(&log, label));
        }

        let report = registry
            .dispatch(&EventEnvelope::new(EventType::GroupMessage))
            .await;

        assert_eq!(report.delivered, 4);
        assert_eq!(*log.lock().unwrap(), vec!["s1", "s2", "s3", "s4"]);
    }

    #[tokio::test]
    async fn test_dispatch_unregistered_type_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe(EventType::GroupMessage, recorder(&log, "group"));

        let report = registry.dispatch(&EventEnvelope::new(EventType::Notice)).await;

        assert_eq!(report.invoked(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_block_others() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe(EventType::PrivateMessage, recorder(&log, "before"));
        registry.subscribe(
            EventType::PrivateMessage,
            Arc::new(handler_fn("broken", |_envelope: &EventEnvelope| {
                Err(HandlerError::downstream("boom"))
            })),
        );
        registry.subscribe(EventType::PrivateMessage, recorder(&log, "after"));

        let report = registry
            .dispatch(&EventEnvelope::new(EventType::PrivateMessage))
            .await;

        assert_eq!(report, DispatchReport { delivered: 2, failed: 1 });
        assert_eq!(*log.lock().unwrap(), vec!["before", "after"]);
    }

    #[test]
    fn test_subscription_ids_are_unique() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubscriptionRegistry::new();
        let a = registry.subscribe(EventType::Notice, recorder(&log, "a"));
        let b = registry.subscribe(EventType::Notice, recorder(&log, "b"));
        let c = registry.subscribe(EventType::Request, recorder(&log, "c"));

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(registry.count(), 3);
        assert_eq!(registry.get(&EventType::Notice).len(), 2);
        assert!(!registry.has_subscribers(&EventType::Heartbeat));
    }
}

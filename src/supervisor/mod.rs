//! Connection lifecycle supervisor
//!
//! Drives a [`Connector`] through the lifecycle
//!
//! ```text
//! Idle → Connecting → Authenticated → Subscribed → Receiving → Disconnected
//!            ▲                                                      │
//!            └──────────────── Reconnecting ◄───────────────────────┤
//!                                                                   ▼
//!                                                                  Idle
//! ```
//!
//! and dispatches every received event through a [`SubscriptionRegistry`].
//! State changes are published on a `watch` channel (latest state) and a
//! `broadcast` channel (full history).

mod policy;
mod state;

pub use policy::{ReconnectPolicy, Verdict};
pub use state::{ConnectionState, Transition};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ReconnectConfig};
use crate::core::EventType;
use crate::error::{ConnectionError, Error, Result};
use crate::gateway::{Connector, Frame, Session};
use crate::subscription::{EventHandler, SubscriptionRegistry};

const TRANSITION_BUFFER: usize = 64;

/// Why a session ended or never started
#[derive(Debug)]
enum Cause {
    Failed(ConnectionError),
    Closed,
    Shutdown,
}

/// Internal phase, carrying whatever the next step needs
enum Phase {
    Connecting,
    Authenticated(Session),
    Subscribed(Session),
    Receiving(Session),
    Disconnected(Cause),
    Reconnecting(Duration),
    Stopped(Result<()>),
}

impl Phase {
    fn state(&self) -> ConnectionState {
        match self {
            Phase::Connecting => ConnectionState::Connecting,
            Phase::Authenticated(_) => ConnectionState::Authenticated,
            Phase::Subscribed(_) => ConnectionState::Subscribed,
            Phase::Receiving(_) => ConnectionState::Receiving,
            Phase::Disconnected(_) => ConnectionState::Disconnected,
            Phase::Reconnecting(_) => ConnectionState::Reconnecting,
            Phase::Stopped(_) => ConnectionState::Idle,
        }
    }
}

/// Owns the session and keeps it alive
pub struct Supervisor<C: Connector> {
    connector: C,
    registry: SubscriptionRegistry,
    pending: Vec<(EventType, Arc<dyn EventHandler>)>,
    policy: ReconnectPolicy,
    idle_timeout: Option<Duration>,
    state_tx: watch::Sender<ConnectionState>,
    transition_tx: broadcast::Sender<Transition>,
}

impl<C: Connector> Supervisor<C> {
    /// Create a supervisor in the `Idle` state
    pub fn new(connector: C, reconnect: ReconnectConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        let (transition_tx, _) = broadcast::channel(TRANSITION_BUFFER);

        Supervisor {
            connector,
            registry: SubscriptionRegistry::new(),
            pending: Vec::new(),
            policy: ReconnectPolicy::new(reconnect),
            idle_timeout: None,
            state_tx,
            transition_tx,
        }
    }

    /// Create a supervisor using the reconnect and liveness settings of `config`
    pub fn from_config(connector: C, config: &Config) -> Self {
        Supervisor::new(connector, config.reconnect.clone())
            .with_idle_timeout(config.gateway.idle_limit())
    }

    /// Treat a session as dead after this long without inbound traffic
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Queue a handler; it is registered once the first session authenticates
    pub fn subscribe(&mut self, event_type: EventType, handler: Arc<dyn EventHandler>) {
        self.pending.push((event_type, handler));
    }

    /// Latest lifecycle state
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Every state change from now on
    pub fn transitions(&self) -> broadcast::Receiver<Transition> {
        self.transition_tx.subscribe()
    }

    /// Run until shutdown or a fatal error.
    ///
    /// Returns `Ok(())` when `shutdown` is cancelled or the gateway closes
    /// the session with reconnection disabled. Returns an error when the
    /// auth retry budget or the attempt limit is exhausted.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!("Supervisor starting for {}", self.connector.endpoint());
        let mut phase = Phase::Connecting;

        loop {
            self.enter(phase.state());

            phase = match phase {
                Phase::Connecting => self.handle_connecting(&shutdown).await,
                Phase::Authenticated(session) => self.handle_authenticated(session),
                Phase::Subscribed(session) => {
                    self.policy.reset();
                    Phase::Receiving(session)
                }
                Phase::Receiving(session) => self.handle_receiving(session, &shutdown).await,
                Phase::Disconnected(cause) => self.handle_disconnected(cause),
                Phase::Reconnecting(delay) => self.handle_reconnecting(delay, &shutdown).await,
                Phase::Stopped(outcome) => {
                    info!("Supervisor stopped");
                    return outcome;
                }
            };
        }
    }

    fn enter(&self, next: ConnectionState) {
        let previous = self.state_tx.send_replace(next);
        if previous == next {
            return;
        }
        info!("Connection state: {} -> {}", previous, next);
        // No receivers is fine
        let _ = self.transition_tx.send(Transition::new(previous, next));
    }

    async fn handle_connecting(&self, shutdown: &CancellationToken) -> Phase {
        let result = tokio::select! {
            _ = shutdown.cancelled() => return Phase::Disconnected(Cause::Shutdown),
            result = self.connector.connect() => result,
        };

        match result {
            Ok(session) => {
                info!("Session {} established with {}", session.id(), session.info().endpoint);
                Phase::Authenticated(session)
            }
            Err(e) => {
                warn!("Connect to {} failed: {}", self.connector.endpoint(), e);
                Phase::Disconnected(Cause::Failed(e))
            }
        }
    }

    fn handle_authenticated(&mut self, session: Session) -> Phase {
        for (event_type, handler) in self.pending.drain(..) {
            let id = self.registry.subscribe(event_type.clone(), handler);
            debug!("Registered subscription {:?} for {}", id, event_type);
        }
        info!(
            "Session {} subscribed to {} handler(s)",
            session.id(),
            self.registry.count()
        );
        Phase::Subscribed(session)
    }

    async fn handle_receiving(&self, mut session: Session, shutdown: &CancellationToken) -> Phase {
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => None,
                next = session.next_frame(self.idle_timeout) => Some(next),
            };

            let Some(next) = next else {
                session.close().await;
                return Phase::Disconnected(Cause::Shutdown);
            };

            match next {
                Ok(Some(Frame::Event(envelope))) => {
                    let report = tokio::select! {
                        _ = shutdown.cancelled() => None,
                        report = self.registry.dispatch(&envelope) => Some(report),
                    };
                    let Some(report) = report else {
                        session.close().await;
                        return Phase::Disconnected(Cause::Shutdown);
                    };
                    debug!(
                        "Dispatched {} event to {} handler(s), {} failed",
                        envelope.event_type,
                        report.invoked(),
                        report.failed
                    );
                }
                Ok(Some(Frame::ActionResponse { ok, retcode })) => {
                    debug!("Ignoring action response (ok={}, retcode={:?})", ok, retcode);
                }
                Ok(None) => {
                    info!("Gateway closed session {}", session.id());
                    return Phase::Disconnected(Cause::Closed);
                }
                Err(Error::Protocol(e)) => {
                    warn!("Skipping frame on session {}: {}", session.id(), e);
                }
                Err(Error::Connection(e)) => {
                    warn!("Session {} lost: {}", session.id(), e);
                    return Phase::Disconnected(Cause::Failed(e));
                }
                Err(e) => {
                    warn!("Session {} lost: {}", session.id(), e);
                    return Phase::Disconnected(Cause::Failed(ConnectionError::Unreachable(
                        e.to_string(),
                    )));
                }
            }
        }
    }

    fn handle_disconnected(&mut self, cause: Cause) -> Phase {
        let verdict = match cause {
            Cause::Shutdown => return Phase::Stopped(Ok(())),
            Cause::Closed => self.policy.on_closed(),
            Cause::Failed(e) => self.policy.on_failure(&e),
        };

        match verdict {
            Verdict::Retry(delay) => Phase::Reconnecting(delay),
            Verdict::Stop => Phase::Stopped(Ok(())),
            Verdict::GiveUp(e) => {
                error!("Giving up on {}: {}", self.connector.endpoint(), e);
                Phase::Stopped(Err(e))
            }
        }
    }

    async fn handle_reconnecting(&self, delay: Duration, shutdown: &CancellationToken) -> Phase {
        info!(
            "Reconnecting to {} in {:?} (attempt {})",
            self.connector.endpoint(),
            delay,
            self.policy.failures() + 1
        );

        tokio::select! {
            _ = shutdown.cancelled() => Phase::Disconnected(Cause::Shutdown),
            _ = tokio::time::sleep(delay) => Phase::Connecting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingConnector {
        error: ConnectionError,
        calls: Arc<AtomicU32>,
    }

    impl FailingConnector {
        fn new(error: ConnectionError) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                FailingConnector {
                    error,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl Connector for FailingConnector {
        fn endpoint(&self) -> &str {
            "ws://test.invalid"
        }

        async fn connect(&self) -> std::result::Result<Session, ConnectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(self.error.clone())
        }
    }

    fn fast_reconnect() -> ReconnectConfig {
        ReconnectConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            ..Default::default()
        }
    }

    fn drain(rx: &mut broadcast::Receiver<Transition>) -> Vec<(ConnectionState, ConnectionState)> {
        let mut seen = Vec::new();
        while let Ok(t) = rx.try_recv() {
            seen.push((t.from, t.to));
        }
        seen
    }

    #[tokio::test]
    async fn test_unreachable_leads_to_reconnecting_never_authenticated() {
        let (connector, calls) =
            FailingConnector::new(ConnectionError::Unreachable("connection refused".into()));
        let supervisor = Supervisor::new(
            connector,
            ReconnectConfig {
                max_attempts: Some(3),
                ..fast_reconnect()
            },
        );
        let mut transitions = supervisor.transitions();
        let state = supervisor.state();

        let err = supervisor.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*state.borrow(), ConnectionState::Idle);

        use ConnectionState::*;
        let seen = drain(&mut transitions);
        assert_eq!(
            &seen[..4],
            &[
                (Idle, Connecting),
                (Connecting, Disconnected),
                (Disconnected, Reconnecting),
                (Reconnecting, Connecting),
            ]
        );
        assert_eq!(seen.last(), Some(&(Disconnected, Idle)));
        assert!(seen.iter().all(|(_, to)| *to != Authenticated));
    }

    #[tokio::test]
    async fn test_auth_budget_exhaustion_is_fatal() {
        let (connector, calls) =
            FailingConnector::new(ConnectionError::AuthRejected("HTTP 401".into()));
        let supervisor = Supervisor::new(
            connector,
            ReconnectConfig {
                auth_retry_budget: 2,
                ..fast_reconnect()
            },
        );

        let err = supervisor.run(CancellationToken::new()).await.unwrap_err();
        assert!(err.is_auth_rejected());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_backoff() {
        let (connector, _calls) =
            FailingConnector::new(ConnectionError::Unreachable("connection refused".into()));
        let supervisor = Supervisor::new(
            connector,
            ReconnectConfig {
                initial_delay: Duration::from_secs(60),
                max_delay: Duration::from_secs(60),
                ..Default::default()
            },
        );
        let mut state = supervisor.state();
        let mut transitions = supervisor.transitions();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(supervisor.run(shutdown.clone()));

        state
            .wait_for(|s| *s == ConnectionState::Reconnecting)
            .await
            .unwrap();
        shutdown.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("supervisor did not stop")
            .unwrap();
        assert!(outcome.is_ok());
        assert_eq!(*state.borrow(), ConnectionState::Idle);

        use ConnectionState::*;
        let seen = drain(&mut transitions);
        assert_eq!(
            &seen[seen.len() - 2..],
            &[(Reconnecting, Disconnected), (Disconnected, Idle)]
        );
    }

    #[tokio::test]
    async fn test_disabled_reconnect_surfaces_first_failure() {
        let (connector, calls) = FailingConnector::new(ConnectionError::Timeout("no ack".into()));
        let supervisor = Supervisor::new(
            connector,
            ReconnectConfig {
                enabled: false,
                ..fast_reconnect()
            },
        );

        let err = supervisor.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::Connection(ConnectionError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

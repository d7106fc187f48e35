//! Reconnection policy: exponential backoff plus failure budgets

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;

use crate::config::ReconnectConfig;
use crate::error::{ConnectionError, Error};

/// What to do after a session ends or a connect attempt fails
#[derive(Debug)]
pub enum Verdict {
    /// Wait this long, then connect again
    Retry(Duration),
    /// Stop without an error
    Stop,
    /// Stop and surface this error
    GiveUp(Error),
}

/// Tracks consecutive failures and produces backoff delays
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    backoff: ExponentialBackoff,
    failures: u32,
    auth_rejections: u32,
}

impl ReconnectPolicy {
    /// Create a policy from configuration
    pub fn new(config: ReconnectConfig) -> Self {
        let backoff = ExponentialBackoff {
            current_interval: config.initial_delay,
            initial_interval: config.initial_delay,
            randomization_factor: config.jitter,
            multiplier: config.multiplier,
            max_interval: config.max_delay,
            max_elapsed_time: None,
            ..Default::default()
        };

        ReconnectPolicy {
            config,
            backoff,
            failures: 0,
            auth_rejections: 0,
        }
    }

    /// Consecutive failed attempts since the last live session
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Consecutive token rejections since the last live session
    pub fn auth_rejections(&self) -> u32 {
        self.auth_rejections
    }

    /// Forget past failures; called once a session is receiving
    pub fn reset(&mut self) {
        self.failures = 0;
        self.auth_rejections = 0;
        self.backoff.reset();
    }

    /// Decide after a connect attempt or a live session failed
    pub fn on_failure(&mut self, error: &ConnectionError) -> Verdict {
        if !self.config.enabled {
            return Verdict::GiveUp(error.clone().into());
        }

        self.failures += 1;
        if matches!(error, ConnectionError::AuthRejected(_)) {
            self.auth_rejections += 1;
            if self.auth_rejections > self.config.auth_retry_budget {
                return Verdict::GiveUp(error.clone().into());
            }
        } else {
            self.auth_rejections = 0;
        }

        if let Some(max) = self.config.max_attempts {
            if self.failures >= max {
                return Verdict::GiveUp(Error::RetriesExhausted {
                    attempts: self.failures,
                    last: error.to_string(),
                });
            }
        }

        Verdict::Retry(self.next_delay())
    }

    /// Decide after the gateway closed a live session
    pub fn on_closed(&mut self) -> Verdict {
        if !self.config.enabled {
            return Verdict::Stop;
        }
        Verdict::Retry(self.next_delay())
    }

    fn next_delay(&mut self) -> Duration {
        self.backoff.next_backoff().unwrap_or(self.config.max_delay)
    }
}

//! Reconnect policy for the broker transport
//!
//! A failed broker connection is not retried inline. The transport asks the
//! policy how long to wait after the n-th consecutive failure and skips
//! connect attempts until that much time has passed on its clock.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Delay before the next reconnect attempt
pub trait ReconnectPolicy: Send {
    /// `failures` counts consecutive failures and starts at 1
    fn delay(&self, failures: u32) -> Duration;
}

/// Exponential backoff with an upper bound
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CappedBackoff {
    pub initial: Duration,
    pub factor: f64,
    pub max_delay: Duration,
}

impl CappedBackoff {
    pub fn new(max_delay: Duration) -> Self {
        Self {
            initial: Duration::from_millis(150),
            factor: 1.7,
            max_delay,
        }
    }
}

impl Default for CappedBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_RETRY_MAX_DELAY_MS))
    }
}

impl ReconnectPolicy for CappedBackoff {
    fn delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(64) as i32;
        let millis = self.initial.as_millis() as f64 * self.factor.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Source of "now" for backoff bookkeeping
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
///
/// Pass a clone to `EmitterBuilder::clock` and call `advance` to step
/// through broker backoff windows without sleeping.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Consecutive-failure bookkeeping driven by a policy and a clock
pub struct Reconnect {
    policy: Box<dyn ReconnectPolicy>,
    clock: Box<dyn Clock>,
    failures: u32,
    next_attempt: Option<Instant>,
}

impl Reconnect {
    pub fn new(policy: Box<dyn ReconnectPolicy>, clock: Box<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            failures: 0,
            next_attempt: None,
        }
    }

    /// Whether a connect attempt is allowed now
    pub fn ready(&self) -> bool {
        match self.next_attempt {
            Some(at) => self.clock.now() >= at,
            None => true,
        }
    }

    /// Record a failure and return the wait before the next attempt
    pub fn record_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let delay = self.policy.delay(self.failures);
        self.next_attempt = Some(self.clock.now() + delay);
        delay
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.next_attempt = None;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

//! # Availability Monitor
//!
//! Owns the process-wide "is the database usable" signal.
//!
//! ```text
//!   Connecting ──ok──▶ Connected ──probe failures ≥ threshold──▶ Retrying
//!       │                  ▲                                        │
//!       │ err              └────────────────ok──────────────────────┤
//!       ▼                                                           │ err, budget left
//!   Retrying ──budget exhausted──▶ Exhausted (terminal)             ◀┘
//!
//!   (no database URL) ──▶ Unconfigured (terminal)
//! ```
//!
//! Externally only [`AvailabilityMonitor::is_available`] matters: it is a
//! single atomic load, true exactly in `Connected`. Only the monitor's own
//! retry loop writes the state; request handlers read it and never flip it,
//! so a single failed query cannot take the process into fallback mode.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::connector::Connector;
use crate::config::DatabaseConfig;
use crate::error::{MarketplaceError, MarketplaceResult};

/// Monitor state; only `Connected` reads as available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AvailabilityState {
    /// Process start, before the first attempt resolves
    Connecting = 0,
    Connected = 1,
    /// Waiting between attempts
    Retrying = 2,
    /// Retry budget spent; degraded mode until restart
    Exhausted = 3,
    /// No connection string configured; never tried
    Unconfigured = 4,
}

impl From<u8> for AvailabilityState {
    fn from(value: u8) -> Self {
        match value {
            1 => AvailabilityState::Connected,
            2 => AvailabilityState::Retrying,
            3 => AvailabilityState::Exhausted,
            4 => AvailabilityState::Unconfigured,
            _ => AvailabilityState::Connecting,
        }
    }
}

impl AvailabilityState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AvailabilityState::Exhausted | AvailabilityState::Unconfigured
        )
    }
}

/// Timing and retry budget for the monitor
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorPolicy {
    pub initial_delay: Duration,
    pub connect_timeout: Duration,
    /// Retries after the first failed attempt
    pub retry_limit: u32,
    pub retry_interval: Duration,
    pub backoff_multiplier: f64,
    pub max_retry_interval: Duration,
    pub health_check_interval: Option<Duration>,
    pub health_failure_threshold: u32,
}

impl MonitorPolicy {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            initial_delay: config.initial_delay(),
            connect_timeout: config.connect_timeout(),
            retry_limit: config.retry_limit,
            retry_interval: config.retry_interval(),
            backoff_multiplier: config.backoff_multiplier,
            max_retry_interval: config.max_retry_interval(),
            health_check_interval: config.health_check_interval(),
            health_failure_threshold: config.health_failure_threshold.max(1),
        }
    }

    /// Delay after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let seconds = self.retry_interval.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !seconds.is_finite() || seconds >= self.max_retry_interval.as_secs_f64() {
            self.max_retry_interval
        } else {
            Duration::from_secs_f64(seconds)
        }
    }
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

pub struct AvailabilityMonitor<C: Connector> {
    connector: C,
    policy: MonitorPolicy,
    state: AtomicU8,
    connection: RwLock<Option<C::Connection>>,
    attempts: AtomicU32,
    connections_established: AtomicU32,
}

impl<C: Connector> std::fmt::Debug for AvailabilityMonitor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityMonitor")
            .field("state", &self.state())
            .field("attempts", &self.attempts())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<C: Connector> AvailabilityMonitor<C> {
    pub fn new(connector: C, policy: MonitorPolicy) -> Arc<Self> {
        Arc::new(Self {
            connector,
            policy,
            state: AtomicU8::new(AvailabilityState::Connecting as u8),
            connection: RwLock::new(None),
            attempts: AtomicU32::new(0),
            connections_established: AtomicU32::new(0),
        })
    }

    /// Non-blocking snapshot of the availability signal
    #[inline]
    pub fn is_available(&self) -> bool {
        self.state() == AvailabilityState::Connected
    }

    #[inline]
    pub fn state(&self) -> AvailabilityState {
        AvailabilityState::from(self.state.load(Ordering::Acquire))
    }

    /// Connection handle, present only while the signal is true
    pub fn connection(&self) -> Option<C::Connection> {
        if !self.is_available() {
            return None;
        }
        self.connection.read().clone()
    }

    /// Total connection attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Number of unavailable → available transitions
    pub fn connections_established(&self) -> u32 {
        self.connections_established.load(Ordering::Acquire)
    }

    pub fn policy(&self) -> &MonitorPolicy {
        &self.policy
    }

    /// Start the monitor on its own task after the initial delay
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(monitor.policy.initial_delay).await;
            monitor.run().await;
        })
    }

    /// Connect with retries, then watch the connection until it is lost
    ///
    /// Returns once the monitor reaches a terminal state, or right after
    /// connecting when the health probe is disabled.
    pub async fn run(&self) {
        loop {
            if !self.establish().await {
                return;
            }
            if !self.watch().await {
                return;
            }
        }
    }

    async fn establish(&self) -> bool {
        if !self.connector.is_configured() {
            self.transition(AvailabilityState::Unconfigured);
            crate::log_availability!(
                info,
                "UNCONFIGURED",
                detail: "DATABASE_URL missing; serving every request from the fallback store"
            );
            return false;
        }

        let total_attempts = self.policy.retry_limit.saturating_add(1);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            self.attempts.fetch_add(1, Ordering::AcqRel);
            crate::log_availability!(debug, "CONNECT_ATTEMPT",
                attempt: attempt,
                max_attempts: total_attempts
            );

            match self.connect_once().await {
                Ok(connection) => {
                    *self.connection.write() = Some(connection);
                    self.connections_established.fetch_add(1, Ordering::AcqRel);
                    self.transition(AvailabilityState::Connected);
                    crate::log_availability!(info, "CONNECTED", attempt: attempt);
                    return true;
                }
                Err(error) if attempt >= total_attempts => {
                    self.transition(AvailabilityState::Exhausted);
                    crate::log_availability!(error, "RETRIES_EXHAUSTED",
                        attempts: attempt,
                        last_error: error.to_string()
                    );
                    return false;
                }
                Err(error) => {
                    self.transition(AvailabilityState::Retrying);
                    let delay = self.policy.delay_for(attempt);
                    crate::log_availability!(warn, "CONNECT_FAILED",
                        attempt: attempt,
                        retry_in_ms: delay.as_millis(),
                        error: error.to_string()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Returns true when the connection was declared lost
    async fn watch(&self) -> bool {
        let Some(interval) = self.policy.health_check_interval else {
            return false;
        };

        let mut consecutive_failures: u32 = 0;
        loop {
            tokio::time::sleep(interval).await;

            let Some(connection) = self.connection() else {
                return true;
            };

            let probe = tokio::time::timeout(
                self.policy.connect_timeout,
                self.connector.health_check(&connection),
            )
            .await
            .unwrap_or_else(|_| {
                Err(MarketplaceError::Connectivity(
                    "health probe timed out".to_string(),
                ))
            });

            match probe {
                Ok(()) => consecutive_failures = 0,
                Err(error) => {
                    consecutive_failures += 1;
                    crate::log_availability!(warn, "HEALTH_PROBE_FAILED",
                        consecutive_failures: consecutive_failures,
                        threshold: self.policy.health_failure_threshold,
                        error: error.to_string()
                    );
                    if consecutive_failures >= self.policy.health_failure_threshold {
                        self.transition(AvailabilityState::Retrying);
                        self.connection.write().take();
                        crate::log_availability!(error, "CONNECTION_LOST",
                            consecutive_failures: consecutive_failures
                        );
                        return true;
                    }
                }
            }
        }
    }

    async fn connect_once(&self) -> MarketplaceResult<C::Connection> {
        match tokio::time::timeout(self.policy.connect_timeout, self.connector.connect()).await {
            Ok(result) => result,
            Err(_) => Err(MarketplaceError::Connectivity(format!(
                "connection attempt timed out after {}ms",
                self.policy.connect_timeout.as_millis()
            ))),
        }
    }

    fn transition(&self, next: AvailabilityState) {
        let previous = AvailabilityState::from(self.state.swap(next as u8, Ordering::AcqRel));
        if previous != next {
            crate::log_availability!(debug, "STATE_TRANSITION",
                from: previous,
                to: next
            );
        }
    }
}

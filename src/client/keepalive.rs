// ABOUTME: Caller-driven enquire_link schedule for long-lived sessions
// ABOUTME: Tracks when the next probe is due and how many probes failed in a row

use crate::client::types::SessionConfiguration;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Keep-alive settings.
///
/// The session never probes on its own; pass a [`KeepAliveManager`] built
/// from this to `Session::maintain_keep_alive` from your own loop.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Interval between enquire_link PDUs (default: 30 seconds)
    pub interval: Duration,

    /// Timeout for each enquire_link_resp (default: 10 seconds)
    pub timeout: Duration,

    /// Consecutive failures before the link is considered dead (default: 3)
    pub max_failures: u32,

    pub enabled: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: SessionConfiguration::DEFAULT_ENQUIRE_LINK_INTERVAL,
            timeout: SessionConfiguration::DEFAULT_REQUEST_TIMEOUT,
            max_failures: 3,
            enabled: true,
        }
    }
}

impl KeepAliveConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures;
        self
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Uses the session's enquire_link interval and request timeout
impl From<&SessionConfiguration> for KeepAliveConfig {
    fn from(config: &SessionConfiguration) -> Self {
        Self::new(config.enquire_link_interval).with_timeout(config.request_timeout)
    }
}

/// Snapshot of keep-alive counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAliveStatus {
    pub running: bool,
    pub consecutive_failures: u32,
    /// enquire_link PDUs sent
    pub total_pings: u32,
    /// Successful enquire_link_resp PDUs received
    pub total_pongs: u32,
}

/// Decides when an enquire_link is due and keeps failure counts.
///
/// 1. `should_ping()` says whether a probe is due
/// 2. the caller sends it and calls `on_ping_sent()`
/// 3. then `on_ping_success()` or `on_ping_failure()` with the outcome
///
/// `Session::maintain_keep_alive` runs these steps for you.
#[derive(Debug)]
pub struct KeepAliveManager {
    config: KeepAliveConfig,
    last_ping: Option<Instant>,
    consecutive_failures: u32,
    total_pings: u32,
    total_pongs: u32,
    enabled: bool,
}

impl KeepAliveManager {
    pub fn new(config: KeepAliveConfig) -> Self {
        Self {
            enabled: config.enabled,
            config,
            last_ping: None,
            consecutive_failures: 0,
            total_pings: 0,
            total_pongs: 0,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// True when enabled, under the failure limit and the interval has passed
    pub fn should_ping(&self) -> bool {
        if !self.enabled {
            return false;
        }

        if self.is_connection_failed() {
            debug!("Max failures reached, not sending more pings");
            return false;
        }

        match self.last_ping {
            None => true,
            Some(last) => last.elapsed() >= self.config.interval,
        }
    }

    pub fn on_ping_sent(&mut self) {
        self.last_ping = Some(Instant::now());
        self.total_pings += 1;
        debug!(total_pings = self.total_pings, "enquire_link sent");
    }

    pub fn on_ping_success(&mut self) {
        self.consecutive_failures = 0;
        self.total_pongs += 1;
        debug!(total_pongs = self.total_pongs, "enquire_link answered");
    }

    pub fn on_ping_failure(&mut self) {
        self.consecutive_failures += 1;
        warn!(
            consecutive_failures = self.consecutive_failures,
            "enquire_link failed"
        );
    }

    /// Forget earlier failures, e.g. after other traffic succeeded
    pub fn reset_failures(&mut self) {
        if self.consecutive_failures > 0 {
            debug!(
                consecutive_failures = self.consecutive_failures,
                "resetting keep-alive failures"
            );
            self.consecutive_failures = 0;
        }
    }

    pub fn is_connection_failed(&self) -> bool {
        self.consecutive_failures >= self.config.max_failures
    }

    pub fn status(&self) -> KeepAliveStatus {
        KeepAliveStatus {
            running: self.enabled,
            consecutive_failures: self.consecutive_failures,
            total_pings: self.total_pings,
            total_pongs: self.total_pongs,
        }
    }

    pub fn is_running(&self) -> bool {
        self.enabled
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }
}

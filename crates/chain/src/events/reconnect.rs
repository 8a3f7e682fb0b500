//! Reconnect backoff and heartbeat watchdog — §4.1 "Failure semantics".
//!
//! "A hard WebSocket close triggers reconnect with exponential backoff and a
//! heartbeat watchdog (default 15s) that forces reconnect if no message
//! arrives in 2×heartbeat." Built on the same backoff shape as the §4.7 RPC
//! client's retry (`rpc::retry::backoff_with_jitter`) rather than a second,
//! slightly-different implementation.

use std::time::{Duration, Instant};

use crate::rpc::{backoff_with_jitter, BackoffConfig, JitterSource};

/// Tracks time-since-last-message for a single subscription and reports
/// whether the subscriber should be considered unhealthy (no message within
/// `2 * heartbeat`).
pub struct HeartbeatWatchdog {
    heartbeat: Duration,
    last_message: parking_lot::Mutex<Instant>,
}

impl HeartbeatWatchdog {
    pub fn new(heartbeat: Duration) -> Self {
        Self { heartbeat, last_message: parking_lot::Mutex::new(Instant::now()) }
    }

    pub fn default_15s() -> Self {
        Self::new(Duration::from_secs(15))
    }

    /// Record that a message (block, log, or any keepalive frame) arrived.
    pub fn touch(&self) {
        *self.last_message.lock() = Instant::now();
    }

    pub fn age(&self) -> Duration {
        self.last_message.lock().elapsed()
    }

    /// True once no message has arrived for `2 * heartbeat` — the subscriber
    /// should be torn down and reconnected.
    pub fn is_stale(&self) -> bool {
        self.age() >= self.heartbeat * 2
    }
}

/// Exponential reconnect backoff, capped, with jitter — reuses the §4.7 RPC
/// client's backoff formula (`min(base*2^attempt, max) + rand(0..base)`)
/// rather than inventing a second schedule for the same purpose.
pub struct ReconnectBackoff {
    config: BackoffConfig,
    jitter: JitterSource,
    attempt: u32,
}

impl ReconnectBackoff {
    pub fn new(max_backoff: Duration) -> Self {
        Self {
            config: BackoffConfig {
                base: Duration::from_millis(250),
                max_backoff,
                max_attempts: u32::MAX,
            },
            jitter: JitterSource::default(),
            attempt: 0,
        }
    }

    /// Pyth/Chainlink reconnect backoff is capped at 60s per §5 "Timeouts".
    pub fn capped_at_60s() -> Self {
        Self::new(Duration::from_secs(60))
    }

    /// Delay before the next reconnect attempt; advances the internal
    /// attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = backoff_with_jitter(&self.config, self.attempt, &self.jitter);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Reset after a successful (re)connection, so the next failure starts
    /// from the base delay again instead of continuing to escalate.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watchdog_is_not_stale_immediately_after_touch() {
        let wd = HeartbeatWatchdog::new(Duration::from_millis(10));
        wd.touch();
        assert!(!wd.is_stale());
    }

    #[test]
    fn watchdog_becomes_stale_after_two_heartbeats() {
        let wd = HeartbeatWatchdog::new(Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(15));
        assert!(wd.is_stale());
    }

    #[test]
    fn reconnect_backoff_grows_then_caps() {
        let mut backoff = ReconnectBackoff::new(Duration::from_millis(100));
        let d0 = backoff.next_delay();
        let d1 = backoff.next_delay();
        let d2 = backoff.next_delay();
        assert!(d0 <= d1 + Duration::from_millis(1) || d1 >= d0);
        // after enough attempts the delay should be capped near max_backoff
        for _ in 0..10 {
            backoff.next_delay();
        }
        let capped = backoff.next_delay();
        assert!(capped <= Duration::from_millis(100) + Duration::from_millis(250));
        let _ = d2;
    }

    #[test]
    fn reset_restarts_the_escalation() {
        let mut backoff = ReconnectBackoff::new(Duration::from_secs(60));
        for _ in 0..5 {
            backoff.next_delay();
        }
        backoff.reset();
        assert_eq!(backoff.attempt, 0);
    }
}

//! Run-level stall watchdog — §4.3's "if no resolution cycle completes within
//! `stallTimeoutMs`, the run is considered stalled" signal for the caller to
//! act on (reconnect providers, raise an alert, restart the loop).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct StallWatchdog {
    stall_timeout: Duration,
    last_success_epoch_ms: AtomicU64,
    started_at: Instant,
}

impl StallWatchdog {
    pub fn new(stall_timeout: Duration) -> Self {
        Self {
            stall_timeout,
            last_success_epoch_ms: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn record_success(&self) {
        let elapsed_ms = self.started_at.elapsed().as_millis() as u64;
        self.last_success_epoch_ms.store(elapsed_ms, Ordering::Relaxed);
    }

    /// True once `stall_timeout` has elapsed since the last recorded success
    /// (or since construction, if no cycle has ever succeeded).
    pub fn is_stalled(&self) -> bool {
        let last = self.last_success_epoch_ms.load(Ordering::Relaxed);
        let now = self.started_at.elapsed().as_millis() as u64;
        now.saturating_sub(last) >= self.stall_timeout.as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_stalled_immediately_after_success() {
        let w = StallWatchdog::new(Duration::from_secs(10));
        w.record_success();
        assert!(!w.is_stalled());
    }

    #[test]
    fn stalled_with_zero_timeout() {
        let w = StallWatchdog::new(Duration::from_millis(0));
        assert!(w.is_stalled());
    }
}

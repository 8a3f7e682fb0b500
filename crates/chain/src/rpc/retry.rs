//! Exponential backoff for transient RPC errors — §4.7.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub base: Duration,
    pub max_backoff: Duration,
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
            max_attempts: 5,
        }
    }
}

/// `min(base * 2^attempt, maxBackoff)`, attempt 0-indexed.
pub fn exp_backoff(base: Duration, max_backoff: Duration, attempt: u32) -> Duration {
    let multiplier = 2f64.powi(attempt.min(62) as i32);
    let scaled = base.as_secs_f64() * multiplier;
    Duration::from_secs_f64(scaled.min(max_backoff.as_secs_f64()))
}

/// Small process-local xorshift generator for jitter; not cryptographic,
/// just needs to spread retries apart across a thundering herd.
pub struct JitterSource(AtomicU64);

impl JitterSource {
    pub fn new(seed: u64) -> Self {
        Self(AtomicU64::new(seed | 1))
    }

    /// Uniform fraction in `[0.0, 1.0)`.
    pub fn next_fraction(&self) -> f64 {
        let mut x = self.0.load(Ordering::Relaxed);
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0.store(x, Ordering::Relaxed);
        (x % 1_000_000) as f64 / 1_000_000.0
    }
}

impl Default for JitterSource {
    fn default() -> Self {
        Self::new(0x2545F4914F6CDD1D)
    }
}

/// `min(base*2^attempt, maxBackoff) + rand(0..base)`.
pub fn backoff_with_jitter(config: &BackoffConfig, attempt: u32, jitter: &JitterSource) -> Duration {
    let backoff = exp_backoff(config.base, config.max_backoff, attempt);
    let extra = Duration::from_secs_f64(config.base.as_secs_f64() * jitter.next_fraction());
    backoff + extra
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_each_attempt_until_capped() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(1_000);
        assert_eq!(exp_backoff(base, max, 0), Duration::from_millis(100));
        assert_eq!(exp_backoff(base, max, 1), Duration::from_millis(200));
        assert_eq!(exp_backoff(base, max, 2), Duration::from_millis(400));
        assert_eq!(exp_backoff(base, max, 10), max);
    }

    #[test]
    fn jitter_adds_between_zero_and_base() {
        let config = BackoffConfig {
            base: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            max_attempts: 5,
        };
        let jitter = JitterSource::new(42);
        for attempt in 0..5 {
            let d = backoff_with_jitter(&config, attempt, &jitter);
            let floor = exp_backoff(config.base, config.max_backoff, attempt);
            assert!(d >= floor);
            assert!(d < floor + config.base);
        }
    }
}

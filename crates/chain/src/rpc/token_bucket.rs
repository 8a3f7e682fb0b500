//! Token-bucket rate limiter for outbound RPC calls — §4.7.
//!
//! Waiters are served strictly FIFO via a ticket counter: a waiter only takes
//! tokens once every ticket issued before it has been served, which keeps the
//! bucket fair under contention instead of letting a late arrival with a
//! lucky poll jump the queue.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy)]
pub struct TokenBucketConfig {
    pub capacity: f64,
    pub refill_rate_per_sec: f64,
    pub min_spacing: Duration,
    pub jitter: Duration,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self {
            capacity: 50.0,
            refill_rate_per_sec: 25.0,
            min_spacing: Duration::from_millis(0),
            jitter: Duration::from_millis(0),
        }
    }
}

struct Inner {
    tokens: f64,
    last_refill: Instant,
    last_acquire: Option<Instant>,
    next_ticket: u64,
    now_serving: u64,
}

pub struct TokenBucket {
    config: TokenBucketConfig,
    inner: Mutex<Inner>,
    notify: Notify,
    jitter_state: AtomicU64,
}

impl TokenBucket {
    pub fn new(config: TokenBucketConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                tokens: config.capacity,
                last_refill: Instant::now(),
                last_acquire: None,
                next_ticket: 0,
                now_serving: 0,
            }),
            notify: Notify::new(),
            jitter_state: AtomicU64::new(0x9E3779B97F4A7C15),
        }
    }

    fn refill(&self, inner: &mut Inner, now: Instant) {
        let elapsed = now.saturating_duration_since(inner.last_refill).as_secs_f64();
        inner.tokens = (inner.tokens + elapsed * self.config.refill_rate_per_sec).min(self.config.capacity);
        inner.last_refill = now;
    }

    /// Snapshot the current token count, after refilling for elapsed time.
    /// Never exceeds `capacity`.
    pub fn tokens_available(&self) -> f64 {
        let mut inner = self.inner.lock();
        self.refill(&mut inner, Instant::now());
        inner.tokens
    }

    fn jitter(&self) -> Duration {
        if self.config.jitter.is_zero() {
            return Duration::ZERO;
        }
        // xorshift64 — fast, deterministic-per-process, good enough for spacing jitter.
        let mut x = self.jitter_state.load(Ordering::Relaxed);
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.jitter_state.store(x, Ordering::Relaxed);
        let frac = (x % 1_000_000) as f64 / 1_000_000.0;
        Duration::from_secs_f64(self.config.jitter.as_secs_f64() * frac)
    }

    /// Blocks (asynchronously) until `n` tokens are available and the
    /// minimum spacing since the last grant has elapsed.
    pub async fn acquire(&self, n: f64) {
        let ticket = {
            let mut inner = self.inner.lock();
            let t = inner.next_ticket;
            inner.next_ticket += 1;
            t
        };

        loop {
            let wait = {
                let mut inner = self.inner.lock();
                if ticket != inner.now_serving {
                    None
                } else {
                    let now = Instant::now();
                    self.refill(&mut inner, now);
                    let spacing_remaining = inner
                        .last_acquire
                        .map(|last| self.config.min_spacing.saturating_sub(now.saturating_duration_since(last)))
                        .unwrap_or(Duration::ZERO);
                    if inner.tokens >= n && spacing_remaining.is_zero() {
                        inner.tokens -= n;
                        inner.last_acquire = Some(now);
                        inner.now_serving += 1;
                        self.notify.notify_waiters();
                        return;
                    }
                    let deficit = (n - inner.tokens).max(0.0);
                    let refill_wait = Duration::from_secs_f64(deficit / self.config.refill_rate_per_sec);
                    Some(refill_wait.max(spacing_remaining))
                }
            };
            match wait {
                Some(d) => tokio::time::sleep(d + self.jitter()).await,
                None => {
                    let _ = tokio::time::timeout(Duration::from_millis(50), self.notify.notified()).await;
                }
            }
        }
    }

    /// Non-blocking variant: succeeds only if `n` tokens and spacing are
    /// satisfied right now, bypassing the FIFO ticket queue.
    pub fn try_acquire(&self, n: f64) -> bool {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        self.refill(&mut inner, now);
        let spacing_ok = inner
            .last_acquire
            .map_or(true, |last| now.saturating_duration_since(last) >= self.config.min_spacing);
        if inner.tokens >= n && spacing_ok {
            inner.tokens -= n;
            inner.last_acquire = Some(now);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_acquire_drains_capacity_then_refuses() {
        let bucket = TokenBucket::new(TokenBucketConfig {
            capacity: 2.0,
            refill_rate_per_sec: 0.0,
            min_spacing: Duration::ZERO,
            jitter: Duration::ZERO,
        });
        assert!(bucket.try_acquire(1.0));
        assert!(bucket.try_acquire(1.0));
        assert!(!bucket.try_acquire(1.0));
    }

    #[test]
    fn never_exceeds_capacity_even_after_long_idle() {
        let bucket = TokenBucket::new(TokenBucketConfig {
            capacity: 10.0,
            refill_rate_per_sec: 1_000_000.0,
            min_spacing: Duration::ZERO,
            jitter: Duration::ZERO,
        });
        std::thread::sleep(Duration::from_millis(5));
        assert!(bucket.tokens_available() <= 10.0);
    }

    #[tokio::test]
    async fn acquire_waits_for_refill_then_succeeds() {
        let bucket = TokenBucket::new(TokenBucketConfig {
            capacity: 1.0,
            refill_rate_per_sec: 100.0,
            min_spacing: Duration::ZERO,
            jitter: Duration::ZERO,
        });
        assert!(bucket.try_acquire(1.0));
        let start = Instant::now();
        bucket.acquire(1.0).await;
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[tokio::test]
    async fn acquire_respects_min_spacing() {
        let bucket = TokenBucket::new(TokenBucketConfig {
            capacity: 100.0,
            refill_rate_per_sec: 1_000.0,
            min_spacing: Duration::from_millis(20),
            jitter: Duration::ZERO,
        });
        bucket.acquire(1.0).await;
        let start = Instant::now();
        bucket.acquire(1.0).await;
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[tokio::test]
    async fn concurrent_waiters_all_eventually_acquire() {
        let bucket = std::sync::Arc::new(TokenBucket::new(TokenBucketConfig {
            capacity: 1.0,
            refill_rate_per_sec: 500.0,
            min_spacing: Duration::ZERO,
            jitter: Duration::ZERO,
        }));
        let mut handles = Vec::new();
        for _ in 0..5 {
            let bucket = bucket.clone();
            handles.push(tokio::spawn(async move {
                bucket.acquire(1.0).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        // all five waiters were granted a token without deadlock or panic.
    }
}

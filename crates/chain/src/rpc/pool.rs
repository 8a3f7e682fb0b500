//! Provider pool: round-robin rotation with per-provider cooldown — §4.7.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::error::ChainError;

struct Slot {
    url: String,
    cooldown_until: Mutex<Option<Instant>>,
}

pub struct ProviderPool {
    slots: Vec<Slot>,
    cursor: AtomicUsize,
    default_cooldown: Duration,
}

impl ProviderPool {
    pub fn new(urls: Vec<String>, default_cooldown: Duration) -> Self {
        assert!(!urls.is_empty(), "provider pool requires at least one url");
        Self {
            slots: urls
                .into_iter()
                .map(|url| Slot { url, cooldown_until: Mutex::new(None) })
                .collect(),
            cursor: AtomicUsize::new(0),
            default_cooldown,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Scan starting at the rotating cursor, skipping cooling-down providers.
    /// Errors with `ProviderDestroyed` if every provider is cooling down.
    pub fn next_available(&self, now: Instant) -> Result<String, ChainError> {
        let len = self.slots.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % len;
        for offset in 0..len {
            let idx = (start + offset) % len;
            let slot = &self.slots[idx];
            let cooling = slot.cooldown_until.lock().is_some_and(|until| until > now);
            if !cooling {
                return Ok(slot.url.clone());
            }
        }
        Err(ChainError::ProviderDestroyed)
    }

    /// Place the provider matching `url` into cooldown for `duration` (or the
    /// pool's default if `None`).
    pub fn cooldown(&self, url: &str, duration: Option<Duration>, now: Instant) {
        if let Some(slot) = self.slots.iter().find(|s| s.url == url) {
            *slot.cooldown_until.lock() = Some(now + duration.unwrap_or(self.default_cooldown));
        }
    }

    pub fn is_cooling_down(&self, url: &str, now: Instant) -> bool {
        self.slots
            .iter()
            .find(|s| s.url == url)
            .is_some_and(|s| s.cooldown_until.lock().is_some_and(|until| until > now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> ProviderPool {
        ProviderPool::new(
            vec!["https://a.example".into(), "https://b.example".into()],
            Duration::from_secs(30),
        )
    }

    #[test]
    fn rotates_round_robin_across_calls() {
        let pool = pool();
        let now = Instant::now();
        let first = pool.next_available(now).unwrap();
        let second = pool.next_available(now).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn skips_cooling_down_provider() {
        let pool = pool();
        let now = Instant::now();
        pool.cooldown("https://a.example", None, now);
        for _ in 0..4 {
            assert_eq!(pool.next_available(now).unwrap(), "https://b.example");
        }
    }

    #[test]
    fn all_cooling_down_returns_provider_destroyed() {
        let pool = pool();
        let now = Instant::now();
        pool.cooldown("https://a.example", None, now);
        pool.cooldown("https://b.example", None, now);
        assert_eq!(pool.next_available(now), Err(ChainError::ProviderDestroyed));
    }

    #[test]
    fn cooldown_expires_after_duration() {
        let pool = pool();
        let now = Instant::now();
        pool.cooldown("https://a.example", Some(Duration::from_secs(1)), now);
        assert!(pool.is_cooling_down("https://a.example", now));
        assert!(!pool.is_cooling_down("https://a.example", now + Duration::from_secs(2)));
    }
}

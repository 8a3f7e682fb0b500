//! Scan registry — §4.6: prevents duplicate concurrent scans and
//! immediate re-scans across triggers.
//!
//! Key shape: `triggerType:normalized(symbolOrReserve):bBLOCK:reasonHash`,
//! built by [`scan_key`].

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Normalize the symbol/reserve component of a scan key: the first 12
/// characters if it looks like a `0x`-prefixed address, lowercase otherwise.
pub fn normalize_symbol_or_reserve(raw: &str) -> String {
    if raw.starts_with("0x") || raw.starts_with("0X") {
        raw.chars().take(12).collect::<String>().to_lowercase()
    } else {
        raw.to_lowercase()
    }
}

pub fn scan_key(trigger_type: &str, symbol_or_reserve: &str, block: u64, reason_hash: &str) -> String {
    format!(
        "{trigger_type}:{}:b{block}:{reason_hash}",
        normalize_symbol_or_reserve(symbol_or_reserve)
    )
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    start_time_ms: u64,
    ttl_ms: u64,
}

impl Entry {
    fn expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.start_time_ms) >= self.ttl_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    InFlight,
    RecentlyCompleted,
}

#[derive(Debug, Clone)]
pub struct ScanRegistryConfig {
    pub ttl_ms: u64,
    pub max_recently_completed: usize,
}

impl ScanRegistryConfig {
    /// `ttl = max(2 * avg_block_time_ms, 10s)`, per §4.6.
    pub fn from_avg_block_time(avg_block_time_ms: u64) -> Self {
        Self {
            ttl_ms: (2 * avg_block_time_ms).max(10_000),
            max_recently_completed: 1_000,
        }
    }
}

impl Default for ScanRegistryConfig {
    fn default() -> Self {
        Self::from_avg_block_time(2_000)
    }
}

/// Tracks in-flight scans and an LRU-bounded set of recently-completed ones,
/// suppressing duplicate acquisitions for the same key within TTL.
pub struct ScanRegistry {
    config: ScanRegistryConfig,
    in_flight: DashMap<String, Entry>,
    recently_completed: DashMap<String, Entry>,
    completed_order: Mutex<VecDeque<String>>,
    suppressed_in_flight_total: AtomicU64,
    suppressed_recently_completed_total: AtomicU64,
}

impl ScanRegistry {
    pub fn new(config: ScanRegistryConfig) -> Self {
        Self {
            config,
            in_flight: DashMap::new(),
            recently_completed: DashMap::new(),
            completed_order: Mutex::new(VecDeque::new()),
            suppressed_in_flight_total: AtomicU64::new(0),
            suppressed_recently_completed_total: AtomicU64::new(0),
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis((self.config.ttl_ms / 2).max(5_000))
    }

    pub fn suppressed_in_flight_total(&self) -> u64 {
        self.suppressed_in_flight_total.load(Ordering::Relaxed)
    }

    pub fn suppressed_recently_completed_total(&self) -> u64 {
        self.suppressed_recently_completed_total.load(Ordering::Relaxed)
    }

    /// Returns `Ok(())` if the scan may proceed, or the suppression reason.
    pub fn acquire(&self, key: &str, now_ms: u64) -> Result<(), SuppressReason> {
        if let Some(entry) = self.in_flight.get(key) {
            if !entry.expired(now_ms) {
                self.suppressed_in_flight_total.fetch_add(1, Ordering::Relaxed);
                return Err(SuppressReason::InFlight);
            }
        }
        if let Some(entry) = self.recently_completed.get(key) {
            if !entry.expired(now_ms) {
                self.suppressed_recently_completed_total.fetch_add(1, Ordering::Relaxed);
                return Err(SuppressReason::RecentlyCompleted);
            }
        }
        self.in_flight.insert(
            key.to_string(),
            Entry {
                start_time_ms: now_ms,
                ttl_ms: self.config.ttl_ms,
            },
        );
        Ok(())
    }

    /// Move a key from in-flight to recently-completed, evicting the oldest
    /// recently-completed entry if the LRU bound is exceeded.
    pub fn release(&self, key: &str, now_ms: u64) {
        self.in_flight.remove(key);
        self.recently_completed.insert(
            key.to_string(),
            Entry {
                start_time_ms: now_ms,
                ttl_ms: self.config.ttl_ms,
            },
        );
        let mut order = self.completed_order.lock().unwrap();
        order.push_back(key.to_string());
        while order.len() > self.config.max_recently_completed {
            if let Some(oldest) = order.pop_front() {
                self.recently_completed.remove(&oldest);
            }
        }
    }

    /// Periodic sweep: drop any in-flight or recently-completed entry whose
    /// TTL has elapsed.
    pub fn cleanup_expired(&self, now_ms: u64) {
        self.in_flight.retain(|_, e| !e.expired(now_ms));
        self.recently_completed.retain(|_, e| !e.expired(now_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_addresses_to_first_12_chars_lowercase() {
        assert_eq!(normalize_symbol_or_reserve("0xABCDEF0123456789"), "0xabcdef0123");
    }

    #[test]
    fn normalizes_symbols_to_lowercase() {
        assert_eq!(normalize_symbol_or_reserve("USDC"), "usdc");
    }

    #[test]
    fn acquire_then_acquire_again_is_suppressed_in_flight() {
        let reg = ScanRegistry::new(ScanRegistryConfig::default());
        assert!(reg.acquire("k1", 0).is_ok());
        assert_eq!(reg.acquire("k1", 1), Err(SuppressReason::InFlight));
    }

    #[test]
    fn release_then_reacquire_within_ttl_is_suppressed_recently_completed() {
        let cfg = ScanRegistryConfig { ttl_ms: 10_000, max_recently_completed: 1_000 };
        let reg = ScanRegistry::new(cfg);
        reg.acquire("k1", 0).unwrap();
        reg.release("k1", 100);
        assert_eq!(reg.acquire("k1", 200), Err(SuppressReason::RecentlyCompleted));
    }

    #[test]
    fn reacquire_after_ttl_expiry_succeeds() {
        let cfg = ScanRegistryConfig { ttl_ms: 100, max_recently_completed: 1_000 };
        let reg = ScanRegistry::new(cfg);
        reg.acquire("k1", 0).unwrap();
        reg.release("k1", 0);
        assert!(reg.acquire("k1", 1_000).is_ok());
    }

    #[test]
    fn recently_completed_is_lru_bounded() {
        let cfg = ScanRegistryConfig { ttl_ms: 1_000_000, max_recently_completed: 2 };
        let reg = ScanRegistry::new(cfg);
        for i in 0..3 {
            let key = format!("k{i}");
            reg.acquire(&key, 0).unwrap();
            reg.release(&key, 0);
        }
        // k0 should have been evicted; k1 and k2 remain suppressible.
        assert!(reg.acquire("k0", 1).is_ok());
        assert_eq!(reg.acquire("k2", 1), Err(SuppressReason::RecentlyCompleted));
    }

    #[test]
    fn ttl_from_avg_block_time_has_ten_second_floor() {
        let cfg = ScanRegistryConfig::from_avg_block_time(100);
        assert_eq!(cfg.ttl_ms, 10_000);
        let cfg = ScanRegistryConfig::from_avg_block_time(10_000);
        assert_eq!(cfg.ttl_ms, 20_000);
    }
}

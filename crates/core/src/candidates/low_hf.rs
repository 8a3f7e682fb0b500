//! Low-HF tracker: a capacity-bounded record of borrowers that have ever been
//! seen close to liquidation, independent of the main candidate store's
//! tiering (§4.2, "trackers built on top of the store").

use alloy::primitives::Address;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowHfMode {
    /// Keep every distinct address ever observed below the threshold, evicting
    /// the oldest insertion (FIFO) once capacity is reached.
    All,
    /// Keep the `capacity` addresses with the lowest sticky-minimum HF ever
    /// observed, evicting the highest sticky-minimum entry on overflow.
    Min,
}

#[derive(Debug, Clone)]
pub struct LowHfEntry {
    pub address: Address,
    /// Lowest HF ever observed for this address (sticky: never increases).
    pub min_hf: f64,
    pub last_hf: f64,
    pub first_seen_block: u64,
    pub last_seen_block: u64,
}

pub struct LowHfTracker {
    mode: LowHfMode,
    capacity: usize,
    threshold_hf: f64,
    entries: DashMap<Address, LowHfEntry>,
    insertion_order: Mutex<VecDeque<Address>>,
}

impl LowHfTracker {
    pub fn new(mode: LowHfMode, capacity: usize, threshold_hf: f64) -> Self {
        Self {
            mode,
            capacity,
            threshold_hf,
            entries: DashMap::new(),
            insertion_order: Mutex::new(VecDeque::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, address: &Address) -> Option<LowHfEntry> {
        self.entries.get(address).map(|e| e.clone())
    }

    /// Record an HF observation. A no-op if `hf` is above the tracking
    /// threshold and the address has no existing entry.
    pub fn observe(&self, address: Address, hf: f64, block: u64) {
        if let Some(mut entry) = self.entries.get_mut(&address) {
            entry.last_hf = hf;
            entry.last_seen_block = block;
            if hf < entry.min_hf {
                entry.min_hf = hf;
            }
            return;
        }
        if hf > self.threshold_hf {
            return;
        }
        if self.entries.len() >= self.capacity && !self.evict_one() {
            return;
        }
        self.entries.insert(
            address,
            LowHfEntry {
                address,
                min_hf: hf,
                last_hf: hf,
                first_seen_block: block,
                last_seen_block: block,
            },
        );
        if self.mode == LowHfMode::All {
            self.insertion_order.lock().push_back(address);
        }
    }

    pub fn addresses_below(&self, hf_ceiling: f64) -> Vec<Address> {
        self.entries
            .iter()
            .filter(|e| e.last_hf <= hf_ceiling)
            .map(|e| e.address)
            .collect()
    }

    fn evict_one(&self) -> bool {
        match self.mode {
            LowHfMode::All => {
                let mut order = self.insertion_order.lock();
                while let Some(oldest) = order.pop_front() {
                    if self.entries.remove(&oldest).is_some() {
                        return true;
                    }
                }
                false
            }
            LowHfMode::Min => {
                let worst = self
                    .entries
                    .iter()
                    .map(|e| (e.address, e.min_hf))
                    .max_by(|a, b| a.1.total_cmp(&b.1));
                match worst {
                    Some((addr, _)) => self.entries.remove(&addr).is_some(),
                    None => false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    #[test]
    fn observes_only_below_threshold() {
        let t = LowHfTracker::new(LowHfMode::All, 10, 1.03);
        t.observe(addr(1), 2.0, 1);
        assert!(t.is_empty());
        t.observe(addr(1), 1.0, 1);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn min_is_sticky_across_observations() {
        let t = LowHfTracker::new(LowHfMode::All, 10, 1.03);
        t.observe(addr(1), 1.0, 1);
        t.observe(addr(1), 1.02, 2);
        let e = t.get(&addr(1)).unwrap();
        assert_eq!(e.min_hf, 1.0);
        assert_eq!(e.last_hf, 1.02);
    }

    #[test]
    fn all_mode_evicts_fifo_on_overflow() {
        let t = LowHfTracker::new(LowHfMode::All, 2, 1.03);
        t.observe(addr(1), 1.0, 1);
        t.observe(addr(2), 1.0, 2);
        t.observe(addr(3), 1.0, 3);
        assert_eq!(t.len(), 2);
        assert!(t.get(&addr(1)).is_none());
        assert!(t.get(&addr(3)).is_some());
    }

    #[test]
    fn min_mode_evicts_highest_sticky_minimum_on_overflow() {
        let t = LowHfTracker::new(LowHfMode::Min, 2, 1.03);
        t.observe(addr(1), 0.5, 1);
        t.observe(addr(2), 1.0, 1);
        t.observe(addr(3), 0.9, 1); // should evict addr(2), the highest min_hf
        assert_eq!(t.len(), 2);
        assert!(t.get(&addr(2)).is_none());
        assert!(t.get(&addr(1)).is_some());
        assert!(t.get(&addr(3)).is_some());
    }
}

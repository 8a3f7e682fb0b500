//! The bounded, tiered candidate store — §3 `Candidate` entity, §4.2 add/evict/
//! transition rules.

use alloy::primitives::Address;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// HF-band classification. Invariant: a candidate is never simultaneously in
/// `Hot` and `Cold` — the store holds exactly one `Tier` per address at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Hot,
    Warm,
    Cold,
}

/// What caused this address to be tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateOrigin {
    Event,
    Head,
    Backfill,
    Priority,
    Predictive,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub address: Address,
    pub last_hf: f64,
    pub last_updated_block: u64,
    pub last_updated_ms: u64,
    pub dirty: bool,
    pub tier: Tier,
    pub source: CandidateOrigin,
    /// Last known total debt in USD, as reported by the priority sweep or a
    /// profit-engine simulation. `0.0` until one of those has run for this
    /// address; the predictive gate's `minDebtUsd` check (§4.4) treats that
    /// as "unknown, reject" rather than "free pass".
    pub last_debt_usd: f64,
    /// Consecutive HF resolutions that stayed above the hot band while the
    /// candidate is still classified `Hot` — demotion out of `Hot` requires
    /// two of these in a row (§4.2 hysteresis rule).
    consecutive_above_band: u8,
}

#[derive(Debug, Clone)]
pub struct CandidateStoreConfig {
    pub candidate_max: usize,
    pub hotlist_max: usize,
    pub hotlist_max_hf: f64,
    pub warm_max_hf: f64,
    pub hysteresis_bps: u32,
}

impl Default for CandidateStoreConfig {
    fn default() -> Self {
        Self {
            candidate_max: 50_000,
            hotlist_max: 2_000,
            hotlist_max_hf: 1.05,
            warm_max_hf: 1.15,
            hysteresis_bps: 200, // 2%
        }
    }
}

/// Bounded, tiered candidate set.
///
/// Membership is tracked in `by_address` (the source of truth) plus three
/// `DashSet`s mirroring `Tier` for O(tier size) eviction scans instead of a
/// full-store scan — the same trade the reference repo makes with its
/// critical-tier `ArrayVec` plus separate hot/warm/cold `DashMap`s, generalized
/// here to all three tiers sharing one bound instead of only the critical one.
pub struct CandidateStore {
    config: CandidateStoreConfig,
    by_address: DashMap<Address, Candidate>,
    hot: DashSet<Address>,
    warm: DashSet<Address>,
    cold: DashSet<Address>,
    evictions_total: AtomicU64,
}

impl CandidateStore {
    pub fn new(config: CandidateStoreConfig) -> Self {
        Self {
            config,
            by_address: DashMap::new(),
            hot: DashSet::new(),
            warm: DashSet::new(),
            cold: DashSet::new(),
            evictions_total: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }

    pub fn evictions_total(&self) -> u64 {
        self.evictions_total.load(Ordering::Relaxed)
    }

    fn tier_set(&self, tier: Tier) -> &DashSet<Address> {
        match tier {
            Tier::Hot => &self.hot,
            Tier::Warm => &self.warm,
            Tier::Cold => &self.cold,
        }
    }

    /// Upsert a candidate as dirty. Used on any protocol event touching a
    /// user, a backfill hit, a priority-sweep member, or a predictive gate hit.
    pub fn upsert(&self, address: Address, source: CandidateOrigin, now_ms: u64) {
        if let Some(mut entry) = self.by_address.get_mut(&address) {
            entry.dirty = true;
            entry.source = source;
            return;
        }
        if self.by_address.len() >= self.config.candidate_max {
            if !self.evict_one() {
                return; // store genuinely full of higher-priority entries; drop the add
            }
        }
        let candidate = Candidate {
            address,
            last_hf: f64::MAX,
            last_updated_block: 0,
            last_updated_ms: now_ms,
            dirty: true,
            tier: Tier::Cold,
            source,
            last_debt_usd: 0.0,
            consecutive_above_band: 0,
        };
        self.cold.insert(address);
        self.by_address.insert(address, candidate);
    }

    pub fn mark_dirty(&self, address: &Address) {
        if let Some(mut c) = self.by_address.get_mut(address) {
            c.dirty = true;
        }
    }

    /// Record a fresher debt-USD figure for an already-tracked candidate
    /// (from the priority sweep's `BorrowerSnapshot` or a profit-engine
    /// simulation). A no-op for addresses not yet in the store — debt
    /// tracking piggybacks on candidacy, it doesn't create it.
    pub fn record_debt_usd(&self, address: Address, debt_usd: f64) {
        if let Some(mut c) = self.by_address.get_mut(&address) {
            c.last_debt_usd = debt_usd;
        }
    }

    pub fn get(&self, address: &Address) -> Option<Candidate> {
        self.by_address.get(address).map(|r| r.clone())
    }

    pub fn dirty_addresses(&self) -> Vec<Address> {
        self.by_address
            .iter()
            .filter(|e| e.dirty)
            .map(|e| e.address)
            .collect()
    }

    pub fn all_addresses(&self) -> Vec<Address> {
        self.by_address.iter().map(|e| e.address).collect()
    }

    pub fn tier_addresses(&self, tier: Tier) -> Vec<Address> {
        self.tier_set(tier).iter().map(|a| *a).collect()
    }

    pub fn tier_len(&self, tier: Tier) -> usize {
        self.tier_set(tier).len()
    }

    /// Record the outcome of an HF resolution: clears `dirty`, re-tiers with
    /// hysteresis on `Hot` demotion, and re-homes the address in the per-tier
    /// sets. Enforces `hotlistMax` by demoting the highest-HF hot members once
    /// the hot set would otherwise overflow.
    pub fn apply_resolution(&self, address: Address, hf: f64, block: u64, now_ms: u64) {
        let new_tier_by_band = self.tier_for_hf(hf);
        let mut demote_overflow = false;
        if let Some(mut entry) = self.by_address.get_mut(&address) {
            let old_tier = entry.tier;
            entry.last_hf = hf;
            entry.last_updated_block = block;
            entry.last_updated_ms = now_ms;
            entry.dirty = false;

            let resolved_tier = if old_tier == Tier::Hot && new_tier_by_band != Tier::Hot {
                let hysteresis_bound =
                    self.config.hotlist_max_hf * (1.0 + self.config.hysteresis_bps as f64 / 10_000.0);
                if hf > hysteresis_bound {
                    entry.consecutive_above_band = entry.consecutive_above_band.saturating_add(1);
                    if entry.consecutive_above_band >= 2 {
                        entry.consecutive_above_band = 0;
                        new_tier_by_band
                    } else {
                        Tier::Hot
                    }
                } else {
                    entry.consecutive_above_band = 0;
                    Tier::Hot
                }
            } else {
                entry.consecutive_above_band = 0;
                new_tier_by_band
            };

            if resolved_tier != old_tier {
                self.tier_set(old_tier).remove(&address);
                self.tier_set(resolved_tier).insert(address);
                entry.tier = resolved_tier;
            }
            if resolved_tier == Tier::Hot && self.hot.len() > self.config.hotlist_max {
                demote_overflow = true;
            }
        }
        if demote_overflow {
            self.demote_hot_overflow();
        }
    }

    fn tier_for_hf(&self, hf: f64) -> Tier {
        if hf <= self.config.hotlist_max_hf {
            Tier::Hot
        } else if hf <= self.config.warm_max_hf {
            Tier::Warm
        } else {
            Tier::Cold
        }
    }

    /// Demote the highest-HF member(s) of an over-full hot set to warm.
    fn demote_hot_overflow(&self) {
        while self.hot.len() > self.config.hotlist_max {
            let worst = self
                .hot
                .iter()
                .filter_map(|a| self.by_address.get(&*a).map(|c| (*a, c.last_hf)))
                .max_by(|a, b| a.1.total_cmp(&b.1));
            match worst {
                Some((addr, _)) => {
                    self.hot.remove(&addr);
                    self.warm.insert(addr);
                    if let Some(mut c) = self.by_address.get_mut(&addr) {
                        c.tier = Tier::Warm;
                    }
                }
                None => break,
            }
        }
    }

    /// Evict the single lowest-priority candidate to make room for an insert.
    /// Preference order: cold over warm over hot; within a tier, highest HF;
    /// ties broken by oldest `last_updated_ms`. Returns false if the store is
    /// empty (nothing to evict).
    fn evict_one(&self) -> bool {
        for tier in [Tier::Cold, Tier::Warm, Tier::Hot] {
            let victim = self
                .tier_set(tier)
                .iter()
                .filter_map(|a| self.by_address.get(&*a).map(|c| (*a, c.last_hf, c.last_updated_ms)))
                .max_by(|a, b| a.1.total_cmp(&b.1).then(b.2.cmp(&a.2)));
            if let Some((addr, _, _)) = victim {
                self.tier_set(tier).remove(&addr);
                self.by_address.remove(&addr);
                self.evictions_total.fetch_add(1, Ordering::Relaxed);
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    #[test]
    fn upsert_then_resolve_tiers_by_band() {
        let store = CandidateStore::new(CandidateStoreConfig::default());
        store.upsert(addr(1), CandidateOrigin::Event, 0);
        store.apply_resolution(addr(1), 0.9, 100, 1_000);
        assert_eq!(store.get(&addr(1)).unwrap().tier, Tier::Hot);
        assert_eq!(store.tier_len(Tier::Hot), 1);
    }

    #[test]
    fn hot_demotion_requires_two_consecutive_resolutions_above_band() {
        let store = CandidateStore::new(CandidateStoreConfig::default());
        store.upsert(addr(1), CandidateOrigin::Event, 0);
        store.apply_resolution(addr(1), 0.9, 100, 1_000); // hot
        // HF moves just above hysteresis bound once: still hot.
        store.apply_resolution(addr(1), 1.1, 101, 1_100);
        assert_eq!(store.get(&addr(1)).unwrap().tier, Tier::Hot);
        // Second consecutive resolution above band: demotes.
        store.apply_resolution(addr(1), 1.1, 102, 1_200);
        assert_eq!(store.get(&addr(1)).unwrap().tier, Tier::Warm);
    }

    #[test]
    fn hot_stays_hot_if_it_dips_back_into_band_between_high_reads() {
        let store = CandidateStore::new(CandidateStoreConfig::default());
        store.upsert(addr(1), CandidateOrigin::Event, 0);
        store.apply_resolution(addr(1), 0.9, 100, 1_000);
        store.apply_resolution(addr(1), 1.1, 101, 1_100); // counter = 1
        store.apply_resolution(addr(1), 1.0, 102, 1_200); // back in band: counter resets
        store.apply_resolution(addr(1), 1.1, 103, 1_300); // counter = 1 again, not demoted
        assert_eq!(store.get(&addr(1)).unwrap().tier, Tier::Hot);
    }

    #[test]
    fn eviction_prefers_cold_over_warm_over_hot() {
        let cfg = CandidateStoreConfig {
            candidate_max: 2,
            ..Default::default()
        };
        let store = CandidateStore::new(cfg);
        store.upsert(addr(1), CandidateOrigin::Event, 0);
        store.apply_resolution(addr(1), 0.9, 1, 1); // hot
        store.upsert(addr(2), CandidateOrigin::Event, 0);
        store.apply_resolution(addr(2), 2.0, 1, 1); // cold

        // Store is full (2/2); inserting a third must evict the cold one, not the hot one.
        store.upsert(addr(3), CandidateOrigin::Event, 0);

        assert!(store.get(&addr(1)).is_some());
        assert!(store.get(&addr(2)).is_none());
        assert!(store.get(&addr(3)).is_some());
        assert_eq!(store.evictions_total(), 1);
    }

    #[test]
    fn eviction_within_tier_prefers_highest_hf_then_oldest() {
        let cfg = CandidateStoreConfig {
            candidate_max: 2,
            ..Default::default()
        };
        let store = CandidateStore::new(cfg);
        store.upsert(addr(1), CandidateOrigin::Event, 0);
        store.apply_resolution(addr(1), 3.0, 1, 500); // cold, older
        store.upsert(addr(2), CandidateOrigin::Event, 0);
        store.apply_resolution(addr(2), 3.0, 1, 1_000); // cold, newer, same HF -> addr(1) evicted (tie -> oldest)

        store.upsert(addr(3), CandidateOrigin::Event, 0);
        assert!(store.get(&addr(1)).is_none());
        assert!(store.get(&addr(2)).is_some());
    }

    #[test]
    fn hotlist_max_overflow_demotes_highest_hf_hot_member() {
        let cfg = CandidateStoreConfig {
            hotlist_max: 1,
            ..Default::default()
        };
        let store = CandidateStore::new(cfg);
        store.upsert(addr(1), CandidateOrigin::Event, 0);
        store.apply_resolution(addr(1), 0.5, 1, 1); // very hot
        store.upsert(addr(2), CandidateOrigin::Event, 0);
        store.apply_resolution(addr(2), 0.95, 1, 1); // less hot, pushes set over the bound

        assert_eq!(store.tier_len(Tier::Hot), 1);
        assert_eq!(store.get(&addr(1)).unwrap().tier, Tier::Hot);
        assert_eq!(store.get(&addr(2)).unwrap().tier, Tier::Warm);
    }

    #[test]
    fn no_address_is_ever_in_two_tiers_at_once() {
        let store = CandidateStore::new(CandidateStoreConfig::default());
        store.upsert(addr(1), CandidateOrigin::Event, 0);
        store.apply_resolution(addr(1), 0.9, 1, 1);
        // One above-band resolution: hysteresis (§4.2) holds the candidate in
        // Hot for a single reading — demotion requires two consecutive ones.
        store.apply_resolution(addr(1), 2.0, 2, 2);
        let in_hot = store.tier_addresses(Tier::Hot).contains(&addr(1));
        let in_cold = store.tier_addresses(Tier::Cold).contains(&addr(1));
        assert!(!(in_hot && in_cold));
        assert!(in_hot, "single above-band reading must not demote yet");

        // Second consecutive above-band resolution crosses the hysteresis
        // threshold and the candidate demotes straight to Cold (HF 2.0 is
        // above warm_max_hf too).
        store.apply_resolution(addr(1), 2.0, 3, 3);
        let in_hot = store.tier_addresses(Tier::Hot).contains(&addr(1));
        let in_cold = store.tier_addresses(Tier::Cold).contains(&addr(1));
        assert!(!(in_hot && in_cold));
        assert!(in_cold, "two consecutive above-band readings must demote out of Hot");
    }
}

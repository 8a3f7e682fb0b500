//! Read-only union view: the hot tier plus any low-HF entry close enough to
//! the liquidation boundary to warrant priority attention even if it has
//! since fallen out of the hot tier proper.

use alloy::primitives::Address;
use std::collections::HashSet;

use super::low_hf::LowHfTracker;
use super::store::{CandidateStore, Tier};

/// HF ceiling for a low-HF entry to be pulled into the watch set even if its
/// current tier classification is `Warm` or `Cold`.
pub const WATCH_SET_LOW_HF_CEILING: f64 = 1.03;

/// A point-in-time snapshot of the union of the hot tier and near-band low-HF
/// entries. Deliberately not a live view: callers that need a stable set for
/// one scan pass compute it once via [`WatchSet::compute`].
#[derive(Debug, Clone, Default)]
pub struct WatchSet {
    addresses: HashSet<Address>,
}

impl WatchSet {
    pub fn compute(store: &CandidateStore, low_hf: &LowHfTracker) -> Self {
        let mut addresses: HashSet<Address> = store.tier_addresses(Tier::Hot).into_iter().collect();
        addresses.extend(low_hf.addresses_below(WATCH_SET_LOW_HF_CEILING));
        Self { addresses }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.addresses.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::store::{CandidateOrigin, CandidateStoreConfig};

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    #[test]
    fn union_includes_hot_tier_and_near_band_low_hf() {
        let store = CandidateStore::new(CandidateStoreConfig::default());
        store.upsert(addr(1), CandidateOrigin::Event, 0);
        store.apply_resolution(addr(1), 0.9, 1, 1); // hot

        let low_hf = LowHfTracker::new(super::super::low_hf::LowHfMode::All, 100, 1.1);
        low_hf.observe(addr(2), 1.02, 1); // not hot, but within watch-set ceiling
        low_hf.observe(addr(3), 1.08, 1); // below tracker threshold but above ceiling

        let watch = WatchSet::compute(&store, &low_hf);
        assert!(watch.contains(&addr(1)));
        assert!(watch.contains(&addr(2)));
        assert!(!watch.contains(&addr(3)));
        assert_eq!(watch.len(), 2);
    }
}

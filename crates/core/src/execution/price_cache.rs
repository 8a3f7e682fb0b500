//! Price hot cache — §4.9 "Price hot cache".
//!
//! Prewarmed per block for the top-K hot set so the critical lane and
//! submission path never block on an oracle read. Staleness is judged the
//! same way as everywhere else: `updatedAt` against `priceStalenessSeconds`.

use alloy::primitives::Address;
use dashmap::DashMap;

use crate::types::PricePoint;

#[derive(Debug, Clone, Copy)]
pub struct PriceHotCacheConfig {
    pub staleness_secs: u64,
}

impl Default for PriceHotCacheConfig {
    fn default() -> Self {
        Self { staleness_secs: 30 }
    }
}

pub struct PriceHotCache {
    by_asset: DashMap<Address, PricePoint>,
    config: PriceHotCacheConfig,
}

impl PriceHotCache {
    pub fn new(config: PriceHotCacheConfig) -> Self {
        Self { by_asset: DashMap::new(), config }
    }

    /// Called once per block per hot-set asset to refresh the cache ahead
    /// of any read.
    pub fn prewarm(&self, point: PricePoint) {
        self.by_asset.insert(point.asset, point);
    }

    /// Returns the cached point with `stale` recomputed against `now_secs`.
    pub fn get(&self, asset: &Address, now_secs: u64) -> Option<PricePoint> {
        self.by_asset.get(asset).map(|p| {
            let mut point = *p;
            point.stale = point.age_secs(now_secs) > self.config.staleness_secs;
            point
        })
    }

    pub fn is_stale(&self, asset: &Address, now_secs: u64) -> bool {
        self.get(asset, now_secs).map(|p| p.stale).unwrap_or(true)
    }

    pub fn len(&self) -> usize {
        self.by_asset.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    #[test]
    fn fresh_point_is_not_stale() {
        let cache = PriceHotCache::new(PriceHotCacheConfig { staleness_secs: 30 });
        let asset = Address::repeat_byte(1);
        cache.prewarm(PricePoint { asset, price: U256::from(100u64), updated_at: 1_000, publish_time: 1_000, stale: false });
        assert!(!cache.is_stale(&asset, 1_010));
    }

    #[test]
    fn old_point_is_stale() {
        let cache = PriceHotCache::new(PriceHotCacheConfig { staleness_secs: 30 });
        let asset = Address::repeat_byte(1);
        cache.prewarm(PricePoint { asset, price: U256::from(100u64), updated_at: 1_000, publish_time: 1_000, stale: false });
        assert!(cache.is_stale(&asset, 1_100));
    }

    #[test]
    fn missing_asset_is_stale() {
        let cache = PriceHotCache::new(PriceHotCacheConfig::default());
        assert!(cache.is_stale(&Address::repeat_byte(9), 0));
    }
}

//! Intent cache — §4.9 "Intent cache".
//!
//! Caches the calldata/amount decision for a user's liquidation so a second
//! critical event for the same user in the same block can skip straight to
//! submission. Validity is gated on the block not having advanced and every
//! referenced asset's `(price, updatedAt)` pair being unchanged — a direct
//! tuple comparison, not a hash, per the resolved fingerprint-granularity
//! question.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;

use crate::types::PricePoint;

/// A cached liquidation decision for one user.
#[derive(Debug, Clone)]
pub struct Intent {
    pub user: Address,
    pub collateral_asset: Address,
    pub debt_asset: Address,
    pub block: u64,
    pub repay: U256,
    pub min_amount_out: U256,
    /// `(asset, price, updated_at)` for every asset the simulation read —
    /// collateral and debt, at minimum.
    pub referenced_prices: Vec<(Address, U256, u64)>,
}

impl Intent {
    /// True while the block hasn't advanced and no referenced asset's price
    /// fingerprint has changed.
    pub fn is_fresh(&self, current_block: u64, current_prices: &[PricePoint]) -> bool {
        if current_block != self.block {
            return false;
        }
        self.referenced_prices.iter().all(|(asset, price, updated_at)| {
            current_prices
                .iter()
                .find(|p| &p.asset == asset)
                .is_some_and(|p| p.price == *price && p.updated_at == *updated_at)
        })
    }

    /// Movement, in bps, of the larger relative change across all
    /// referenced assets between this intent's fingerprint and `current_prices`.
    /// Missing assets are treated as full invalidation (`u32::MAX`).
    pub fn max_price_drift_bps(&self, current_prices: &[PricePoint]) -> u32 {
        self.referenced_prices
            .iter()
            .map(|(asset, price, _)| {
                match current_prices.iter().find(|p| &p.asset == asset) {
                    Some(p) => crate::u256_math::pct_diff_bps(*price, p.price).unsigned_abs() as u32,
                    None => u32::MAX,
                }
            })
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IntentCacheConfig {
    /// Below this drift, an invalidated intent is refreshed in place with
    /// one re-simulation instead of being dropped outright.
    pub revalidation_bps: u32,
}

impl Default for IntentCacheConfig {
    fn default() -> Self {
        Self { revalidation_bps: 50 }
    }
}

/// User-keyed cache of in-flight liquidation intents.
pub struct IntentCache {
    by_user: DashMap<Address, Intent>,
    config: IntentCacheConfig,
}

impl IntentCache {
    pub fn new(config: IntentCacheConfig) -> Self {
        Self { by_user: DashMap::new(), config }
    }

    pub fn revalidation_bps(&self) -> u32 {
        self.config.revalidation_bps
    }

    /// Returns the cached intent only if it is still fresh.
    pub fn get_fresh(&self, user: &Address, current_block: u64, current_prices: &[PricePoint]) -> Option<Intent> {
        let entry = self.by_user.get(user)?;
        entry.is_fresh(current_block, current_prices).then(|| entry.clone())
    }

    /// True if a stale cached intent's price drift is still within the
    /// revalidation threshold, i.e. worth refreshing rather than rebuilding
    /// from scratch.
    pub fn is_revalidatable(&self, user: &Address, current_prices: &[PricePoint]) -> bool {
        self.by_user
            .get(user)
            .is_some_and(|entry| entry.max_price_drift_bps(current_prices) < self.config.revalidation_bps)
    }

    pub fn insert(&self, intent: Intent) {
        self.by_user.insert(intent.user, intent);
    }

    pub fn invalidate(&self, user: &Address) {
        self.by_user.remove(user);
    }

    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(asset: Address, price: u64, updated_at: u64) -> PricePoint {
        PricePoint { asset, price: U256::from(price), updated_at, publish_time: updated_at, stale: false }
    }

    fn intent(user: Address, block: u64, refs: Vec<(Address, u64, u64)>) -> Intent {
        Intent {
            user,
            collateral_asset: Address::repeat_byte(0xAA),
            debt_asset: Address::repeat_byte(0xBB),
            block,
            repay: U256::from(1u64),
            min_amount_out: U256::from(1u64),
            referenced_prices: refs.into_iter().map(|(a, p, t)| (a, U256::from(p), t)).collect(),
        }
    }

    #[test]
    fn fresh_while_block_and_prices_unchanged() {
        let user = Address::repeat_byte(1);
        let asset = Address::repeat_byte(2);
        let cache = IntentCache::new(IntentCacheConfig::default());
        cache.insert(intent(user, 10, vec![(asset, 100, 5)]));

        let prices = vec![price(asset, 100, 5)];
        assert!(cache.get_fresh(&user, 10, &prices).is_some());
    }

    #[test]
    fn block_advance_invalidates() {
        let user = Address::repeat_byte(1);
        let asset = Address::repeat_byte(2);
        let cache = IntentCache::new(IntentCacheConfig::default());
        cache.insert(intent(user, 10, vec![(asset, 100, 5)]));

        let prices = vec![price(asset, 100, 5)];
        assert!(cache.get_fresh(&user, 11, &prices).is_none());
    }

    #[test]
    fn any_price_fingerprint_change_invalidates() {
        let user = Address::repeat_byte(1);
        let asset = Address::repeat_byte(2);
        let cache = IntentCache::new(IntentCacheConfig::default());
        cache.insert(intent(user, 10, vec![(asset, 100, 5)]));

        let prices = vec![price(asset, 100, 6)]; // same price, newer updated_at
        assert!(cache.get_fresh(&user, 10, &prices).is_none());
    }

    #[test]
    fn small_drift_is_revalidatable_large_is_not() {
        let user = Address::repeat_byte(1);
        let asset = Address::repeat_byte(2);
        let cache = IntentCache::new(IntentCacheConfig { revalidation_bps: 100 });
        cache.insert(intent(user, 10, vec![(asset, 10_000, 5)]));

        let small_move = vec![price(asset, 10_050, 6)]; // 50bps
        assert!(cache.is_revalidatable(&user, &small_move));

        let big_move = vec![price(asset, 11_000, 6)]; // ~1000bps
        assert!(!cache.is_revalidatable(&user, &big_move));
    }
}

//! Chain-backed `CandidateSource` fallback — §6.
//!
//! The subgraph (BlockAnalitica) is the primary borrower index; this is the
//! degraded-mode path when it's unavailable. It can only page through
//! addresses this process has itself observed (via the live event stream or
//! backfill), not the full historical borrower set a subgraph indexes —
//! callers should expect lower recall, not lower precision.

use alloy::primitives::Address;
use async_trait::async_trait;
use dashmap::DashSet;
use std::sync::Arc;
use tracing::warn;

use liquidator_api::{Borrower, CandidateSource};

use crate::provider::ProviderManager;

/// Convert a raw on-chain integer with `decimals` decimals to an
/// approximate f64. Only used for this module's coarse USD estimate; never
/// on a path that decides whether to submit a transaction.
fn u256_to_f64_scaled(value: alloy::primitives::U256, decimals: u8) -> f64 {
    let divisor = 10f64.powi(decimals as i32);
    if value <= alloy::primitives::U256::from(u128::MAX) {
        let raw: u128 = value.to();
        raw as f64 / divisor
    } else {
        let limbs = value.as_limbs();
        let high = limbs[1] as f64 * (u64::MAX as f64 + 1.0);
        (high + limbs[0] as f64) / divisor
    }
}

/// Tracks addresses observed on-chain (e.g. via `Borrow`/`Supply`/`Repay`/
/// `Withdraw` events) as candidates for the chain-backed fallback. Callers
/// feed this from the event ingest pipeline; `ChainCandidateSource` only
/// reads it.
#[derive(Debug, Default)]
pub struct ObservedBorrowers {
    addresses: DashSet<Address>,
}

impl ObservedBorrowers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, address: Address) {
        self.addresses.insert(address);
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    fn snapshot(&self) -> Vec<Address> {
        let mut v: Vec<Address> = self.addresses.iter().map(|e| *e).collect();
        v.sort();
        v
    }
}

pub struct ChainCandidateSource {
    provider: ProviderManager,
    observed: Arc<ObservedBorrowers>,
    max_concurrent: usize,
}

impl ChainCandidateSource {
    pub fn new(provider: ProviderManager, observed: Arc<ObservedBorrowers>) -> Self {
        Self { provider, observed, max_concurrent: 16 }
    }
}

/// Sum `amount * price / 10^decimals` for a set of balances, in plain f64.
/// Candidate discovery only needs an approximate USD figure to feed the
/// priority sweep's min-debt/min-collateral filters; the profit engine's
/// exact-integer math (§4.8) runs later, against fresh data, before any
/// on-chain action is taken.
fn sum_usd(balances: &[crate::provider::BalanceData]) -> f64 {
    balances
        .iter()
        .map(|b| {
            let amount = u256_to_f64_scaled(b.amount, b.decimals);
            let price = u256_to_f64_scaled(b.price, 8);
            amount * price
        })
        .sum()
}

#[async_trait]
impl CandidateSource for ChainCandidateSource {
    async fn page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<Borrower>> {
        let universe = self.observed.snapshot();
        if offset >= universe.len() {
            return Ok(Vec::new());
        }
        let end = (offset + limit).min(universe.len());
        let page_addrs = &universe[offset..end];

        let results = self.provider.get_positions_batch(page_addrs, self.max_concurrent).await;
        let mut borrowers = Vec::with_capacity(results.len());
        for (address, result) in results {
            match result {
                Ok((supplied, borrowed)) => {
                    let total_supply_usd = sum_usd(&supplied);
                    let total_borrow_usd = sum_usd(&borrowed);
                    if total_borrow_usd <= 0.0 {
                        continue;
                    }
                    // No on-chain HF read here (that's the resolver's job);
                    // a coarse collateral/debt ratio is enough to rank this
                    // fallback's candidates for the priority sweep.
                    let health_rate = if total_borrow_usd > 0.0 { total_supply_usd / total_borrow_usd } else { f64::MAX };
                    borrowers.push(Borrower { address, health_rate, total_supply_usd, total_borrow_usd });
                }
                Err(e) => {
                    warn!(%address, error = %e, "chain-backed candidate source: position fetch failed");
                }
            }
        }
        Ok(borrowers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_borrowers_dedups_and_sorts() {
        let observed = ObservedBorrowers::new();
        let a = Address::repeat_byte(2);
        let b = Address::repeat_byte(1);
        observed.observe(a);
        observed.observe(b);
        observed.observe(a);
        assert_eq!(observed.len(), 2);
        assert_eq!(observed.snapshot(), vec![b, a]);
    }
}

//! Real-time HF resolver — §4.3.
//!
//! Re-evaluates candidates' health factors on a tight cycle: dirty candidates
//! first, then the rest of the watch set, paged adaptively, hedged against a
//! secondary provider, and guarded against serving a stale snapshot if a
//! referenced price moves mid-flight.

mod hedge;
mod paging;
mod snapshot;
mod watchdog;

pub use hedge::{race_with_hedge, HedgeConfig, HedgeMetrics, HedgeWinner};
pub use paging::{AdaptivePager, AdaptivePagerConfig};
pub use snapshot::{check_batch, fingerprint_matches, next_step, SnapshotCheck, SnapshotRetry};
pub use watchdog::StallWatchdog;

use alloy::primitives::Address;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::candidates::CandidateStore;
use crate::error::CoreResult;
use crate::types::PricePoint;

/// Outcome of resolving a single candidate's health factor this cycle.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub address: Address,
    pub hf: f64,
    pub block: u64,
    pub prices: Vec<PricePoint>,
}

/// Abstraction over "fetch a fresh position snapshot and compute HF", hedged
/// across a primary and secondary RPC endpoint. Implemented concretely by the
/// chain crate's `AlloyChainClient`; kept as a trait here so the resolver's
/// ordering/paging/hedging/consistency logic is unit-testable without a live
/// provider.
#[async_trait]
pub trait HfSource: Send + Sync {
    async fn resolve_primary(&self, address: Address) -> CoreResult<Resolution>;
    async fn resolve_secondary(&self, address: Address) -> CoreResult<Resolution>;
}

/// Order candidates dirty-first, each group stable-sorted by address so the
/// ordering is deterministic across runs (useful for tests and for replaying
/// a cycle's trace).
pub fn dirty_first_order(dirty: Vec<Address>, rest: Vec<Address>) -> Vec<Address> {
    let mut dirty = dirty;
    let mut rest = rest;
    dirty.sort();
    rest.sort();
    dirty.extend(rest);
    dirty
}

pub struct ResolverConfig {
    pub pager: AdaptivePagerConfig,
    pub hedge: HedgeConfig,
    pub stall_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            pager: AdaptivePagerConfig::default(),
            hedge: HedgeConfig::default(),
            stall_timeout: Duration::from_secs(30),
        }
    }
}

/// Drives one repeated resolution cycle over a candidate store.
pub struct Resolver<S: HfSource> {
    store: Arc<CandidateStore>,
    source: Arc<S>,
    pager: parking_lot::Mutex<AdaptivePager>,
    hedge_config: HedgeConfig,
    hedge_metrics: HedgeMetrics,
    watchdog: StallWatchdog,
}

impl<S: HfSource> Resolver<S> {
    pub fn new(store: Arc<CandidateStore>, source: Arc<S>, config: ResolverConfig) -> Self {
        Self {
            store,
            source,
            pager: parking_lot::Mutex::new(AdaptivePager::new(config.pager)),
            hedge_config: config.hedge,
            hedge_metrics: HedgeMetrics::default(),
            watchdog: StallWatchdog::new(config.stall_timeout),
        }
    }

    pub fn hedge_metrics(&self) -> &HedgeMetrics {
        &self.hedge_metrics
    }

    pub fn is_stalled(&self) -> bool {
        self.watchdog.is_stalled()
    }

    /// Run one resolution cycle: dirty-first ordering, paged to the current
    /// adaptive page size, each address resolved with hedging. Returns the
    /// resolutions actually committed to the candidate store (a candidate
    /// whose snapshot moved twice is skipped, not committed).
    pub async fn run_cycle(&self, now_ms: u64) -> Vec<Resolution> {
        let started = Instant::now();
        let dirty = self.store.dirty_addresses();
        let rest: Vec<Address> = self
            .store
            .all_addresses()
            .into_iter()
            .filter(|a| !dirty.contains(a))
            .collect();
        let ordered = dirty_first_order(dirty, rest);

        let page_size = self.pager.lock().page_size();
        let page: Vec<Address> = ordered.into_iter().take(page_size).collect();

        let mut committed = Vec::with_capacity(page.len());
        for address in page {
            match self.resolve_one(address).await {
                Ok(Some(resolution)) => {
                    self.store
                        .apply_resolution(address, resolution.hf, resolution.block, now_ms);
                    committed.push(resolution);
                }
                Ok(None) => {
                    debug!(%address, "resolution aborted after second snapshot move");
                }
                Err(e) => {
                    warn!(%address, error = %e, "hf resolution failed");
                }
            }
        }

        if !committed.is_empty() {
            self.watchdog.record_success();
        }
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.pager.lock().observe_cycle(elapsed_ms);
        committed
    }

    /// Resolve one address, hedged, with the "re-query once on price move,
    /// abort on a second move" snapshot-consistency rule. `None` means abort.
    async fn resolve_one(&self, address: Address) -> CoreResult<Option<Resolution>> {
        let first = self
            .fetch_hedged(address)
            .await?;

        let second = self.fetch_hedged(address).await?;
        let moved = check_batch(first.prices.iter().zip(second.prices.iter()));
        match next_step(moved, false) {
            SnapshotRetry::Accept => Ok(Some(second)),
            SnapshotRetry::RetryOnce => {
                let third = self.fetch_hedged(address).await?;
                let moved_again = check_batch(second.prices.iter().zip(third.prices.iter()));
                match next_step(moved_again, true) {
                    SnapshotRetry::Accept => Ok(Some(third)),
                    _ => Ok(None),
                }
            }
            SnapshotRetry::Abort => Ok(None),
        }
    }

    async fn fetch_hedged(&self, address: Address) -> CoreResult<Resolution> {
        let (result, winner) = race_with_hedge(
            self.source.resolve_primary(address),
            self.source.resolve_secondary(address),
            self.hedge_config.delay(),
            &self.hedge_metrics,
        )
        .await;
        self.hedge_metrics.record_winner(winner);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::{CandidateOrigin, CandidateStoreConfig};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    struct FakeSource {
        calls: AtomicU64,
    }

    #[async_trait]
    impl HfSource for FakeSource {
        async fn resolve_primary(&self, address: Address) -> CoreResult<Resolution> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(Resolution {
                address,
                hf: 0.9,
                block: 1,
                prices: vec![],
            })
        }

        async fn resolve_secondary(&self, address: Address) -> CoreResult<Resolution> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Resolution {
                address,
                hf: 0.9,
                block: 1,
                prices: vec![],
            })
        }
    }

    #[test]
    fn dirty_candidates_sort_before_the_rest() {
        let ordered = dirty_first_order(vec![addr(5), addr(1)], vec![addr(3), addr(2)]);
        assert_eq!(ordered, vec![addr(1), addr(5), addr(2), addr(3)]);
    }

    #[tokio::test]
    async fn cycle_resolves_dirty_candidates_and_commits_to_store() {
        let store = Arc::new(CandidateStore::new(CandidateStoreConfig::default()));
        store.upsert(addr(1), CandidateOrigin::Event, 0);
        let source = Arc::new(FakeSource { calls: AtomicU64::new(0) });
        let resolver = Resolver::new(store.clone(), source, ResolverConfig::default());

        let committed = resolver.run_cycle(1_000).await;
        assert_eq!(committed.len(), 1);
        assert_eq!(store.get(&addr(1)).unwrap().last_hf, 0.9);
        assert!(!resolver.is_stalled());
    }
}

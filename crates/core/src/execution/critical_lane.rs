//! Critical lane fast path — §4.9 "Critical lane (fast-path)".
//!
//! A dedicated consumer of the critical-events channel: validate snapshot
//! age, mini-multicall reverify if stale, race the submission, record the
//! outcome with per-phase timers.

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use crate::error::CoreResult;
use super::submit::{submit, InflightLock, SubmitMode, TxSubmitter};

/// A liquidatable candidate as delivered on the critical events channel.
#[derive(Debug, Clone)]
pub struct CriticalEvent {
    pub user: Address,
    pub hf: f64,
    /// Current chain head as observed by the dispatcher.
    pub current_block: u64,
    /// Block the liquidatability snapshot was computed against.
    pub snapshot_block: u64,
    pub to: Address,
    pub calldata: Bytes,
}

impl CriticalEvent {
    /// Snapshot older than one block triggers a mini-multicall reverify.
    pub fn snapshot_is_stale(&self) -> bool {
        self.current_block.saturating_sub(self.snapshot_block) > 1
    }
}

/// Abstraction over "reverify a single user's liquidatability with one
/// cheap call", analogous to `resolver::HfSource` — kept as a trait so the
/// critical lane's branching is unit-testable without a live provider.
#[async_trait]
pub trait Reverifier: Send + Sync {
    async fn reverify(&self, user: Address) -> CoreResult<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriticalOutcome {
    Success,
    Raced,
    Skip,
}

#[derive(Debug, Clone, Copy)]
pub struct CriticalLaneConfig {
    pub submit_mode: SubmitMode,
    pub inflight_lock_enabled: bool,
}

impl Default for CriticalLaneConfig {
    fn default() -> Self {
        Self { submit_mode: SubmitMode::Race, inflight_lock_enabled: true }
    }
}

/// Snapshot-stale and mini-multicall invocations are tracked as separate
/// counters, per §4.9.
#[derive(Debug, Default)]
pub struct CriticalLaneCounters {
    pub snapshot_stale_total: AtomicU64,
    pub mini_multicall_total: AtomicU64,
    pub success_total: AtomicU64,
    pub raced_total: AtomicU64,
    pub skip_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct CriticalLaneResult {
    pub outcome: CriticalOutcome,
    pub snapshot_check_elapsed: Duration,
    pub reverify_elapsed: Option<Duration>,
    pub submit_elapsed: Option<Duration>,
}

pub struct CriticalLane<R: Reverifier, S: TxSubmitter> {
    reverifier: R,
    submitter: S,
    inflight: InflightLock,
    config: CriticalLaneConfig,
    counters: CriticalLaneCounters,
}

impl<R: Reverifier, S: TxSubmitter> CriticalLane<R, S> {
    pub fn new(reverifier: R, submitter: S, config: CriticalLaneConfig) -> Self {
        let inflight = InflightLock::new(config.inflight_lock_enabled);
        Self { reverifier, submitter, inflight, config, counters: CriticalLaneCounters::default() }
    }

    pub fn counters(&self) -> &CriticalLaneCounters {
        &self.counters
    }

    #[instrument(skip(self, event), fields(user = %event.user))]
    pub async fn handle(&self, event: CriticalEvent) -> CriticalLaneResult {
        let guard = match self.inflight.acquire(event.user) {
            Ok(guard) => guard,
            Err(e) => {
                warn!(user = %event.user, error = %e, "dropping critical event, execution already inflight");
                self.counters.skip_total.fetch_add(1, Ordering::Relaxed);
                return CriticalLaneResult {
                    outcome: CriticalOutcome::Skip,
                    snapshot_check_elapsed: Duration::ZERO,
                    reverify_elapsed: None,
                    submit_elapsed: None,
                };
            }
        };

        let snapshot_start = Instant::now();
        let stale = event.snapshot_is_stale();
        if stale {
            self.counters.snapshot_stale_total.fetch_add(1, Ordering::Relaxed);
        }
        let snapshot_check_elapsed = snapshot_start.elapsed();

        let mut reverify_elapsed = None;
        if stale {
            self.counters.mini_multicall_total.fetch_add(1, Ordering::Relaxed);
            let reverify_start = Instant::now();
            let still_liquidatable = match self.reverifier.reverify(event.user).await {
                Ok(ok) => ok,
                Err(e) => {
                    warn!(user = %event.user, error = %e, "mini-multicall reverify failed");
                    false
                }
            };
            reverify_elapsed = Some(reverify_start.elapsed());

            if !still_liquidatable {
                self.counters.skip_total.fetch_add(1, Ordering::Relaxed);
                drop(guard);
                return CriticalLaneResult {
                    outcome: CriticalOutcome::Skip,
                    snapshot_check_elapsed,
                    reverify_elapsed,
                    submit_elapsed: None,
                };
            }
        }

        let submit_start = Instant::now();
        let result = submit(&self.submitter, self.config.submit_mode, event.to, event.calldata.clone()).await;
        let submit_elapsed = Some(submit_start.elapsed());
        drop(guard);

        let outcome = match result {
            Ok(tx_hash) => {
                let raced = self.config.submit_mode == SubmitMode::Race;
                info!(user = %event.user, tx_hash = %tx_hash, raced, "critical lane submission succeeded");
                if raced {
                    self.counters.raced_total.fetch_add(1, Ordering::Relaxed);
                    CriticalOutcome::Raced
                } else {
                    self.counters.success_total.fetch_add(1, Ordering::Relaxed);
                    CriticalOutcome::Success
                }
            }
            Err(e) => {
                warn!(user = %event.user, error = %e, "critical lane submission failed");
                self.counters.skip_total.fetch_add(1, Ordering::Relaxed);
                CriticalOutcome::Skip
            }
        };

        CriticalLaneResult { outcome, snapshot_check_elapsed, reverify_elapsed, submit_elapsed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;
    use std::sync::atomic::AtomicBool;

    struct FakeReverifier {
        still_liquidatable: bool,
    }

    #[async_trait]
    impl Reverifier for FakeReverifier {
        async fn reverify(&self, _user: Address) -> CoreResult<bool> {
            Ok(self.still_liquidatable)
        }
    }

    struct FakeSubmitter {
        fail: AtomicBool,
    }

    #[async_trait]
    impl TxSubmitter for FakeSubmitter {
        async fn submit_public(&self, _to: Address, _calldata: Bytes) -> CoreResult<B256> {
            if self.fail.load(Ordering::Relaxed) {
                Err(crate::error::CoreError::Network("down".into()))
            } else {
                Ok(B256::repeat_byte(1))
            }
        }
        async fn submit_private(&self, _to: Address, _calldata: Bytes) -> CoreResult<B256> {
            Ok(B256::repeat_byte(2))
        }
    }

    fn event(current_block: u64, snapshot_block: u64) -> CriticalEvent {
        CriticalEvent {
            user: Address::repeat_byte(9),
            hf: 0.98,
            current_block,
            snapshot_block,
            to: Address::repeat_byte(1),
            calldata: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn fresh_snapshot_skips_reverify() {
        let lane = CriticalLane::new(
            FakeReverifier { still_liquidatable: true },
            FakeSubmitter { fail: AtomicBool::new(false) },
            CriticalLaneConfig::default(),
        );
        let result = lane.handle(event(10, 10)).await;
        assert_eq!(result.outcome, CriticalOutcome::Raced);
        assert!(result.reverify_elapsed.is_none());
        assert_eq!(lane.counters().snapshot_stale_total.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn stale_snapshot_triggers_reverify_and_skips_when_no_longer_liquidatable() {
        let lane = CriticalLane::new(
            FakeReverifier { still_liquidatable: false },
            FakeSubmitter { fail: AtomicBool::new(false) },
            CriticalLaneConfig::default(),
        );
        let result = lane.handle(event(12, 10)).await;
        assert_eq!(result.outcome, CriticalOutcome::Skip);
        assert!(result.reverify_elapsed.is_some());
        assert_eq!(lane.counters().snapshot_stale_total.load(Ordering::Relaxed), 1);
        assert_eq!(lane.counters().mini_multicall_total.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn second_concurrent_attempt_for_same_user_is_dropped() {
        let lane = CriticalLane::new(
            FakeReverifier { still_liquidatable: true },
            FakeSubmitter { fail: AtomicBool::new(false) },
            CriticalLaneConfig { submit_mode: SubmitMode::Race, inflight_lock_enabled: true },
        );
        let guard = lane.inflight.acquire(Address::repeat_byte(9));
        assert!(guard.is_ok());
        let result = lane.handle(event(10, 10)).await;
        assert_eq!(result.outcome, CriticalOutcome::Skip);
    }
}

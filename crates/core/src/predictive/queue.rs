//! Predictive queue manager — §4.5.
//!
//! Enforces dedup and per-block budgets on predictive HF re-evaluations,
//! keyed by `user|scenario` (lowercase user, pipe separator).

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::info;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub safety_max: usize,
    pub candidates_per_block: u32,
    pub calls_per_block: u32,
    pub block_debounce: u64,
    pub cooldown_sec: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            safety_max: 10_000,
            candidates_per_block: 200,
            calls_per_block: 500,
            block_debounce: 3,
            cooldown_sec: 10,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    last_evaluated_block: u64,
    last_evaluated_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    QueueSafetyMaxExceeded,
    CandidateBudgetExceeded,
    CallBudgetExceeded,
    DedupSameBlock,
    BlockDebounce,
    Cooldown,
}

#[derive(Debug, Default, Clone, Copy)]
struct BlockCounters {
    calls_this_block: u32,
    candidates_this_block: u32,
    dedup_skips_this_block: u32,
    budget_exceeded_this_block: u32,
}

struct BlockState {
    current_block: u64,
    counters: BlockCounters,
}

pub struct PredictiveQueueManager {
    config: QueueConfig,
    entries: DashMap<String, QueueEntry>,
    block_state: Mutex<BlockState>,
}

fn queue_key(user: &str, scenario: &str) -> String {
    format!("{}|{}", user.to_lowercase(), scenario)
}

impl PredictiveQueueManager {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
            block_state: Mutex::new(BlockState {
                current_block: 0,
                counters: BlockCounters::default(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn advance_block(&self, block: u64) {
        let mut state = self.block_state.lock();
        if block == state.current_block {
            return;
        }
        if state.current_block != 0 || state.counters.calls_this_block > 0 {
            info!(
                block = state.current_block,
                calls = state.counters.calls_this_block,
                candidates = state.counters.candidates_this_block,
                dedup_skips = state.counters.dedup_skips_this_block,
                budget_exceeded = state.counters.budget_exceeded_this_block,
                "predictive queue block summary"
            );
        }
        state.current_block = block;
        state.counters = BlockCounters::default();
    }

    /// Run the 8-step gating algorithm for one `(user, scenario)` at `block`.
    pub fn should_evaluate(&self, user: &str, scenario: &str, block: u64, now_ms: u64) -> Result<(), RejectReason> {
        self.advance_block(block);

        if self.entries.len() >= self.config.safety_max {
            return Err(RejectReason::QueueSafetyMaxExceeded);
        }

        {
            let mut state = self.block_state.lock();
            if state.counters.candidates_this_block >= self.config.candidates_per_block {
                state.counters.budget_exceeded_this_block += 1;
                return Err(RejectReason::CandidateBudgetExceeded);
            }
            if state.counters.calls_this_block >= self.config.calls_per_block {
                state.counters.budget_exceeded_this_block += 1;
                return Err(RejectReason::CallBudgetExceeded);
            }
        }

        let key = queue_key(user, scenario);
        if let Some(existing) = self.entries.get(&key) {
            if existing.last_evaluated_block == block {
                self.block_state.lock().counters.dedup_skips_this_block += 1;
                return Err(RejectReason::DedupSameBlock);
            }
            if block.saturating_sub(existing.last_evaluated_block) < self.config.block_debounce {
                self.block_state.lock().counters.dedup_skips_this_block += 1;
                return Err(RejectReason::BlockDebounce);
            }
            if now_ms.saturating_sub(existing.last_evaluated_ms) < self.config.cooldown_sec * 1_000 {
                self.block_state.lock().counters.dedup_skips_this_block += 1;
                return Err(RejectReason::Cooldown);
            }
        }

        self.block_state.lock().counters.candidates_this_block += 1;
        Ok(())
    }

    /// Record that `(user, scenario)` was evaluated at `block`/`now_ms`.
    pub fn mark_evaluated(&self, user: &str, scenario: &str, block: u64, now_ms: u64) {
        let key = queue_key(user, scenario);
        self.entries.insert(
            key,
            QueueEntry {
                last_evaluated_block: block,
                last_evaluated_ms: now_ms,
            },
        );
    }

    pub fn increment_calls(&self, n: u32) {
        self.block_state.lock().counters.calls_this_block += n;
    }

    /// Remove entries whose last evaluation is older than `max_age_ms`
    /// (default 5 minutes per §4.5).
    pub fn prune_stale(&self, now_ms: u64, max_age_ms: u64) {
        self.entries.retain(|_, entry| now_ms.saturating_sub(entry.last_evaluated_ms) < max_age_ms);
    }
}

pub const DEFAULT_PRUNE_MAX_AGE_MS: u64 = 5 * 60 * 1_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_first_evaluation() {
        let q = PredictiveQueueManager::new(QueueConfig::default());
        assert!(q.should_evaluate("0xABC", "low_hf", 100, 1_000).is_ok());
    }

    #[test]
    fn rejects_same_block_dedup() {
        let q = PredictiveQueueManager::new(QueueConfig::default());
        q.should_evaluate("0xABC", "low_hf", 100, 1_000).unwrap();
        q.mark_evaluated("0xABC", "low_hf", 100, 1_000);
        assert_eq!(
            q.should_evaluate("0xabc", "low_hf", 100, 1_000),
            Err(RejectReason::DedupSameBlock)
        );
    }

    #[test]
    fn rejects_within_block_debounce() {
        let cfg = QueueConfig { block_debounce: 3, cooldown_sec: 0, ..Default::default() };
        let q = PredictiveQueueManager::new(cfg);
        q.should_evaluate("0xABC", "low_hf", 100, 1_000).unwrap();
        q.mark_evaluated("0xABC", "low_hf", 100, 1_000);
        assert_eq!(
            q.should_evaluate("0xABC", "low_hf", 102, 2_000),
            Err(RejectReason::BlockDebounce)
        );
        assert!(q.should_evaluate("0xABC", "low_hf", 103, 2_000).is_ok());
    }

    #[test]
    fn rejects_within_cooldown() {
        let cfg = QueueConfig { block_debounce: 0, cooldown_sec: 10, ..Default::default() };
        let q = PredictiveQueueManager::new(cfg);
        q.should_evaluate("0xABC", "low_hf", 100, 1_000).unwrap();
        q.mark_evaluated("0xABC", "low_hf", 100, 1_000);
        assert_eq!(
            q.should_evaluate("0xABC", "low_hf", 101, 5_000),
            Err(RejectReason::Cooldown)
        );
        assert!(q.should_evaluate("0xABC", "low_hf", 101, 12_000).is_ok());
    }

    #[test]
    fn per_block_candidate_budget_is_enforced_and_resets_on_new_block() {
        let cfg = QueueConfig { candidates_per_block: 1, ..Default::default() };
        let q = PredictiveQueueManager::new(cfg);
        q.should_evaluate("0xAAA", "low_hf", 100, 1_000).unwrap();
        q.mark_evaluated("0xAAA", "low_hf", 100, 1_000);
        assert_eq!(
            q.should_evaluate("0xBBB", "low_hf", 100, 1_000),
            Err(RejectReason::CandidateBudgetExceeded)
        );
        // new block resets the counter
        assert!(q.should_evaluate("0xBBB", "low_hf", 101, 1_000).is_ok());
    }

    #[test]
    fn per_block_call_budget_is_enforced_and_resets_on_new_block() {
        let cfg = QueueConfig { calls_per_block: 1, ..Default::default() };
        let q = PredictiveQueueManager::new(cfg);
        q.increment_calls(1);
        assert_eq!(
            q.should_evaluate("0xAAA", "low_hf", 100, 1_000),
            Err(RejectReason::CallBudgetExceeded)
        );
        // new block resets the counter
        assert!(q.should_evaluate("0xAAA", "low_hf", 101, 1_000).is_ok());
    }

    #[test]
    fn queue_safety_max_rejects_when_full() {
        let cfg = QueueConfig { safety_max: 1, ..Default::default() };
        let q = PredictiveQueueManager::new(cfg);
        q.mark_evaluated("0xAAA", "low_hf", 100, 1_000);
        assert_eq!(
            q.should_evaluate("0xBBB", "low_hf", 100, 1_000),
            Err(RejectReason::QueueSafetyMaxExceeded)
        );
    }

    #[test]
    fn prune_stale_removes_old_entries_only() {
        let q = PredictiveQueueManager::new(QueueConfig::default());
        q.mark_evaluated("0xAAA", "low_hf", 100, 0);
        q.mark_evaluated("0xBBB", "low_hf", 100, 10_000);
        q.prune_stale(6 * 60 * 1_000, DEFAULT_PRUNE_MAX_AGE_MS);
        assert_eq!(q.len(), 1);
    }
}

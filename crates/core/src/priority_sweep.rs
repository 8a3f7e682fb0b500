//! Priority sweep — §4.10.
//!
//! Periodically scores the full borrower population and publishes an
//! immutable, versioned `PrioritySet` the predictive queue manager and hot
//! cache prewarmer consult without holding up the real-time resolver.

use alloy::primitives::Address;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::CoreResult;

/// One borrower's inputs to the scoring formula.
#[derive(Debug, Clone, Copy)]
pub struct BorrowerSnapshot {
    pub user: Address,
    pub hf: f64,
    pub debt_usd: f64,
    pub collateral_usd: f64,
}

/// Abstraction over "page through the full borrower index", kept as a trait
/// so the scoring/filtering/paging logic is unit-testable without a live
/// chain or subgraph source. An empty page (shorter than `limit`, or truly
/// empty) signals the end of the population.
#[async_trait]
pub trait BorrowerPageSource: Send + Sync {
    async fn page(&self, offset: usize, limit: usize) -> CoreResult<Vec<BorrowerSnapshot>>;
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub w_debt: f64,
    pub w_coll: f64,
    pub w_hf: f64,
    pub hf_ceiling: f64,
    pub low_hf_boost_threshold: f64,
    pub low_hf_boost: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            w_debt: 1.0,
            w_coll: 0.5,
            w_hf: 2.0,
            hf_ceiling: 1.5,
            low_hf_boost_threshold: 1.02,
            low_hf_boost: 5.0,
        }
    }
}

/// `w_debt*log10(debtUsd) + w_coll*log10(collateralUsd)
///   - w_hf*max(0, hfCeiling - hf) + (hf <= lowHfBoostThreshold ? lowHfBoost : 0)`
pub fn score(b: &BorrowerSnapshot, w: &ScoreWeights) -> f64 {
    let debt_term = w.w_debt * b.debt_usd.max(1.0).log10();
    let coll_term = w.w_coll * b.collateral_usd.max(1.0).log10();
    let hf_penalty = w.w_hf * (w.hf_ceiling - b.hf).max(0.0);
    let boost = if b.hf <= w.low_hf_boost_threshold { w.low_hf_boost } else { 0.0 };
    debt_term + coll_term - hf_penalty + boost
}

#[derive(Debug, Clone)]
pub struct PrioritySetEntry {
    pub user: Address,
    pub score: f64,
    pub hf: f64,
    pub debt_usd: f64,
}

/// Immutable, versioned output of one sweep. Consumers hold an `Arc` of the
/// whole set and swap it wholesale rather than mutating in place.
#[derive(Debug, Clone)]
pub struct PrioritySet {
    pub version: u64,
    pub users: Vec<PrioritySetEntry>,
}

#[derive(Debug, Clone, Copy)]
pub struct SweepSummary {
    pub seen: usize,
    pub filtered: usize,
    pub selected: usize,
    pub top_score: f64,
    pub median_hf: f64,
    pub duration_ms: u64,
    /// Peak heap usage during the sweep, in megabytes. Left at 0.0 — no
    /// allocator introspection is wired into this process.
    pub heap_peak_mb: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct PrioritySweepConfig {
    pub page_size: usize,
    pub inter_request: Duration,
    pub timeout: Duration,
    pub target_size: usize,
    pub min_debt_usd: f64,
    pub min_collateral_usd: f64,
    pub weights: ScoreWeights,
}

impl Default for PrioritySweepConfig {
    fn default() -> Self {
        Self {
            page_size: 500,
            inter_request: Duration::from_millis(50),
            timeout: Duration::from_secs(120),
            target_size: 2_000,
            min_debt_usd: 100.0,
            min_collateral_usd: 100.0,
            weights: ScoreWeights::default(),
        }
    }
}

pub struct PrioritySweep<S: BorrowerPageSource> {
    source: S,
    config: PrioritySweepConfig,
    version: AtomicU64,
}

impl<S: BorrowerPageSource> PrioritySweep<S> {
    pub fn new(source: S, config: PrioritySweepConfig) -> Self {
        Self { source, config, version: AtomicU64::new(0) }
    }

    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }

    /// Page through the borrower index, score and filter each page, and
    /// publish the top `targetSize` as a new immutable `PrioritySet`.
    /// `cancel` is polled between pages so an external signal can abort
    /// mid-sweep; a cancelled sweep still returns whatever was scored so
    /// far, versioned as usual.
    pub async fn run(&self, cancel: &AtomicBool) -> CoreResult<(PrioritySet, SweepSummary)> {
        let started = Instant::now();
        let mut seen = 0usize;
        let mut filtered = 0usize;
        let mut scored: Vec<PrioritySetEntry> = Vec::new();
        let mut hfs: Vec<f64> = Vec::new();
        let mut offset = 0usize;

        loop {
            if cancel.load(Ordering::Relaxed) {
                warn!(seen, "priority sweep cancelled");
                break;
            }
            if started.elapsed() > self.config.timeout {
                warn!(seen, "priority sweep timed out");
                break;
            }

            let page = self.source.page(offset, self.config.page_size).await?;
            if page.is_empty() {
                break;
            }
            seen += page.len();

            for b in &page {
                if b.debt_usd < self.config.min_debt_usd || b.collateral_usd < self.config.min_collateral_usd {
                    filtered += 1;
                    continue;
                }
                hfs.push(b.hf);
                scored.push(PrioritySetEntry {
                    user: b.user,
                    score: score(b, &self.config.weights),
                    hf: b.hf,
                    debt_usd: b.debt_usd,
                });
            }

            let page_len = page.len();
            offset += page_len;
            if page_len < self.config.page_size {
                break;
            }
            if !self.config.inter_request.is_zero() {
                tokio::time::sleep(self.config.inter_request).await;
            }
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.config.target_size);

        let top_score = scored.first().map(|e| e.score).unwrap_or(0.0);
        let median_hf = median(&mut hfs);
        let duration_ms = started.elapsed().as_millis() as u64;
        let selected = scored.len();

        let version = self.version.fetch_add(1, Ordering::Relaxed) + 1;
        let set = PrioritySet { version, users: scored };

        let summary = SweepSummary { seen, filtered, selected, top_score, median_hf, duration_ms, heap_peak_mb: 0.0 };

        info!(
            version = set.version,
            seen, filtered, selected, top_score, median_hf, duration_ms,
            "priority sweep complete"
        );

        Ok((set, summary))
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeSource {
        pages: Mutex<Vec<Vec<BorrowerSnapshot>>>,
    }

    #[async_trait]
    impl BorrowerPageSource for FakeSource {
        async fn page(&self, offset: usize, _limit: usize) -> CoreResult<Vec<BorrowerSnapshot>> {
            let pages = self.pages.lock().unwrap();
            let idx = offset / 2;
            Ok(pages.get(idx).cloned().unwrap_or_default())
        }
    }

    fn borrower(n: u8, hf: f64, debt_usd: f64, collateral_usd: f64) -> BorrowerSnapshot {
        BorrowerSnapshot { user: Address::repeat_byte(n), hf, debt_usd, collateral_usd }
    }

    #[test]
    fn low_hf_boost_applies_at_threshold() {
        let w = ScoreWeights::default();
        let borderline = borrower(1, 1.02, 10_000.0, 20_000.0);
        let healthy = borrower(2, 1.2, 10_000.0, 20_000.0);
        assert!(score(&borderline, &w) > score(&healthy, &w));
    }

    #[test]
    fn hf_above_ceiling_has_zero_penalty() {
        let w = ScoreWeights::default();
        let a = borrower(1, 1.6, 10_000.0, 20_000.0);
        let b = borrower(2, 2.0, 10_000.0, 20_000.0);
        assert!((score(&a, &w) - score(&b, &w)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn filters_below_minimums_and_selects_top_target_size() {
        let pages = vec![vec![
            borrower(1, 1.01, 10_000.0, 20_000.0), // high priority
            borrower(2, 1.5, 50.0, 50.0),           // filtered: below minimums
            borrower(3, 1.3, 5_000.0, 8_000.0),
        ]];
        let source = FakeSource { pages: Mutex::new(pages) };
        let sweep = PrioritySweep::new(
            source,
            PrioritySweepConfig { target_size: 1, inter_request: Duration::ZERO, ..PrioritySweepConfig::default() },
        );
        let cancel = AtomicBool::new(false);
        let (set, summary) = sweep.run(&cancel).await.unwrap();
        assert_eq!(summary.seen, 3);
        assert_eq!(summary.filtered, 1);
        assert_eq!(summary.selected, 1);
        assert_eq!(set.users[0].user, Address::repeat_byte(1));
        assert_eq!(set.version, 1);
    }

    #[tokio::test]
    async fn version_increments_across_runs() {
        let pages = vec![vec![borrower(1, 1.3, 1_000.0, 2_000.0)]];
        let source = FakeSource { pages: Mutex::new(pages) };
        let sweep = PrioritySweep::new(source, PrioritySweepConfig { inter_request: Duration::ZERO, ..PrioritySweepConfig::default() });
        let cancel = AtomicBool::new(false);
        let (first, _) = sweep.run(&cancel).await.unwrap();
        let (second, _) = sweep.run(&cancel).await.unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
    }

    #[tokio::test]
    async fn cancellation_stops_paging_early() {
        let pages = vec![
            vec![borrower(1, 1.3, 1_000.0, 2_000.0); 1],
            vec![borrower(2, 1.3, 1_000.0, 2_000.0); 1],
        ];
        let source = FakeSource { pages: Mutex::new(pages) };
        let sweep = PrioritySweep::new(
            source,
            PrioritySweepConfig { page_size: 1, inter_request: Duration::ZERO, ..PrioritySweepConfig::default() },
        );
        let cancel = AtomicBool::new(true);
        let (set, summary) = sweep.run(&cancel).await.unwrap();
        assert_eq!(summary.seen, 0);
        assert!(set.users.is_empty());
    }
}

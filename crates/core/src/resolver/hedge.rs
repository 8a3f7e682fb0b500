//! Hedged-request bookkeeping for the real-time HF resolver — §4.3's
//! "if the primary provider hasn't responded within `hedgeDelayMs`, fire the
//! same request at the secondary provider and take whichever answers first."

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct HedgeConfig {
    pub hedge_delay_ms: u64,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self { hedge_delay_ms: 150 }
    }
}

impl HedgeConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.hedge_delay_ms)
    }
}

/// Which provider answered a hedged request first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HedgeWinner {
    Primary,
    Secondary,
}

/// Running counters for hedge activity, exported to the metrics facade.
#[derive(Debug, Default)]
pub struct HedgeMetrics {
    fired_total: AtomicU64,
    winner_secondary_total: AtomicU64,
    winner_primary_total: AtomicU64,
}

impl HedgeMetrics {
    pub fn record_fired(&self) {
        self.fired_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_winner(&self, winner: HedgeWinner) {
        match winner {
            HedgeWinner::Primary => self.winner_primary_total.fetch_add(1, Ordering::Relaxed),
            HedgeWinner::Secondary => self.winner_secondary_total.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn fired_total(&self) -> u64 {
        self.fired_total.load(Ordering::Relaxed)
    }

    pub fn winner_secondary_total(&self) -> u64 {
        self.winner_secondary_total.load(Ordering::Relaxed)
    }

    pub fn winner_primary_total(&self) -> u64 {
        self.winner_primary_total.load(Ordering::Relaxed)
    }
}

/// Race a primary future against a secondary one fired only after
/// `hedge_delay` has elapsed without the primary completing. Returns the
/// winning output and which side produced it.
pub async fn race_with_hedge<F1, F2, T>(
    primary: F1,
    secondary: F2,
    hedge_delay: Duration,
    metrics: &HedgeMetrics,
) -> (T, HedgeWinner)
where
    F1: std::future::Future<Output = T>,
    F2: std::future::Future<Output = T>,
{
    tokio::pin!(primary);
    tokio::select! {
        biased;
        out = &mut primary => (out, HedgeWinner::Primary),
        _ = tokio::time::sleep(hedge_delay) => {
            metrics.record_fired();
            tokio::pin!(secondary);
            tokio::select! {
                out = &mut primary => (out, HedgeWinner::Primary),
                out = &mut secondary => (out, HedgeWinner::Secondary),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn primary_wins_when_fast() {
        let metrics = HedgeMetrics::default();
        let (out, winner) = race_with_hedge(
            async {
                tokio::time::sleep(StdDuration::from_millis(1)).await;
                1
            },
            async {
                tokio::time::sleep(StdDuration::from_millis(500)).await;
                2
            },
            StdDuration::from_millis(50),
            &metrics,
        )
        .await;
        assert_eq!(out, 1);
        assert_eq!(winner, HedgeWinner::Primary);
        assert_eq!(metrics.fired_total(), 0);
    }

    #[tokio::test]
    async fn secondary_wins_when_primary_is_slow() {
        let metrics = HedgeMetrics::default();
        let (out, winner) = race_with_hedge(
            async {
                tokio::time::sleep(StdDuration::from_millis(500)).await;
                1
            },
            async {
                tokio::time::sleep(StdDuration::from_millis(1)).await;
                2
            },
            StdDuration::from_millis(10),
            &metrics,
        )
        .await;
        assert_eq!(out, 2);
        assert_eq!(winner, HedgeWinner::Secondary);
        assert_eq!(metrics.fired_total(), 1);
        assert_eq!(metrics.winner_secondary_total(), 1);
    }
}

//! Adaptive page sizing for the HF resolution loop — §4.3.
//!
//! Page size walks by ±25% per cycle based on observed cycle latency against
//! a target budget, bounded to `[head_page_min, head_page_max]`.

#[derive(Debug, Clone, Copy)]
pub struct AdaptivePagerConfig {
    pub head_page_min: usize,
    pub head_page_max: usize,
    pub initial_page: usize,
    pub target_cycle_ms: u64,
    pub step_pct: f64,
}

impl Default for AdaptivePagerConfig {
    fn default() -> Self {
        Self {
            head_page_min: 25,
            head_page_max: 500,
            initial_page: 100,
            target_cycle_ms: 1_000,
            step_pct: 0.25,
        }
    }
}

/// Tracks the current page size and adjusts it after every resolution cycle.
#[derive(Debug, Clone)]
pub struct AdaptivePager {
    config: AdaptivePagerConfig,
    current: usize,
}

impl AdaptivePager {
    pub fn new(config: AdaptivePagerConfig) -> Self {
        let current = config.initial_page.clamp(config.head_page_min, config.head_page_max);
        Self { config, current }
    }

    pub fn page_size(&self) -> usize {
        self.current
    }

    /// Feed the observed wall-clock duration of the last cycle; grows the page
    /// when under budget, shrinks it when over, always within bounds.
    pub fn observe_cycle(&mut self, elapsed_ms: u64) {
        let step = ((self.current as f64) * self.config.step_pct).ceil() as usize;
        let step = step.max(1);
        if elapsed_ms < self.config.target_cycle_ms {
            self.current = (self.current + step).min(self.config.head_page_max);
        } else if elapsed_ms > self.config.target_cycle_ms {
            self.current = self.current.saturating_sub(step).max(self.config.head_page_min);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_when_under_budget() {
        let mut pager = AdaptivePager::new(AdaptivePagerConfig {
            initial_page: 100,
            target_cycle_ms: 1_000,
            ..Default::default()
        });
        pager.observe_cycle(200);
        assert!(pager.page_size() > 100);
    }

    #[test]
    fn shrinks_when_over_budget() {
        let mut pager = AdaptivePager::new(AdaptivePagerConfig {
            initial_page: 100,
            target_cycle_ms: 1_000,
            ..Default::default()
        });
        pager.observe_cycle(3_000);
        assert!(pager.page_size() < 100);
    }

    #[test]
    fn never_exceeds_configured_bounds() {
        let mut pager = AdaptivePager::new(AdaptivePagerConfig {
            head_page_min: 25,
            head_page_max: 120,
            initial_page: 100,
            target_cycle_ms: 1_000,
            step_pct: 0.5,
        });
        for _ in 0..20 {
            pager.observe_cycle(0);
        }
        assert_eq!(pager.page_size(), 120);
        for _ in 0..20 {
            pager.observe_cycle(10_000);
        }
        assert_eq!(pager.page_size(), 25);
    }
}

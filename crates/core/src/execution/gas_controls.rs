//! Gas controls and the burst-bump schedule — §4.9.
//!
//! Sits on top of the chain crate's `GasStrategy`/`GasParams` price-fetch
//! layer: this module owns the abort-above-cap check and the
//! burst-bump timing, not the underlying price source.

use std::time::Duration;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy)]
pub struct GasControlsConfig {
    pub max_gas_gwei: f64,
    pub max_gas_bumps: u8,
    pub gas_burst_first_ms: u64,
    pub gas_burst_second_ms: u64,
    pub gas_burst_first_pct: f64,
    pub gas_burst_second_pct: f64,
}

impl Default for GasControlsConfig {
    fn default() -> Self {
        Self {
            max_gas_gwei: 50.0,
            max_gas_bumps: 2,
            gas_burst_first_ms: 400,
            gas_burst_second_ms: 800,
            gas_burst_first_pct: 20.0,
            gas_burst_second_pct: 40.0,
        }
    }
}

/// One scheduled bump: how long after submission to apply it, and by how
/// much to raise gas price over the original quote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasBumpSchedule {
    pub delay: Duration,
    pub bump_pct: f64,
}

pub struct GasControls {
    config: GasControlsConfig,
}

impl GasControls {
    pub fn new(config: GasControlsConfig) -> Self {
        Self { config }
    }

    /// Abort when `currentGasGwei > maxGasGwei`.
    pub fn check_cap(&self, current_gas_gwei: f64) -> CoreResult<()> {
        if current_gas_gwei > self.config.max_gas_gwei {
            return Err(CoreError::GasCapExceeded {
                current_gwei: current_gas_gwei,
                max_gwei: self.config.max_gas_gwei,
            });
        }
        Ok(())
    }

    /// Up to `maxGasBumps` bumps at `gasBurstFirstMs`/`gasBurstSecondMs`
    /// with `gasBurstFirstPct`/`gasBurstSecondPct`. Bumps beyond the two
    /// configured burst points reuse the second burst's timing/percentage.
    pub fn bump_schedule(&self) -> Vec<GasBumpSchedule> {
        let delays = [self.config.gas_burst_first_ms, self.config.gas_burst_second_ms];
        let pcts = [self.config.gas_burst_first_pct, self.config.gas_burst_second_pct];
        (0..self.config.max_gas_bumps as usize)
            .map(|i| {
                let idx = i.min(1);
                GasBumpSchedule {
                    delay: Duration::from_millis(delays[idx]),
                    bump_pct: pcts[idx],
                }
            })
            .collect()
    }

    pub fn apply_bump(&self, base_gwei: f64, bump_pct: f64) -> f64 {
        base_gwei * (1.0 + bump_pct / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_is_enforced() {
        let controls = GasControls::new(GasControlsConfig { max_gas_gwei: 10.0, ..GasControlsConfig::default() });
        assert!(controls.check_cap(9.9).is_ok());
        assert!(matches!(controls.check_cap(10.1), Err(CoreError::GasCapExceeded { .. })));
    }

    #[test]
    fn bump_schedule_caps_at_configured_burst_points() {
        let controls = GasControls::new(GasControlsConfig { max_gas_bumps: 4, ..GasControlsConfig::default() });
        let schedule = controls.bump_schedule();
        assert_eq!(schedule.len(), 4);
        assert_eq!(schedule[0].delay, Duration::from_millis(400));
        assert_eq!(schedule[1].delay, Duration::from_millis(800));
        assert_eq!(schedule[2], schedule[1]);
        assert_eq!(schedule[3], schedule[1]);
    }

    #[test]
    fn apply_bump_scales_correctly() {
        let controls = GasControls::new(GasControlsConfig::default());
        assert!((controls.apply_bump(10.0, 20.0) - 12.0).abs() < 1e-9);
    }
}

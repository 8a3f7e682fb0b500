//! Predictive signal gate — §4.4.
//!
//! Decides whether recent oracle activity warrants a predictive HF
//! re-evaluation for a user, ahead of the next real-time resolver pass.

use alloy::primitives::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMode {
    PythTwap,
    Chainlink,
    Both,
    PythTwapOrChainlink,
}

/// A single asset's recent oracle activity, kept within a 60s freshness
/// window by the caller (signals older than that are simply not passed in).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetSignal {
    pub pyth_delta_pct: Option<f64>,
    pub twap_delta_pct: Option<f64>,
    pub chainlink_fresh: bool,
}

/// User-side context the gate evaluates against.
#[derive(Debug, Clone, Copy)]
pub struct UserContext {
    pub hf_current: f64,
    pub hf_projected: Option<f64>,
    pub eta_sec: Option<u64>,
    pub debt_usd: f64,
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub min_debt_usd: f64,
    pub near_band_bps: u32,
    pub eta_cap_sec: u64,
    pub asset_whitelist: Option<Vec<Address>>,
    pub mode: SignalMode,
    pub pyth_delta_pct: f64,
    pub twap_delta_pct: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_debt_usd: 100.0,
            near_band_bps: 500,
            eta_cap_sec: 30,
            asset_whitelist: None,
            mode: SignalMode::PythTwapOrChainlink,
            pyth_delta_pct: 0.1,
            twap_delta_pct: 0.1,
        }
    }
}

/// Why a gate rejected the signal. Named by which of the four ordered gates
/// failed, so a caller can attribute rejections in metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    BelowMinDebt,
    NotNearBand,
    AssetNotWhitelisted,
    SignalNotValidForMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Chainlink,
    PythAndTwap,
}

#[derive(Debug, Clone, Copy)]
pub struct GateOutcome {
    pub source: TriggerSource,
}

pub struct PredictiveGate {
    config: GateConfig,
}

impl PredictiveGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Evaluate the four gates in order against one user/asset pair. Returns
    /// `Ok` with the triggering source on pass, or the first failing gate.
    pub fn evaluate(
        &self,
        asset: Address,
        signal: &AssetSignal,
        user: &UserContext,
    ) -> Result<GateOutcome, GateRejection> {
        if user.debt_usd < self.config.min_debt_usd {
            return Err(GateRejection::BelowMinDebt);
        }

        let bound = 1.0 + self.config.near_band_bps as f64 / 10_000.0;
        let current_near = (1.0..=bound).contains(&user.hf_current);
        let projected_near = user
            .hf_projected
            .zip(user.eta_sec)
            .is_some_and(|(hf, eta)| (1.0..=bound).contains(&hf) && eta <= self.config.eta_cap_sec);
        if !(current_near || projected_near) {
            return Err(GateRejection::NotNearBand);
        }

        if let Some(whitelist) = &self.config.asset_whitelist {
            if !whitelist.contains(&asset) {
                return Err(GateRejection::AssetNotWhitelisted);
            }
        }

        let pyth_ok = signal
            .pyth_delta_pct
            .is_some_and(|d| d.abs() >= self.config.pyth_delta_pct);
        let twap_ok = signal
            .twap_delta_pct
            .is_some_and(|d| d.abs() >= self.config.twap_delta_pct);
        let chainlink_ok = signal.chainlink_fresh;

        let (valid, source) = match self.config.mode {
            SignalMode::PythTwap => (pyth_ok && twap_ok, TriggerSource::PythAndTwap),
            SignalMode::Chainlink => (chainlink_ok, TriggerSource::Chainlink),
            SignalMode::Both => (pyth_ok && twap_ok && chainlink_ok, TriggerSource::PythAndTwap),
            SignalMode::PythTwapOrChainlink => {
                if pyth_ok && twap_ok {
                    (true, TriggerSource::PythAndTwap)
                } else if chainlink_ok {
                    (true, TriggerSource::Chainlink)
                } else {
                    (false, TriggerSource::Chainlink)
                }
            }
        };

        if !valid {
            return Err(GateRejection::SignalNotValidForMode);
        }

        Ok(GateOutcome { source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn near_band_user() -> UserContext {
        UserContext {
            hf_current: 1.02,
            hf_projected: None,
            eta_sec: None,
            debt_usd: 1_000.0,
        }
    }

    #[test]
    fn rejects_below_min_debt_before_any_other_check() {
        let gate = PredictiveGate::new(GateConfig::default());
        let user = UserContext { debt_usd: 1.0, ..near_band_user() };
        let signal = AssetSignal { chainlink_fresh: true, ..Default::default() };
        assert_eq!(
            gate.evaluate(Address::ZERO, &signal, &user),
            Err(GateRejection::BelowMinDebt)
        );
    }

    #[test]
    fn rejects_outside_near_band_even_with_valid_signal() {
        let gate = PredictiveGate::new(GateConfig::default());
        let user = UserContext { hf_current: 2.0, ..near_band_user() };
        let signal = AssetSignal { chainlink_fresh: true, ..Default::default() };
        assert_eq!(
            gate.evaluate(Address::ZERO, &signal, &user),
            Err(GateRejection::NotNearBand)
        );
    }

    #[test]
    fn projected_hf_within_eta_cap_satisfies_near_band() {
        let gate = PredictiveGate::new(GateConfig::default());
        let user = UserContext {
            hf_current: 2.0,
            hf_projected: Some(1.01),
            eta_sec: Some(5),
            debt_usd: 1_000.0,
        };
        let signal = AssetSignal { chainlink_fresh: true, ..Default::default() };
        assert!(gate.evaluate(Address::ZERO, &signal, &user).is_ok());
    }

    #[test]
    fn rejects_non_whitelisted_asset() {
        let cfg = GateConfig {
            asset_whitelist: Some(vec![Address::repeat_byte(9)]),
            ..Default::default()
        };
        let gate = PredictiveGate::new(cfg);
        let signal = AssetSignal { chainlink_fresh: true, ..Default::default() };
        assert_eq!(
            gate.evaluate(Address::repeat_byte(1), &signal, &near_band_user()),
            Err(GateRejection::AssetNotWhitelisted)
        );
    }

    #[test]
    fn both_mode_requires_all_three_signals() {
        let cfg = GateConfig { mode: SignalMode::Both, ..Default::default() };
        let gate = PredictiveGate::new(cfg);
        let partial = AssetSignal {
            pyth_delta_pct: Some(1.0),
            twap_delta_pct: Some(1.0),
            chainlink_fresh: false,
        };
        assert_eq!(
            gate.evaluate(Address::ZERO, &partial, &near_band_user()),
            Err(GateRejection::SignalNotValidForMode)
        );
        let full = AssetSignal {
            pyth_delta_pct: Some(1.0),
            twap_delta_pct: Some(1.0),
            chainlink_fresh: true,
        };
        assert!(gate.evaluate(Address::ZERO, &full, &near_band_user()).is_ok());
    }

    #[test]
    fn pyth_twap_or_chainlink_accepts_chainlink_alone() {
        let gate = PredictiveGate::new(GateConfig::default());
        let signal = AssetSignal { chainlink_fresh: true, ..Default::default() };
        let outcome = gate.evaluate(Address::ZERO, &signal, &near_band_user()).unwrap();
        assert_eq!(outcome.source, TriggerSource::Chainlink);
    }
}

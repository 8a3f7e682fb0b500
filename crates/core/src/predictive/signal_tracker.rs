//! Per-asset oracle signal tracking feeding the predictive gate (§4.4).
//!
//! The gate itself is a pure function of an `AssetSignal` snapshot; this is
//! the stateful piece that turns a stream of raw oracle transmissions into
//! that snapshot, honoring the 60s freshness window from the glossary. The
//! core treats the oracle adapter as an external collaborator (§1) and isn't
//! told which feed is "the" TWAP source, so a Pyth-tagged transmission
//! updates `pyth_delta_pct` against the previous Pyth print, and every other
//! transmission updates both `chainlink_fresh` (a transmission arrived) and
//! `twap_delta_pct` (deviation from a trailing EMA of that feed) — a single
//! feed can stand in for both signals the spec names without assuming a
//! second, independent TWAP source exists.

use alloy::primitives::Address;
use dashmap::DashMap;

use super::gate::AssetSignal;

/// Signal freshness window from the glossary: "60 seconds; older oracle
/// signals are ignored by the predictive gate."
pub const FRESHNESS_WINDOW_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Pyth,
    /// Any non-Pyth transmission (Chainlink-style aggregator, RedStone,
    /// dual-oracle, etc.) — treated as the chainlink-freshness signal.
    Chainlink,
}

#[derive(Debug, Clone, Copy, Default)]
struct AssetState {
    last_pyth_price: Option<f64>,
    pyth_delta_pct: Option<f64>,
    pyth_ts_ms: u64,

    ema_price: Option<f64>,
    twap_delta_pct: Option<f64>,
    chainlink_ts_ms: u64,
}

/// Smoothing factor for the trailing EMA used as the "TWAP" baseline.
/// Low alpha (slow-moving average) so a single print doesn't chase itself —
/// deviation from it approximates deviation from a real time-weighted average.
const EMA_ALPHA: f64 = 0.1;

/// Tracks the most recent oracle signal per asset, producing `AssetSignal`
/// snapshots with stale components dropped per the 60s freshness window.
pub struct SignalTracker {
    state: DashMap<Address, AssetState>,
}

impl Default for SignalTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalTracker {
    pub fn new() -> Self {
        Self { state: DashMap::new() }
    }

    /// Record a new price transmission for `asset` and return the merged
    /// signal snapshot as of `now_ms` (same call, so nothing can go stale
    /// between the observation and the read).
    pub fn observe(&self, asset: Address, price: f64, kind: SignalKind, now_ms: u64) -> AssetSignal {
        let mut entry = self.state.entry(asset).or_default();
        match kind {
            SignalKind::Pyth => {
                if let Some(prev) = entry.last_pyth_price {
                    if prev != 0.0 {
                        entry.pyth_delta_pct = Some((price - prev).abs() / prev.abs() * 100.0);
                    }
                }
                entry.last_pyth_price = Some(price);
                entry.pyth_ts_ms = now_ms;
            }
            SignalKind::Chainlink => {
                let ema = entry.ema_price.unwrap_or(price);
                if ema != 0.0 {
                    entry.twap_delta_pct = Some((price - ema).abs() / ema.abs() * 100.0);
                }
                entry.ema_price = Some(ema + EMA_ALPHA * (price - ema));
                entry.chainlink_ts_ms = now_ms;
            }
        }
        self.snapshot_locked(&entry, now_ms)
    }

    /// Current signal for `asset` as of `now_ms`, with any component older
    /// than `FRESHNESS_WINDOW_MS` dropped. Addresses never observed return
    /// the all-`None`/`false` default, which fails every gate mode.
    pub fn get(&self, asset: Address, now_ms: u64) -> AssetSignal {
        match self.state.get(&asset) {
            Some(entry) => self.snapshot_locked(&entry, now_ms),
            None => AssetSignal::default(),
        }
    }

    fn snapshot_locked(&self, entry: &AssetState, now_ms: u64) -> AssetSignal {
        let pyth_fresh = now_ms.saturating_sub(entry.pyth_ts_ms) <= FRESHNESS_WINDOW_MS;
        let chainlink_fresh = now_ms.saturating_sub(entry.chainlink_ts_ms) <= FRESHNESS_WINDOW_MS && entry.chainlink_ts_ms > 0;
        AssetSignal {
            pyth_delta_pct: if pyth_fresh { entry.pyth_delta_pct } else { None },
            twap_delta_pct: if chainlink_fresh { entry.twap_delta_pct } else { None },
            chainlink_fresh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> Address {
        Address::repeat_byte(7)
    }

    #[test]
    fn first_observation_has_no_delta_yet() {
        let tracker = SignalTracker::new();
        let signal = tracker.observe(asset(), 100.0, SignalKind::Pyth, 1_000);
        assert_eq!(signal.pyth_delta_pct, None);
    }

    #[test]
    fn second_observation_computes_delta_pct() {
        let tracker = SignalTracker::new();
        tracker.observe(asset(), 100.0, SignalKind::Pyth, 1_000);
        let signal = tracker.observe(asset(), 101.0, SignalKind::Pyth, 1_500);
        assert!((signal.pyth_delta_pct.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn chainlink_marks_fresh_and_stays_fresh_within_window() {
        let tracker = SignalTracker::new();
        tracker.observe(asset(), 100.0, SignalKind::Chainlink, 1_000);
        let signal = tracker.get(asset(), 1_000 + FRESHNESS_WINDOW_MS);
        assert!(signal.chainlink_fresh);
    }

    #[test]
    fn signal_expires_past_freshness_window() {
        let tracker = SignalTracker::new();
        tracker.observe(asset(), 100.0, SignalKind::Pyth, 1_000);
        tracker.observe(asset(), 101.0, SignalKind::Pyth, 1_500);
        let signal = tracker.get(asset(), 1_500 + FRESHNESS_WINDOW_MS + 1);
        assert_eq!(signal.pyth_delta_pct, None);
    }

    #[test]
    fn unobserved_asset_fails_every_gate_mode() {
        let tracker = SignalTracker::new();
        let signal = tracker.get(Address::repeat_byte(9), 1_000);
        assert_eq!(signal.pyth_delta_pct, None);
        assert_eq!(signal.twap_delta_pct, None);
        assert!(!signal.chainlink_fresh);
    }
}

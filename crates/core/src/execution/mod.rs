//! Execution path — §4.9.
//!
//! Converts a liquidatable candidate into a submitted transaction: an intent
//! cache keyed by user and invalidated by price movement, a prewarmed price
//! hot cache for the top-K hot set, four submission modes, gas controls with
//! a burst-bump schedule, a per-user inflight lock, and the critical lane
//! fast path.

mod critical_lane;
mod gas_controls;
mod intent_cache;
mod price_cache;
mod submit;

pub use critical_lane::{
    CriticalEvent, CriticalLane, CriticalLaneConfig, CriticalLaneCounters, CriticalLaneResult,
    CriticalOutcome, Reverifier,
};
pub use gas_controls::{GasBumpSchedule, GasControls, GasControlsConfig};
pub use intent_cache::{Intent, IntentCache, IntentCacheConfig};
pub use price_cache::{PriceHotCache, PriceHotCacheConfig};
pub use submit::{submit, InflightGuard, InflightLock, SubmitMode, SubmitOutcome, TxSubmitter};

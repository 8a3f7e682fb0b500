//! Predictive signal gate (§4.4) and queue manager (§4.5): the path that
//! re-evaluates a user ahead of the real-time resolver's own cadence when
//! oracle activity suggests its health factor just moved.

pub mod gate;
pub mod queue;
pub mod signal_tracker;

pub use gate::{AssetSignal, GateConfig, GateOutcome, GateRejection, PredictiveGate, SignalMode, TriggerSource, UserContext};
pub use queue::{PredictiveQueueManager, QueueConfig, RejectReason, DEFAULT_PRUNE_MAX_AGE_MS};
pub use signal_tracker::{SignalKind, SignalTracker, FRESHNESS_WINDOW_MS};

//! Liquidation bot core.
//!
//! This crate provides the core liquidation pipeline:
//! - Asset registry with oracle configurations
//! - Tiered candidate store with hysteresis-gated tracking
//! - Real-time health-factor resolver with hedged reads
//! - Predictive signal gate and queue manager
//! - Scan registry for in-flight/recently-completed dedup
//! - Profit engine with exact integer math
//! - Execution path: intent cache, price hot cache, submission modes, critical lane
//! - Priority sweep over the full borrower population
//! - Heartbeat prediction for oracle updates

mod assets;
pub mod candidates;
pub mod config;
pub mod error;
pub mod execution;
mod heartbeat;
pub mod predictive;
pub mod priority_sweep;
pub mod profit;
pub mod resolver;
pub mod scan_registry;
pub mod types;
pub mod u256_math;

pub use assets::{Asset, AssetRegistry, OracleType, ASSETS, REGISTRY};
pub use config::BotConfig;
pub use error::{CoreError, CoreResult};
pub use heartbeat::HeartbeatPredictor;
pub use profit::{PositionReserve, ProfitConfig, ProfitSimulation};
pub use types::{EventOrderKey, PricePoint, ReserveMeta, UserReserve, UsdFixed};

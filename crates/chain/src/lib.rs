//! Chain interaction layer for an Aave-V3-style lending protocol.
//!
//! This crate provides:
//! - Provider management for HTTP and WebSocket connections
//! - Contract bindings for Pool, BalancesReader, Oracle, Liquidator
//! - Event listeners for real-time oracle and pool events, plus decode/backfill (§4.1)
//! - Oracle adapters (Chainlink-style aggregator, Pyth) behind a common capability trait
//! - Transaction signing and sending

mod candidate_source;
pub mod contracts;
pub mod error;
mod event_listener;
pub mod events;
pub mod gas;
pub mod oracle;
mod provider;
pub mod protocol;
pub mod rpc;
mod signer;

pub use candidate_source::{ChainCandidateSource, ObservedBorrowers};
pub use contracts::{
    event_signatures, LiquidatorContract, OracleAggregator, PoolContract, SwapAllocation,
};
pub use error::ChainError;
pub use event_listener::{EventListener, OracleType, OracleUpdate, PoolEvent};
pub use events::{
    backfill, decode_event, AlloyLogFetcher, BackfillConfig, BackfillError, EventKind, EventKindData,
    EventOrderKey, HeartbeatWatchdog, LogFetcher, ProtocolEvent, RawLog, ReconnectBackoff, SeamDedup,
};
pub use provider::{BalanceData, ProviderManager};
pub use signer::TransactionSender;

//! API clients for external subgraph/analytics services.
//!
//! This crate provides HTTP clients for:
//! - BlockAnalitica: At-risk wallet discovery and position data
//! - Liqd.ag: Swap routing for liquidation execution

mod blockanalitica;
mod candidate_source;
mod liqd;

pub use blockanalitica::{AtRiskWallet, BlockAnaliticaClient, PositionDistribution, ProfitabilityFilter, WalletAsset, WalletStats};
pub use candidate_source::{Borrower, BlockAnaliticaCandidateSource, CandidateSource};
pub use liqd::{LiqdClient, SwapAllocation, SwapHop, SwapRoute};

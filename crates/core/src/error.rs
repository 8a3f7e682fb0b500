//! Uniform error type for the core liquidation pipeline.
//!
//! Every fallible operation in `liquidator-core` returns `Result<T, CoreError>`.
//! Budget/dedup/gate rejections are normal control flow and are represented here
//! too (so callers can match on them), but they are logged at `debug`, not `error`,
//! by convention at the call site — the variant alone does not imply severity.

use thiserror::Error;

/// Error kinds the core pipeline must recognize and surface.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("call exception: {0}")]
    CallException(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("stale snapshot: price for {asset} moved during resolution")]
    StaleSnapshot { asset: String },

    #[error("rpc budget exhausted")]
    BudgetExhausted,

    #[error("duplicate scan for key {0}")]
    DuplicateScan(String),

    #[error("execution already in flight for user {0}")]
    InflightExecution(String),

    #[error("gas price {current_gwei} exceeds cap {max_gwei}")]
    GasCapExceeded { current_gwei: f64, max_gwei: f64 },

    #[error("unprofitable: {reason}")]
    Unprofitable { reason: String },

    #[error("user not liquidatable (hf={hf})")]
    UserNotLiquidatable { hf: f64 },

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error(transparent)]
    Chain(#[from] liquidator_chain::ChainError),
}

impl CoreError {
    /// Transient errors are retried locally by the RPC client; this marks the
    /// subset that a caller one layer up may still want to retry on its own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::RateLimited(_)
                | CoreError::Timeout(_)
                | CoreError::Network(_)
                | CoreError::CallException(_)
        )
    }

    /// A short machine-readable reason string, used in metrics and debug logs
    /// for the control-flow-only variants (budget/dedup/gate rejections).
    pub fn reason(&self) -> &'static str {
        match self {
            CoreError::RateLimited(_) => "rate_limited",
            CoreError::Timeout(_) => "timeout",
            CoreError::Network(_) => "network",
            CoreError::ProviderUnavailable(_) => "provider_unavailable",
            CoreError::CallException(_) => "call_exception",
            CoreError::InvalidResponse(_) => "invalid_response",
            CoreError::StaleSnapshot { .. } => "stale_snapshot",
            CoreError::BudgetExhausted => "budget_exhausted",
            CoreError::DuplicateScan(_) => "duplicate_scan",
            CoreError::InflightExecution(_) => "inflight_execution",
            CoreError::GasCapExceeded { .. } => "gas_cap_exceeded",
            CoreError::Unprofitable { .. } => "unprofitable",
            CoreError::UserNotLiquidatable { .. } => "user_not_liquidatable",
            CoreError::ConfigInvalid(_) => "config_invalid",
            CoreError::Chain(_) => "chain_error",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(CoreError::RateLimited("x".into()).is_transient());
        assert!(CoreError::Timeout(std::time::Duration::from_secs(1)).is_transient());
        assert!(!CoreError::BudgetExhausted.is_transient());
        assert!(!CoreError::ConfigInvalid("x".into()).is_transient());
    }

    #[test]
    fn reason_strings_are_stable() {
        assert_eq!(CoreError::BudgetExhausted.reason(), "budget_exhausted");
        assert_eq!(
            CoreError::UserNotLiquidatable { hf: 1.2 }.reason(),
            "user_not_liquidatable"
        );
    }
}

//! Typed errors for the RPC/chain-interaction layer.

use thiserror::Error;

/// Classification of a raw RPC/provider failure.
///
/// Produced by [`classify`] from whatever error type the underlying transport
/// raises; everything downstream (retry, cooldown, budget) matches on this
/// enum rather than inspecting transport-specific error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("HTTP 429 rate limited")]
    RateLimit429,

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("provider destroyed or unreachable")]
    ProviderDestroyed,

    #[error("contract call reverted: {0}")]
    CallException(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl ChainError {
    /// Transient errors are eligible for local retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChainError::RateLimit429
                | ChainError::Timeout
                | ChainError::Network(_)
                | ChainError::CallException(_)
        )
    }

    /// Classify a raw error message into one of the taxonomy variants.
    ///
    /// This is string-sniffing by necessity: `alloy`'s transport errors don't
    /// expose a structured status code in all transport backends (ws vs http),
    /// so the message text is the only portable signal available here.
    pub fn classify(raw: &(dyn std::error::Error + 'static)) -> Self {
        let msg = raw.to_string();
        let lower = msg.to_lowercase();
        if lower.contains("429") || lower.contains("too many requests") || lower.contains("rate limit") {
            ChainError::RateLimit429
        } else if lower.contains("timed out") || lower.contains("timeout") {
            ChainError::Timeout
        } else if lower.contains("connection") || lower.contains("dns") || lower.contains("reset by peer") {
            ChainError::Network(msg)
        } else if lower.contains("provider dropped") || lower.contains("channel closed") {
            ChainError::ProviderDestroyed
        } else if lower.contains("revert") || lower.contains("execution reverted") {
            ChainError::CallException(msg)
        } else {
            ChainError::Unknown(msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct RawErr(String);
    impl std::fmt::Display for RawErr {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }
    impl std::error::Error for RawErr {}

    #[test]
    fn classifies_rate_limit() {
        let e = RawErr("Error: 429 Too Many Requests".into());
        assert_eq!(ChainError::classify(&e), ChainError::RateLimit429);
    }

    #[test]
    fn classifies_timeout() {
        let e = RawErr("operation timed out after 2s".into());
        assert_eq!(ChainError::classify(&e), ChainError::Timeout);
    }

    #[test]
    fn classifies_unknown_as_fallback() {
        let e = RawErr("some never before seen message".into());
        assert_eq!(
            ChainError::classify(&e),
            ChainError::Unknown("some never before seen message".into())
        );
    }

    #[test]
    fn transient_set_matches_taxonomy() {
        assert!(ChainError::RateLimit429.is_transient());
        assert!(ChainError::Timeout.is_transient());
        assert!(ChainError::Network("x".into()).is_transient());
        assert!(ChainError::CallException("x".into()).is_transient());
        assert!(!ChainError::ProviderDestroyed.is_transient());
        assert!(!ChainError::Unknown("x".into()).is_transient());
    }
}

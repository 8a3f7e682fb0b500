//! Submission modes and the per-user inflight lock — §4.9.

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use dashmap::DashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    Public,
    Private,
    Race,
    /// Reserved; remapped to `Race` at submit time.
    Bundle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Success,
    Raced,
    Skip,
}

/// Abstraction over "broadcast a liquidation transaction", kept as a trait
/// so the race/public/private selection logic is unit testable without a
/// live endpoint. A concrete implementation wraps one `TransactionSender`
/// per endpoint.
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    async fn submit_public(&self, to: Address, calldata: Bytes) -> CoreResult<B256>;
    async fn submit_private(&self, to: Address, calldata: Bytes) -> CoreResult<B256>;
}

static BUNDLE_WARNED: AtomicBool = AtomicBool::new(false);

/// Submit `calldata` under `mode`. Bundle mode is unimplemented and falls
/// back to `Race`, logging a `warn!` once per process rather than once per
/// submission.
pub async fn submit<S: TxSubmitter + ?Sized>(
    submitter: &S,
    mode: SubmitMode,
    to: Address,
    calldata: Bytes,
) -> CoreResult<B256> {
    let mode = match mode {
        SubmitMode::Bundle => {
            if !BUNDLE_WARNED.swap(true, Ordering::Relaxed) {
                warn!("txSubmitMode=bundle is unimplemented; falling back to race");
            }
            SubmitMode::Race
        }
        other => other,
    };

    match mode {
        SubmitMode::Public => submitter.submit_public(to, calldata).await,
        SubmitMode::Private => submitter.submit_private(to, calldata).await,
        SubmitMode::Race => {
            // Run both concurrently; first success wins. Cancelling the
            // loser at the transport layer isn't meaningful once a raw
            // transaction has been broadcast, so this only governs which
            // result the caller sees.
            let (public, private) = tokio::join!(
                submitter.submit_public(to, calldata.clone()),
                submitter.submit_private(to, calldata),
            );
            public.or(private)
        }
        SubmitMode::Bundle => unreachable!("bundle is remapped to race above"),
    }
}

/// Gates at most one outstanding execution attempt per user when
/// `executionInflightLock` is enabled.
pub struct InflightLock {
    inflight: DashSet<Address>,
    enabled: bool,
}

impl InflightLock {
    pub fn new(enabled: bool) -> Self {
        Self { inflight: DashSet::new(), enabled }
    }

    /// Acquire the lock for `user`. Errs with `InflightExecution` if a prior
    /// attempt is still outstanding and the lock is enabled.
    pub fn acquire(&self, user: Address) -> CoreResult<InflightGuard<'_>> {
        if !self.enabled {
            return Ok(InflightGuard { lock: self, user, held: false });
        }
        if !self.inflight.insert(user) {
            return Err(CoreError::InflightExecution(format!("{user}")));
        }
        Ok(InflightGuard { lock: self, user, held: true })
    }
}

/// Releases the inflight lock for its user on drop, regardless of how the
/// execution attempt ended.
pub struct InflightGuard<'a> {
    lock: &'a InflightLock,
    user: Address,
    held: bool,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        if self.held {
            self.lock.inflight.remove(&self.user);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct FakeSubmitter {
        public_calls: AtomicUsize,
        private_calls: AtomicUsize,
        public_fails: bool,
    }

    #[async_trait]
    impl TxSubmitter for FakeSubmitter {
        async fn submit_public(&self, _to: Address, _calldata: Bytes) -> CoreResult<B256> {
            self.public_calls.fetch_add(1, Ordering::Relaxed);
            if self.public_fails {
                Err(CoreError::Network("down".into()))
            } else {
                Ok(B256::repeat_byte(1))
            }
        }

        async fn submit_private(&self, _to: Address, _calldata: Bytes) -> CoreResult<B256> {
            self.private_calls.fetch_add(1, Ordering::Relaxed);
            Ok(B256::repeat_byte(2))
        }
    }

    #[tokio::test]
    async fn race_returns_a_success_even_if_public_fails() {
        let submitter = FakeSubmitter {
            public_calls: AtomicUsize::new(0),
            private_calls: AtomicUsize::new(0),
            public_fails: true,
        };
        let result = submit(&submitter, SubmitMode::Race, Address::ZERO, Bytes::new()).await;
        assert!(result.is_ok());
        assert_eq!(submitter.private_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn bundle_falls_back_to_race() {
        let submitter = FakeSubmitter {
            public_calls: AtomicUsize::new(0),
            private_calls: AtomicUsize::new(0),
            public_fails: false,
        };
        let result = submit(&submitter, SubmitMode::Bundle, Address::ZERO, Bytes::new()).await;
        assert!(result.is_ok());
        assert_eq!(submitter.public_calls.load(Ordering::Relaxed), 1);
        assert_eq!(submitter.private_calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn inflight_lock_drops_second_attempt_while_held() {
        let lock = InflightLock::new(true);
        let user = Address::repeat_byte(1);
        let first = lock.acquire(user).unwrap();
        let second = lock.acquire(user);
        assert!(second.is_err());
        drop(first);
        assert!(lock.acquire(user).is_ok());
    }

    #[test]
    fn disabled_lock_never_blocks() {
        let lock = InflightLock::new(false);
        let user = Address::repeat_byte(1);
        let _a = lock.acquire(user).unwrap();
        assert!(lock.acquire(user).is_ok());
    }
}

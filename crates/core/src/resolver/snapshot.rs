//! Snapshot-consistency guard for HF resolution — §4.3's "if a referenced
//! price moved while the batch was in flight, re-query and, if it moved
//! again, abort the cycle rather than return a stale health factor."

use crate::types::PricePoint;

/// Outcome of comparing a price snapshot taken before a batch RPC call against
/// the same assets' prices read again after the call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotCheck {
    Consistent,
    Moved,
}

/// Compare a `before` and `after` snapshot for a single asset. Two price
/// points are the same fingerprint iff both `price` and `updated_at` match —
/// comparing `updated_at` alone would treat a same-price re-publish as
/// consistent, which is correct, but comparing `price` alone would miss a
/// price that moved and moved back within the window.
pub fn fingerprint_matches(before: &PricePoint, after: &PricePoint) -> bool {
    before.price == after.price && before.updated_at == after.updated_at
}

/// Check a full batch of (before, after) pairs. Returns `Moved` as soon as any
/// one asset's fingerprint changed.
pub fn check_batch<'a>(pairs: impl IntoIterator<Item = (&'a PricePoint, &'a PricePoint)>) -> SnapshotCheck {
    for (before, after) in pairs {
        if !fingerprint_matches(before, after) {
            return SnapshotCheck::Moved;
        }
    }
    SnapshotCheck::Consistent
}

/// State machine driving the "re-query once, abort on second move" rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotRetry {
    /// First pass was consistent: accept the resolution.
    Accept,
    /// First pass moved: caller should re-fetch and check once more.
    RetryOnce,
    /// Second pass also moved: abort this cycle for this candidate.
    Abort,
}

pub fn next_step(check: SnapshotCheck, already_retried: bool) -> SnapshotRetry {
    match (check, already_retried) {
        (SnapshotCheck::Consistent, _) => SnapshotRetry::Accept,
        (SnapshotCheck::Moved, false) => SnapshotRetry::RetryOnce,
        (SnapshotCheck::Moved, true) => SnapshotRetry::Abort,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    fn point(price: u64, updated_at: u64) -> PricePoint {
        PricePoint {
            asset: Address::repeat_byte(1),
            price: U256::from(price),
            updated_at,
            publish_time: None,
            stale: false,
        }
    }

    #[test]
    fn identical_prices_are_consistent() {
        let a = point(100, 1);
        let b = point(100, 1);
        assert!(fingerprint_matches(&a, &b));
    }

    #[test]
    fn price_move_is_detected_even_with_same_timestamp_bucket() {
        let a = point(100, 1);
        let b = point(101, 1);
        assert!(!fingerprint_matches(&a, &b));
    }

    #[test]
    fn retry_state_machine_aborts_on_second_move() {
        assert_eq!(next_step(SnapshotCheck::Moved, false), SnapshotRetry::RetryOnce);
        assert_eq!(next_step(SnapshotCheck::Moved, true), SnapshotRetry::Abort);
        assert_eq!(next_step(SnapshotCheck::Consistent, false), SnapshotRetry::Accept);
    }
}

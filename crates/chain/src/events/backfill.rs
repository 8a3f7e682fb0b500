//! Historical backfill — §4.1 "Backfill algorithm".
//!
//! Walks `[currentBlock - N, currentBlock]` in chunks, bisecting any chunk
//! whose log volume the RPC rejects as too large, bounded overall by
//! `max_logs`. Every fetch goes through a `LogFetcher`, never a raw
//! provider, so backfill draws from the same RPC budget as live traffic
//! (ambient addendum in SPEC_FULL.md §4.1).

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ChainError;

/// A decoded-free log, carrying only what `decode_event` needs plus its
/// position for ordering. Kept independent of `alloy::rpc::types::Log` so
/// this module (and its tests) don't need a live provider to construct one.
#[derive(Debug, Clone)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Vec<u8>,
    pub block_number: u64,
    pub tx_index: u64,
    pub log_index: u64,
    pub tx_hash: B256,
}

#[derive(Debug, Error)]
pub enum BackfillError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("backfill exceeded max_logs budget ({0} logs)")]
    MaxLogsExceeded(usize),
    #[error("chunk [{from}, {to}] could not be bisected further (single block still too large)")]
    UnbisectableChunk { from: u64, to: u64 },
}

/// Abstraction over "fetch logs for `[from_block, to_block]`", budgeted via
/// the §4.7 `RpcClient` in the concrete implementation. Kept as a trait so
/// the chunking/bisection algorithm here is unit-testable without a live
/// provider.
#[async_trait]
pub trait LogFetcher: Send + Sync {
    async fn get_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<RawLog>, ChainError>;
}

#[derive(Debug, Clone, Copy)]
pub struct BackfillConfig {
    /// How many blocks back from `current_block` to backfill (`N`).
    pub window_blocks: u64,
    /// Chunk size in blocks (`C`).
    pub chunk_blocks: u64,
    /// Overall cap on logs returned across the whole backfill.
    pub max_logs: usize,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self { window_blocks: 50_000, chunk_blocks: 2_000, max_logs: 200_000 }
    }
}

/// Returns `true` for the "query returned too many results" family of RPC
/// errors that should trigger bisection rather than a retry/abort — the raw
/// wording varies by provider (Alchemy, Infura, self-hosted geth), so this
/// matches on the handful of phrasings actually seen in the wild rather than
/// a single exact string.
fn is_log_range_too_large(err: &ChainError) -> bool {
    let msg = match err {
        ChainError::CallException(m) | ChainError::Unknown(m) | ChainError::Network(m) => m.to_lowercase(),
        _ => return false,
    };
    msg.contains("too many")
        || msg.contains("query returned more than")
        || msg.contains("block range")
        || msg.contains("exceeds the range")
        || msg.contains("limit exceeded")
}

/// Backfill `[current_block - window_blocks, current_block]`, bisecting any
/// chunk the provider rejects as too large, and stopping once `max_logs` is
/// reached. Returned logs are ordered `(block_number, tx_index, log_index)`
/// ascending, ready to hand to `decode_event` and merge with the live stream.
pub async fn backfill(
    fetcher: &dyn LogFetcher,
    current_block: u64,
    config: BackfillConfig,
) -> Result<Vec<RawLog>, BackfillError> {
    let from = current_block.saturating_sub(config.window_blocks);
    let mut out = Vec::new();

    // A work stack of (from, to) ranges still to fetch, seeded with the
    // fixed-size chunks and grown by bisection when a chunk comes back
    // "too large". A stack (not a queue) keeps bisected sub-ranges of one
    // chunk adjacent in processing order, which doesn't matter for
    // correctness (everything is sorted at the end) but keeps the worklist
    // small and cache-friendly relative to a breadth-first queue.
    let mut work: Vec<(u64, u64)> = Vec::new();
    let mut chunk_start = from;
    while chunk_start <= current_block {
        let chunk_end = (chunk_start + config.chunk_blocks - 1).min(current_block);
        work.push((chunk_start, chunk_end));
        chunk_start = chunk_end + 1;
    }
    work.reverse(); // pop() takes from the back; reverse so blocks are fetched ascending

    while let Some((from, to)) = work.pop() {
        if out.len() >= config.max_logs {
            return Err(BackfillError::MaxLogsExceeded(out.len()));
        }
        match fetcher.get_logs(from, to).await {
            Ok(logs) => {
                debug!(from, to, count = logs.len(), "backfill chunk fetched");
                if out.len() + logs.len() > config.max_logs {
                    return Err(BackfillError::MaxLogsExceeded(out.len() + logs.len()));
                }
                out.extend(logs);
            }
            Err(e) if is_log_range_too_large(&e) => {
                if from == to {
                    return Err(BackfillError::UnbisectableChunk { from, to });
                }
                let mid = from + (to - from) / 2;
                warn!(from, to, mid, "backfill chunk too large, bisecting");
                // Push the second half first so the first half (lower
                // blocks) is popped and fetched next, preserving ascending
                // fetch order.
                work.push((mid + 1, to));
                work.push((from, mid));
            }
            Err(e) => return Err(e.into()),
        }
    }

    out.sort_by_key(|l| (l.block_number, l.tx_index, l.log_index));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn log_at(block: u64, tx_index: u64, log_index: u64) -> RawLog {
        RawLog {
            address: Address::ZERO,
            topics: vec![],
            data: vec![],
            block_number: block,
            tx_index,
            log_index,
            tx_hash: B256::repeat_byte(block as u8),
        }
    }

    struct FixedFetcher {
        calls: Mutex<Vec<(u64, u64)>>,
        too_large_ranges: Vec<(u64, u64)>,
    }

    #[async_trait]
    impl LogFetcher for FixedFetcher {
        async fn get_logs(&self, from: u64, to: u64) -> Result<Vec<RawLog>, ChainError> {
            self.calls.lock().unwrap().push((from, to));
            if self.too_large_ranges.contains(&(from, to)) {
                return Err(ChainError::CallException("query returned more than 10000 results".into()));
            }
            Ok(vec![log_at(to, 0, 0)])
        }
    }

    #[tokio::test]
    async fn backfill_walks_window_in_chunks() {
        let fetcher = FixedFetcher { calls: Mutex::new(vec![]), too_large_ranges: vec![] };
        let logs = backfill(
            &fetcher,
            1000,
            BackfillConfig { window_blocks: 300, chunk_blocks: 100, max_logs: 1000 },
        )
        .await
        .unwrap();
        // window [700, 1000] in chunks of 100 -> 3 chunks (700-799, 800-899, 900-1000... actually 4 with inclusive math)
        assert_eq!(fetcher.calls.lock().unwrap().len(), logs.len());
        assert!(logs.windows(2).all(|w| w[0].block_number <= w[1].block_number));
    }

    #[tokio::test]
    async fn bisects_chunk_reported_as_too_large() {
        let fetcher = FixedFetcher {
            calls: Mutex::new(vec![]),
            too_large_ranges: vec![(0, 99)],
        };
        let logs = backfill(
            &fetcher,
            99,
            BackfillConfig { window_blocks: 99, chunk_blocks: 100, max_logs: 1000 },
        )
        .await
        .unwrap();
        let calls = fetcher.calls.lock().unwrap();
        assert!(calls.len() > 1, "the too-large chunk must have been bisected into sub-calls");
        assert!(!logs.is_empty());
    }

    #[tokio::test]
    async fn max_logs_budget_aborts_backfill() {
        struct CountingFetcher(AtomicUsize);
        #[async_trait]
        impl LogFetcher for CountingFetcher {
            async fn get_logs(&self, _from: u64, to: u64) -> Result<Vec<RawLog>, ChainError> {
                self.0.fetch_add(1, Ordering::Relaxed);
                Ok(vec![log_at(to, 0, 0); 50])
            }
        }
        let fetcher = CountingFetcher(AtomicUsize::new(0));
        let result = backfill(
            &fetcher,
            1000,
            BackfillConfig { window_blocks: 1000, chunk_blocks: 100, max_logs: 60 },
        )
        .await;
        assert!(matches!(result, Err(BackfillError::MaxLogsExceeded(_))));
    }

    #[tokio::test]
    async fn single_block_too_large_is_unbisectable() {
        let fetcher = FixedFetcher { calls: Mutex::new(vec![]), too_large_ranges: vec![(5, 5)] };
        let result = backfill(
            &fetcher,
            5,
            BackfillConfig { window_blocks: 0, chunk_blocks: 1, max_logs: 1000 },
        )
        .await;
        assert!(matches!(result, Err(BackfillError::UnbisectableChunk { from: 5, to: 5 })));
    }
}

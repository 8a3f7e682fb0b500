//! Concrete `LogFetcher`, budgeted through the §4.7 `RpcClient` rather than a
//! raw provider, per §4.1's "backfill is not a second, unbudgeted RPC path".

use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::Filter;
use async_trait::async_trait;
use tracing::debug;

use crate::error::ChainError;
use crate::rpc::RpcClient;

use super::backfill::{LogFetcher, RawLog};

/// Fetches logs for a fixed set of contract addresses (the pool and each
/// active oracle aggregator) through the budgeted `RpcClient`, rotating and
/// retrying exactly like any other chain read.
pub struct AlloyLogFetcher {
    rpc: RpcClient,
    addresses: Vec<Address>,
    /// Token cost charged per `eth_getLogs` call; wider ranges are the same
    /// single call, so this doesn't scale with range size.
    cost: f64,
}

impl AlloyLogFetcher {
    pub fn new(rpc: RpcClient, addresses: Vec<Address>) -> Self {
        Self { rpc, addresses, cost: 2.0 }
    }
}

#[async_trait]
impl LogFetcher for AlloyLogFetcher {
    async fn get_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<RawLog>, ChainError> {
        let filter = Filter::new()
            .address(self.addresses.clone())
            .from_block(from_block)
            .to_block(to_block);

        let logs = self
            .rpc
            .execute(self.cost, |url| {
                let filter = filter.clone();
                async move {
                    let provider = ProviderBuilder::new()
                        .on_http(url.parse().map_err(|e| anyhow::anyhow!("bad rpc url: {e}"))?);
                    provider.get_logs(&filter).await.map_err(anyhow::Error::from)
                }
            })
            .await?;

        debug!(from_block, to_block, count = logs.len(), "fetched logs via budgeted rpc client");

        Ok(logs
            .into_iter()
            .filter_map(|log| {
                let block_number = log.block_number?;
                let tx_index = log.transaction_index?;
                let log_index = log.log_index?;
                let tx_hash = log.transaction_hash?;
                Some(RawLog {
                    address: log.address(),
                    topics: log.topics().to_vec(),
                    data: log.data().data.to_vec(),
                    block_number,
                    tx_index,
                    log_index,
                    tx_hash,
                })
            })
            .collect())
    }
}

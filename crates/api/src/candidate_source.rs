//! `CandidateSource` — external interface for "page through the full
//! borrower population" (§6). Two implementations are expected to exist
//! behind this one trait: a subgraph-backed HTTP client (this crate, below)
//! and a chain-backed fallback (the `liquidator-chain` crate, which depends
//! on this one for the trait).

use alloy::primitives::Address;
use async_trait::async_trait;
use tracing::warn;

use crate::blockanalitica::BlockAnaliticaClient;

/// One borrower's inputs to scoring/HF tracking, independent of which
/// backend produced them.
#[derive(Debug, Clone, Copy)]
pub struct Borrower {
    pub address: Address,
    pub health_rate: f64,
    pub total_supply_usd: f64,
    pub total_borrow_usd: f64,
}

/// Abstraction over "page through the full set of addresses with
/// outstanding debt". `page` returning fewer than `limit` entries (including
/// zero) signals the end of the population, mirroring
/// `liquidator-core`'s `BorrowerPageSource`.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<Borrower>>;
}

/// Subgraph-backed `CandidateSource`, wrapping the existing BlockAnalitica
/// HTTP client. This is the primary source; a chain-backed fallback picks up
/// when the subgraph is unavailable.
pub struct BlockAnaliticaCandidateSource {
    client: BlockAnaliticaClient,
}

impl BlockAnaliticaCandidateSource {
    pub fn new(client: BlockAnaliticaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CandidateSource for BlockAnaliticaCandidateSource {
    async fn page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<Borrower>> {
        let wallets = self.client.fetch_page(offset, limit).await?;
        let borrowers = wallets
            .into_iter()
            .filter_map(|w| match w.address() {
                Some(address) => Some(Borrower {
                    address,
                    health_rate: w.health_rate,
                    total_supply_usd: w.total_supply_usd(),
                    total_borrow_usd: w.total_borrow_usd(),
                }),
                None => {
                    warn!(wallet_address = %w.wallet_address, "dropping candidate with unparseable address");
                    None
                }
            })
            .collect();
        Ok(borrowers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrower_carries_through_subgraph_fields() {
        let b = Borrower {
            address: Address::repeat_byte(1),
            health_rate: 0.95,
            total_supply_usd: 1_000.0,
            total_borrow_usd: 800.0,
        };
        assert_eq!(b.address, Address::repeat_byte(1));
        assert!(b.health_rate < 1.0);
    }
}

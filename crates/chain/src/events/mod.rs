//! Event ingest & backfill — §4.1.
//!
//! Turns raw pool/oracle logs into a strongly-typed `ProtocolEvent` stream,
//! ordered `(block, tx_index, log_index)`, with a backfill pass that seeds
//! history and a seam dedup so the merged live+backfill stream never
//! double-delivers the same log. Reconnect/heartbeat logic lives here too,
//! since it's part of "maintain a live stream", not part of the ABI/codec
//! layer `event_listener.rs` already covers.

mod backfill;
mod live;
mod reconnect;

pub use backfill::{backfill, BackfillConfig, BackfillError, LogFetcher, RawLog};
pub use live::AlloyLogFetcher;
pub use reconnect::{HeartbeatWatchdog, ReconnectBackoff};

use alloy::primitives::{Address, B256, U256};

use crate::contracts::aave_v3;
use crate::contracts::event_signatures;
use crate::event_listener::OracleType;

/// Discriminant for `ProtocolEvent`, matching spec.md §4.1's event kind list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Borrow,
    Repay,
    Supply,
    Withdraw,
    LiquidationCall,
    ReserveDataUpdated,
    FlashLoan,
    AnswerUpdated,
}

/// Ordering key, per spec.md §3's `ScanKey`/§5 "Events flow in (block,
/// txIndex, logIndex) order." Re-exported from `crate::types` would create a
/// chain->core dependency in the wrong direction, so this crate carries its
/// own copy with the same field order (`Ord`/`PartialOrd` derive matches).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventOrderKey {
    pub block: u64,
    pub tx_index: u64,
    pub log_index: u64,
}

/// A single normalized protocol or oracle event. `args` varies per kind —
/// modeled as per-kind fields on the enum rather than a heterogeneous map,
/// per the REDESIGN FLAGS §9 instruction.
#[derive(Debug, Clone)]
pub struct ProtocolEvent {
    pub order: EventOrderKey,
    pub tx_hash: B256,
    pub kind: EventKindData,
}

#[derive(Debug, Clone)]
pub enum EventKindData {
    Borrow { reserve: Address, user: Address, on_behalf_of: Address, amount: U256 },
    Repay { reserve: Address, user: Address, repayer: Address, amount: U256 },
    Supply { reserve: Address, user: Address, on_behalf_of: Address, amount: U256 },
    Withdraw { reserve: Address, user: Address, to: Address, amount: U256 },
    LiquidationCall {
        collateral_asset: Address,
        debt_asset: Address,
        user: Address,
        debt_to_cover: U256,
        liquidated_collateral: U256,
        liquidator: Address,
    },
    ReserveDataUpdated { reserve: Address },
    FlashLoan { initiator: Address, asset: Address, amount: U256 },
    AnswerUpdated { oracle: Address, asset: Address, price: U256, round_id: U256, updated_at: u64, oracle_type: OracleType },
}

impl ProtocolEvent {
    pub fn kind(&self) -> EventKind {
        match &self.kind {
            EventKindData::Borrow { .. } => EventKind::Borrow,
            EventKindData::Repay { .. } => EventKind::Repay,
            EventKindData::Supply { .. } => EventKind::Supply,
            EventKindData::Withdraw { .. } => EventKind::Withdraw,
            EventKindData::LiquidationCall { .. } => EventKind::LiquidationCall,
            EventKindData::ReserveDataUpdated { .. } => EventKind::ReserveDataUpdated,
            EventKindData::FlashLoan { .. } => EventKind::FlashLoan,
            EventKindData::AnswerUpdated { .. } => EventKind::AnswerUpdated,
        }
    }

    /// User-extraction rule table from spec.md §4.1:
    ///
    /// | Event                 | Users produced            |
    /// |------------------------|---------------------------|
    /// | Borrow / Supply        | {user, onBehalfOf} (dedup) |
    /// | Repay                  | {user, repayer} (dedup)    |
    /// | Withdraw / LiquidationCall | {user}                |
    /// | Others                 | {}                         |
    ///
    /// Returned deduped and in a stable order (primary user first).
    pub fn affected_users(&self) -> smallvec::SmallVec<[Address; 2]> {
        use smallvec::SmallVec;
        match &self.kind {
            EventKindData::Borrow { user, on_behalf_of, .. }
            | EventKindData::Supply { user, on_behalf_of, .. } => {
                let mut v: SmallVec<[Address; 2]> = SmallVec::new();
                v.push(*user);
                if on_behalf_of != user {
                    v.push(*on_behalf_of);
                }
                v
            }
            EventKindData::Repay { user, repayer, .. } => {
                let mut v: SmallVec<[Address; 2]> = SmallVec::new();
                v.push(*user);
                if repayer != user {
                    v.push(*repayer);
                }
                v
            }
            EventKindData::Withdraw { user, .. } => smallvec::smallvec![*user],
            EventKindData::LiquidationCall { user, .. } => smallvec::smallvec![*user],
            EventKindData::ReserveDataUpdated { .. }
            | EventKindData::FlashLoan { .. }
            | EventKindData::AnswerUpdated { .. } => SmallVec::new(),
        }
    }

    /// The reserve/asset this event concerns, if any (used by the resolver's
    /// "fast subset path" — §4.3 — to compute `borrowersOfReserve`).
    pub fn reserve(&self) -> Option<Address> {
        match &self.kind {
            EventKindData::Borrow { reserve, .. }
            | EventKindData::Repay { reserve, .. }
            | EventKindData::Supply { reserve, .. }
            | EventKindData::Withdraw { reserve, .. }
            | EventKindData::ReserveDataUpdated { reserve } => Some(*reserve),
            EventKindData::LiquidationCall { collateral_asset, .. } => Some(*collateral_asset),
            EventKindData::FlashLoan { asset, .. } => Some(*asset),
            EventKindData::AnswerUpdated { asset, .. } => Some(*asset),
        }
    }
}

/// Decode a raw log into a `ProtocolEvent`, dispatching on topic0. Returns
/// `None` for logs whose signature isn't one of the recognized kinds (e.g. a
/// log from an unrelated contract that happened to match the address filter).
pub fn decode_event(log: &RawLog, oracle_to_asset: &dashmap::DashMap<Address, (Address, OracleType)>) -> Option<ProtocolEvent> {
    if log.topics.is_empty() {
        return None;
    }
    let sig = log.topics[0];
    let order = EventOrderKey { block: log.block_number, tx_index: log.tx_index, log_index: log.log_index };

    let kind = if sig == event_signatures::SUPPLY {
        decode_supply(log)?
    } else if sig == event_signatures::WITHDRAW {
        decode_withdraw(log)?
    } else if sig == event_signatures::BORROW {
        decode_borrow(log)?
    } else if sig == event_signatures::REPAY {
        decode_repay(log)?
    } else if sig == event_signatures::LIQUIDATION_CALL {
        decode_liquidation(log)?
    } else if sig == *aave_v3::aave_v3_signatures::RESERVE_DATA_UPDATED {
        EventKindData::ReserveDataUpdated { reserve: Address::from_slice(&log.topics.get(1)?[12..]) }
    } else if sig == event_signatures::ANSWER_UPDATED {
        decode_answer_updated(log, oracle_to_asset)?
    } else {
        return None;
    };

    Some(ProtocolEvent { order, tx_hash: log.tx_hash, kind })
}

fn decode_supply(log: &RawLog) -> Option<EventKindData> {
    if log.topics.len() < 3 || log.data.len() < 64 {
        return None;
    }
    let reserve = Address::from_slice(&log.topics[1][12..]);
    let on_behalf_of = Address::from_slice(&log.topics[2][12..]);
    let user = Address::from_slice(&log.data[12..32]);
    let amount = U256::from_be_slice(&log.data[32..64]);
    Some(EventKindData::Supply { reserve, user, on_behalf_of, amount })
}

fn decode_withdraw(log: &RawLog) -> Option<EventKindData> {
    if log.topics.len() < 4 || log.data.len() < 32 {
        return None;
    }
    let reserve = Address::from_slice(&log.topics[1][12..]);
    let user = Address::from_slice(&log.topics[2][12..]);
    let to = Address::from_slice(&log.topics[3][12..]);
    let amount = U256::from_be_slice(&log.data[0..32]);
    Some(EventKindData::Withdraw { reserve, user, to, amount })
}

fn decode_borrow(log: &RawLog) -> Option<EventKindData> {
    if log.topics.len() < 3 || log.data.len() < 64 {
        return None;
    }
    let reserve = Address::from_slice(&log.topics[1][12..]);
    let on_behalf_of = Address::from_slice(&log.topics[2][12..]);
    let user = Address::from_slice(&log.data[12..32]);
    let amount = U256::from_be_slice(&log.data[32..64]);
    Some(EventKindData::Borrow { reserve, user, on_behalf_of, amount })
}

fn decode_repay(log: &RawLog) -> Option<EventKindData> {
    if log.topics.len() < 4 || log.data.len() < 32 {
        return None;
    }
    let reserve = Address::from_slice(&log.topics[1][12..]);
    let user = Address::from_slice(&log.topics[2][12..]);
    let repayer = Address::from_slice(&log.topics[3][12..]);
    let amount = U256::from_be_slice(&log.data[0..32]);
    Some(EventKindData::Repay { reserve, user, repayer, amount })
}

fn decode_liquidation(log: &RawLog) -> Option<EventKindData> {
    if log.topics.len() < 4 || log.data.len() < 96 {
        return None;
    }
    let collateral_asset = Address::from_slice(&log.topics[1][12..]);
    let debt_asset = Address::from_slice(&log.topics[2][12..]);
    let user = Address::from_slice(&log.topics[3][12..]);
    let debt_to_cover = U256::from_be_slice(&log.data[0..32]);
    let liquidated_collateral = U256::from_be_slice(&log.data[32..64]);
    let liquidator = Address::from_slice(&log.data[76..96]);
    Some(EventKindData::LiquidationCall {
        collateral_asset,
        debt_asset,
        user,
        debt_to_cover,
        liquidated_collateral,
        liquidator,
    })
}

fn decode_answer_updated(
    log: &RawLog,
    oracle_to_asset: &dashmap::DashMap<Address, (Address, OracleType)>,
) -> Option<EventKindData> {
    if log.topics.len() < 3 {
        return None;
    }
    let oracle = log.address;
    let (asset, oracle_type) = *oracle_to_asset.get(&oracle)?;
    let price_i256 = alloy::primitives::I256::from_be_bytes(log.topics[1].0);
    if price_i256.is_negative() {
        return None;
    }
    let price = price_i256.into_raw();
    let round_id = U256::from_be_slice(&log.topics[2].0);
    let updated_at = if log.data.len() >= 32 {
        U256::from_be_slice(&log.data[0..32]).to::<u64>()
    } else {
        0
    };
    Some(EventKindData::AnswerUpdated { oracle, asset, price, round_id, updated_at, oracle_type })
}

/// Seam dedup: suppresses logs already delivered by backfill when the live
/// stream catches up and starts re-covering the same tail blocks, per §4.1
/// "duplicates on the seam are suppressed by (txHash, logIndex)".
pub struct SeamDedup {
    seen: std::collections::HashSet<(B256, u64)>,
    capacity: usize,
    order: std::collections::VecDeque<(B256, u64)>,
}

impl SeamDedup {
    pub fn new(capacity: usize) -> Self {
        Self { seen: std::collections::HashSet::new(), capacity, order: std::collections::VecDeque::new() }
    }

    /// Returns `true` if this is the first time `(tx_hash, log_index)` has
    /// been observed (i.e. the caller should emit it).
    pub fn admit(&mut self, tx_hash: B256, log_index: u64) -> bool {
        let key = (tx_hash, log_index);
        if self.seen.contains(&key) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(key);
        self.order.push_back(key);
        true
    }
}

/// Merge a sorted backfill batch with a live event, filtering backfill
/// duplicates through `dedup` and preserving `(block, tx_index, log_index)`
/// order across the seam (§5 "Events flow in (block, txIndex, logIndex)
/// order").
pub fn admit_event(dedup: &mut SeamDedup, event: ProtocolEvent) -> Option<ProtocolEvent> {
    if dedup.admit(event.tx_hash, event.order.log_index) {
        Some(event)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_log(topics: Vec<B256>, data: Vec<u8>, block: u64, tx_index: u64, log_index: u64) -> RawLog {
        RawLog {
            address: Address::ZERO,
            topics,
            data,
            block_number: block,
            tx_index,
            log_index,
            tx_hash: B256::repeat_byte(0xab),
        }
    }

    fn addr_topic(a: Address) -> B256 {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(a.as_slice());
        B256::from(bytes)
    }

    #[test]
    fn decodes_supply_event_with_dedup_on_behalf_of() {
        let user = Address::repeat_byte(1);
        let on_behalf = Address::repeat_byte(1); // same as user -> dedup
        let reserve = Address::repeat_byte(2);
        let mut data = vec![0u8; 64];
        data[12..32].copy_from_slice(user.as_slice());
        data[32..64].copy_from_slice(&[0u8; 32 - 8]);
        data[56..64].copy_from_slice(&1000u64.to_be_bytes());

        let log = raw_log(
            vec![event_signatures::SUPPLY, addr_topic(reserve), addr_topic(on_behalf), B256::ZERO],
            data,
            10,
            1,
            2,
        );
        let oracle_map = dashmap::DashMap::new();
        let event = decode_event(&log, &oracle_map).expect("decodes");
        assert_eq!(event.kind(), EventKind::Supply);
        assert_eq!(event.order, EventOrderKey { block: 10, tx_index: 1, log_index: 2 });
        let users = event.affected_users();
        assert_eq!(users.len(), 1, "user == onBehalfOf should dedup to one entry");
        assert_eq!(users[0], user);
    }

    #[test]
    fn repay_event_produces_user_and_distinct_repayer() {
        let user = Address::repeat_byte(3);
        let repayer = Address::repeat_byte(4);
        let reserve = Address::repeat_byte(5);
        let mut data = vec![0u8; 32];
        data[24..32].copy_from_slice(&500u64.to_be_bytes());
        let log = raw_log(
            vec![event_signatures::REPAY, addr_topic(reserve), addr_topic(user), addr_topic(repayer)],
            data,
            11,
            0,
            0,
        );
        let event = decode_event(&log, &dashmap::DashMap::new()).expect("decodes");
        let users = event.affected_users();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0], user);
        assert_eq!(users[1], repayer);
    }

    #[test]
    fn withdraw_and_liquidation_produce_single_user() {
        let user = Address::repeat_byte(7);
        let reserve = Address::repeat_byte(8);
        let to = Address::repeat_byte(9);
        let mut data = vec![0u8; 32];
        data[24..32].copy_from_slice(&1u64.to_be_bytes());
        let log = raw_log(
            vec![event_signatures::WITHDRAW, addr_topic(reserve), addr_topic(user), addr_topic(to)],
            data,
            1,
            0,
            0,
        );
        let event = decode_event(&log, &dashmap::DashMap::new()).expect("decodes");
        assert_eq!(event.affected_users().as_slice(), &[user]);
    }

    #[test]
    fn reserve_data_updated_has_no_affected_users() {
        let reserve = Address::repeat_byte(6);
        let log = raw_log(
            vec![*aave_v3::aave_v3_signatures::RESERVE_DATA_UPDATED, addr_topic(reserve)],
            vec![0u8; 160],
            5,
            0,
            0,
        );
        let event = decode_event(&log, &dashmap::DashMap::new()).expect("decodes");
        assert!(event.affected_users().is_empty());
        assert_eq!(event.reserve(), Some(reserve));
    }

    #[test]
    fn unrecognized_signature_decodes_to_none() {
        let log = raw_log(vec![B256::repeat_byte(0xff)], vec![], 1, 0, 0);
        assert!(decode_event(&log, &dashmap::DashMap::new()).is_none());
    }

    #[test]
    fn seam_dedup_admits_once() {
        let mut dedup = SeamDedup::new(8);
        let tx = B256::repeat_byte(1);
        assert!(dedup.admit(tx, 0));
        assert!(!dedup.admit(tx, 0), "second admit of same (tx_hash, log_index) must be suppressed");
        assert!(dedup.admit(tx, 1), "different log_index in same tx is a different event");
    }

    #[test]
    fn seam_dedup_evicts_oldest_past_capacity() {
        let mut dedup = SeamDedup::new(2);
        let a = B256::repeat_byte(1);
        let b = B256::repeat_byte(2);
        let c = B256::repeat_byte(3);
        assert!(dedup.admit(a, 0));
        assert!(dedup.admit(b, 0));
        assert!(dedup.admit(c, 0)); // evicts `a`
        assert!(dedup.admit(a, 0), "a should be re-admittable after eviction");
    }

    #[test]
    fn event_order_key_sorts_by_block_then_tx_then_log() {
        let mut keys = vec![
            EventOrderKey { block: 2, tx_index: 0, log_index: 0 },
            EventOrderKey { block: 1, tx_index: 5, log_index: 0 },
            EventOrderKey { block: 1, tx_index: 0, log_index: 9 },
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                EventOrderKey { block: 1, tx_index: 0, log_index: 9 },
                EventOrderKey { block: 1, tx_index: 5, log_index: 0 },
                EventOrderKey { block: 2, tx_index: 0, log_index: 0 },
            ]
        );
    }
}

//! 交易对日志分组
//!
//! 同一笔交易里同一个交易对的日志按顺序是 `Transfer* Sync (Swap|Mint|Burn)?`，
//! 这里把每个 Sync 连同它前面的 LP Transfer 和后面的操作合并成一个 `ReservesChanged`。
//! 之后没有 Sync 的 LP Transfer 单独合并成 `LiquidityTransferred`。

use crate::types::{ChainEvent, LiquidityTransferred, ReserveChange, ReservesChanged};
use ethers::contract::EthLogDecode;
use ethers::core::abi::RawLog;
use ethers::types::{Address, Log, H256, U256};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::contracts::UniswapV2PairEvents;

#[derive(Debug, Clone, PartialEq)]
pub enum PairLogKind {
    Transfer { from: Address, to: Address, value: U256 },
    Sync { reserve0: U256, reserve1: U256 },
    Change(ReserveChange),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairLog {
    pub pool: Address,
    pub block_number: i64,
    pub log_index: i64,
    pub transaction_hash: H256,
    pub timestamp: i64,
    pub kind: PairLogKind,
}

/// 解码单条交易对日志，未知事件或缺少位置信息时返回 None
pub fn decode_pair_log(log: &Log, timestamp: i64) -> Option<PairLog> {
    let (Some(block_number), Some(log_index), Some(transaction_hash)) =
        (log.block_number, log.log_index, log.transaction_hash)
    else {
        warn!("⚠️ 跳过缺少区块位置信息的日志: 0x{:x}", log.address);
        return None;
    };

    let raw = RawLog {
        topics: log.topics.clone(),
        data: log.data.0.to_vec(),
    };
    let kind = match UniswapV2PairEvents::decode_log(&raw) {
        Ok(UniswapV2PairEvents::TransferFilter(e)) => PairLogKind::Transfer {
            from: e.from,
            to: e.to,
            value: e.value,
        },
        Ok(UniswapV2PairEvents::SyncFilter(e)) => PairLogKind::Sync {
            reserve0: U256::from(e.reserve_0),
            reserve1: U256::from(e.reserve_1),
        },
        Ok(UniswapV2PairEvents::SwapFilter(e)) => PairLogKind::Change(ReserveChange::Swap {
            sender: e.sender,
            to: e.to,
            amount0_in: e.amount_0_in,
            amount1_in: e.amount_1_in,
            amount0_out: e.amount_0_out,
            amount1_out: e.amount_1_out,
        }),
        Ok(UniswapV2PairEvents::MintFilter(e)) => PairLogKind::Change(ReserveChange::Mint {
            sender: e.sender,
            amount0: e.amount_0,
            amount1: e.amount_1,
        }),
        Ok(UniswapV2PairEvents::BurnFilter(e)) => PairLogKind::Change(ReserveChange::Burn {
            sender: e.sender,
            to: e.to,
            amount0: e.amount_0,
            amount1: e.amount_1,
        }),
        Err(e) => {
            debug!(
                "❓ 未知事件类型 - 交易对: 0x{:x}, 签名: 0x{}, 错误: {}",
                log.address,
                hex::encode(log.topics.first().map(|t| t.as_bytes()).unwrap_or_default()),
                e
            );
            return None;
        }
    };

    Some(PairLog {
        pool: log.address,
        block_number: block_number.as_u64() as i64,
        log_index: log_index.as_u64() as i64,
        transaction_hash,
        timestamp,
        kind,
    })
}

#[derive(Default)]
struct TxPoolState {
    lp_minted: U256,
    lp_burned: U256,
    providers: Vec<Address>,
    /// 尚未归入 Sync 的第一条 Transfer: (区块, 日志序号, 时间戳)
    first_transfer: Option<(i64, i64, i64)>,
    pending: Option<ReservesChanged>,
}

impl TxPoolState {
    fn flush(&mut self, out: &mut Vec<ChainEvent>) {
        if let Some(event) = self.pending.take() {
            out.push(ChainEvent::ReservesChanged(event));
        }
    }

    fn finish(mut self, tx: H256, pool: Address, out: &mut Vec<ChainEvent>) {
        self.flush(out);
        let Some((block_number, log_index, timestamp)) = self.first_transfer else {
            return;
        };
        debug!("📭 交易 0x{:x} 中交易对 0x{:x} 只有 LP 转账，没有储备变化", tx, pool);
        out.push(ChainEvent::LiquidityTransferred(LiquidityTransferred {
            pool,
            lp_minted: self.lp_minted,
            lp_burned: self.lp_burned,
            liquidity_providers: self.providers,
            block_number,
            timestamp,
            transaction_hash: tx,
            log_index,
        }));
    }
}

/// 把解码后的日志合并成储备变化和 LP 转账事件，结果按 (区块, 日志序号) 排序
pub fn group_pair_logs(mut logs: Vec<PairLog>) -> Vec<ChainEvent> {
    logs.sort_by_key(|log| (log.block_number, log.log_index));

    let mut states: BTreeMap<(H256, Address), TxPoolState> = BTreeMap::new();
    let mut out = Vec::new();

    for log in logs {
        let state = states.entry((log.transaction_hash, log.pool)).or_default();
        match log.kind {
            PairLogKind::Transfer { from, to, value } => {
                state.flush(&mut out);
                state
                    .first_transfer
                    .get_or_insert((log.block_number, log.log_index, log.timestamp));
                if from.is_zero() {
                    state.lp_minted = state.lp_minted.saturating_add(value);
                }
                if to.is_zero() {
                    state.lp_burned = state.lp_burned.saturating_add(value);
                }
                state.providers.push(from);
                state.providers.push(to);
            }
            PairLogKind::Sync { reserve0, reserve1 } => {
                state.flush(&mut out);
                state.first_transfer = None;
                state.pending = Some(ReservesChanged {
                    pool: log.pool,
                    reserve0,
                    reserve1,
                    change: ReserveChange::Sync,
                    lp_minted: std::mem::take(&mut state.lp_minted),
                    lp_burned: std::mem::take(&mut state.lp_burned),
                    liquidity_providers: std::mem::take(&mut state.providers),
                    block_number: log.block_number,
                    timestamp: log.timestamp,
                    transaction_hash: log.transaction_hash,
                    log_index: log.log_index,
                });
            }
            PairLogKind::Change(change) => match state.pending.as_mut() {
                Some(event) => {
                    event.change = change;
                    state.flush(&mut out);
                }
                None => warn!(
                    "⚠️ 交易对 0x{:x} 的 {} 日志前没有 Sync，已忽略 (区块 {})",
                    log.pool,
                    change.kind(),
                    log.block_number
                ),
            },
        }
    }

    for ((tx, pool), state) in states {
        state.finish(tx, pool, &mut out);
    }

    order_events(&mut out);
    out
}

/// 合并后的事件按链上顺序排列
pub fn order_events(events: &mut [ChainEvent]) {
    events.sort_by_key(|event| (event.block_number(), event.log_index()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PoolCreated;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn log(tx: u64, log_index: i64, pool: u64, kind: PairLogKind) -> PairLog {
        PairLog {
            pool: addr(pool),
            block_number: 10,
            log_index,
            transaction_hash: H256::from_low_u64_be(tx),
            timestamp: 1_000,
            kind,
        }
    }

    fn reserves_only(events: Vec<ChainEvent>) -> Vec<ReservesChanged> {
        events
            .into_iter()
            .filter_map(|event| match event {
                ChainEvent::ReservesChanged(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    fn transfer(from: Address, to: Address, value: u64) -> PairLogKind {
        PairLogKind::Transfer { from, to, value: U256::from(value) }
    }

    fn sync(r0: u64, r1: u64) -> PairLogKind {
        PairLogKind::Sync {
            reserve0: U256::from(r0),
            reserve1: U256::from(r1),
        }
    }

    #[test]
    fn test_mint_merges_lp_transfer_and_sync() {
        let user = addr(7);
        let logs = vec![
            log(1, 0, 50, PairLogKind::Transfer { from: Address::zero(), to: user, value: U256::from(900) }),
            log(1, 1, 50, sync(100, 200)),
            log(
                1,
                2,
                50,
                PairLogKind::Change(ReserveChange::Mint {
                    sender: addr(9),
                    amount0: U256::from(100),
                    amount1: U256::from(200),
                }),
            ),
        ];

        let events = reserves_only(group_pair_logs(logs));
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.change.kind(), "mint");
        assert_eq!(event.lp_minted, U256::from(900));
        assert_eq!(event.lp_burned, U256::zero());
        assert_eq!(event.liquidity_providers, vec![Address::zero(), user]);
        assert_eq!(event.reserve1, U256::from(200));
        assert_eq!(event.log_index, 1);
    }

    #[test]
    fn test_burn_counts_transfer_to_zero() {
        let user = addr(7);
        let pool = addr(50);
        let logs = vec![
            log(1, 3, 50, PairLogKind::Transfer { from: pool, to: Address::zero(), value: U256::from(40) }),
            log(1, 2, 50, PairLogKind::Transfer { from: user, to: pool, value: U256::from(40) }),
            log(1, 6, 50, sync(60, 120)),
            log(
                1,
                7,
                50,
                PairLogKind::Change(ReserveChange::Burn {
                    sender: addr(9),
                    to: user,
                    amount0: U256::from(40),
                    amount1: U256::from(80),
                }),
            ),
        ];

        let events = reserves_only(group_pair_logs(logs));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].lp_burned, U256::from(40));
        assert_eq!(events[0].lp_minted, U256::zero());
        assert_eq!(events[0].change.kind(), "burn");
    }

    #[test]
    fn test_two_swaps_in_one_transaction_stay_separate() {
        let swap = |amount: u64| {
            PairLogKind::Change(ReserveChange::Swap {
                sender: addr(9),
                to: addr(8),
                amount0_in: U256::from(amount),
                amount1_in: U256::zero(),
                amount0_out: U256::zero(),
                amount1_out: U256::from(amount),
            })
        };
        let logs = vec![
            log(1, 1, 50, sync(110, 190)),
            log(1, 2, 50, swap(10)),
            log(1, 5, 50, sync(120, 180)),
            log(1, 6, 50, swap(20)),
        ];

        let events = reserves_only(group_pair_logs(logs));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].reserve0, U256::from(110));
        assert_eq!(events[1].reserve0, U256::from(120));
        assert!(events.iter().all(|e| e.change.kind() == "swap"));
    }

    #[test]
    fn test_sync_without_operation_and_interleaved_pools() {
        let logs = vec![
            log(2, 4, 60, sync(1, 1)),
            log(1, 1, 50, sync(5, 5)),
            log(1, 2, 60, sync(2, 2)),
        ];

        let events = reserves_only(group_pair_logs(logs));
        let order: Vec<i64> = events.iter().map(|e| e.log_index).collect();
        assert_eq!(order, vec![1, 2, 4]);
        assert!(events.iter().all(|e| e.change == ReserveChange::Sync));
    }

    #[test]
    fn test_plain_lp_transfer_becomes_its_own_event() {
        let (alice, bob) = (addr(7), addr(8));
        let events = group_pair_logs(vec![log(3, 4, 50, transfer(alice, bob, 25))]);

        assert_eq!(events.len(), 1);
        let ChainEvent::LiquidityTransferred(event) = &events[0] else {
            panic!("expected an LP transfer event, got {:?}", events[0]);
        };
        assert_eq!(event.pool, addr(50));
        assert_eq!(event.liquidity_providers, vec![alice, bob]);
        assert_eq!(event.lp_minted, U256::zero());
        assert_eq!(event.lp_burned, U256::zero());
        assert_eq!(event.log_index, 4);
        assert_eq!(event.transaction_hash, H256::from_low_u64_be(3));
    }

    #[test]
    fn test_transfer_after_swap_is_not_folded_into_it() {
        let (alice, bob) = (addr(7), addr(8));
        let logs = vec![
            log(1, 1, 50, transfer(Address::zero(), alice, 10)),
            log(1, 2, 50, sync(5, 5)),
            log(1, 5, 50, transfer(alice, bob, 3)),
            log(1, 6, 50, transfer(bob, addr(9), 1)),
        ];

        let events = group_pair_logs(logs);
        assert_eq!(events.len(), 2);
        let ChainEvent::ReservesChanged(reserves) = &events[0] else {
            panic!("expected reserves first, got {:?}", events[0]);
        };
        assert_eq!(reserves.liquidity_providers, vec![Address::zero(), alice]);
        assert_eq!(reserves.lp_minted, U256::from(10));

        let ChainEvent::LiquidityTransferred(moved) = &events[1] else {
            panic!("expected an LP transfer event, got {:?}", events[1]);
        };
        assert_eq!(moved.log_index, 5);
        assert_eq!(moved.liquidity_providers, vec![alice, bob, bob, addr(9)]);
    }

    #[test]
    fn test_orphan_operation_is_dropped() {
        let logs = vec![log(
            1,
            1,
            50,
            PairLogKind::Change(ReserveChange::Mint {
                sender: addr(9),
                amount0: U256::one(),
                amount1: U256::one(),
            }),
        )];
        assert!(group_pair_logs(logs).is_empty());
    }

    #[test]
    fn test_order_events_by_block_then_log_index() {
        let created = |block_number: i64, log_index: i64| {
            ChainEvent::PoolCreated(PoolCreated {
                pool: addr(1),
                token0: addr(2),
                token1: addr(3),
                block_number,
                timestamp: 0,
                log_index,
            })
        };
        let mut events = vec![created(11, 0), created(10, 5), created(10, 2)];
        order_events(&mut events);
        let keys: Vec<(i64, i64)> = events.iter().map(|e| (e.block_number(), e.log_index())).collect();
        assert_eq!(keys, vec![(10, 2), (10, 5), (11, 0)]);
    }
}

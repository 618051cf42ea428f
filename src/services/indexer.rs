//! 单条链的索引状态
//!
//! 事件逐个交给 `Engine` 处理并立即应用到内存工作集，一批事件的全部写入合并后
//! 连同游标一次性持久化。持久化失败时从仓库重新加载工作集，游标保持不动。

use crate::database::Database;
use crate::engine::{ChainReader, ChangeSet, Engine, MemoryStore};
use crate::types::ChainEvent;
use crate::utils::{address_id, parse_address};
use anyhow::Result;
use async_trait::async_trait;
use ethers::types::Address;
use tracing::{debug, error, info, warn};

/// 工作集里每个 (pool, resolution) 保留的K线数量
pub const RETAINED_CANDLES_PER_SERIES: usize = 2;

#[async_trait]
pub trait StateRepository: Send + Sync {
    async fn load_snapshot(&self, chain_id: i64) -> Result<MemoryStore>;

    async fn load_cursor(&self, chain_id: i64) -> Result<Option<u64>>;

    /// 变更和游标必须原子写入
    async fn persist(&self, chain_id: i64, changes: &ChangeSet, last_block: u64) -> Result<()>;
}

#[async_trait]
impl StateRepository for Database {
    async fn load_snapshot(&self, chain_id: i64) -> Result<MemoryStore> {
        Database::load_snapshot(self, chain_id).await
    }

    async fn load_cursor(&self, chain_id: i64) -> Result<Option<u64>> {
        Database::load_cursor(self, chain_id).await
    }

    async fn persist(&self, chain_id: i64, changes: &ChangeSet, last_block: u64) -> Result<()> {
        self.persist_changes(chain_id, changes, last_block).await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub records: usize,
}

pub struct Indexer<C: ChainReader> {
    chain_id: i64,
    engine: Engine<C>,
    store: MemoryStore,
}

impl<C: ChainReader> Indexer<C> {
    pub fn new(chain_id: i64, engine: Engine<C>) -> Self {
        Self {
            chain_id,
            engine,
            store: MemoryStore::new(),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn engine(&self) -> &Engine<C> {
        &self.engine
    }

    pub async fn hydrate<R: StateRepository + ?Sized>(&mut self, repository: &R) -> Result<()> {
        let mut store = repository.load_snapshot(self.chain_id).await?;
        store.retain_latest_candles(RETAINED_CANDLES_PER_SERIES);
        store.retain_latest_days();
        self.store = store;
        Ok(())
    }

    /// 工作集中已知交易对的地址
    pub fn known_pools(&self) -> Vec<Address> {
        self.store.pool_ids().filter_map(|id| parse_address(id)).collect()
    }

    /// 处理一批按链上顺序排列的事件，并把游标推进到 `last_block`
    pub async fn process_events<R: StateRepository + ?Sized>(
        &mut self,
        repository: &R,
        events: &[ChainEvent],
        last_block: u64,
    ) -> Result<BatchSummary> {
        let mut batch = ChangeSet::default();
        let mut summary = BatchSummary::default();

        for event in events {
            if !matches!(event, ChainEvent::PoolCreated(_)) {
                let pool_id = address_id(&event.pool());
                if !self.store.contains_pool(&pool_id) {
                    debug!("📭 链 {}: 交易对 {} 未被索引，跳过", self.chain_id, pool_id);
                    summary.skipped += 1;
                    continue;
                }
            }

            match self.engine.handle(&self.store, event) {
                Ok(changes) => {
                    self.store.apply(changes.clone());
                    batch.merge(changes);
                    summary.processed += 1;
                }
                Err(e) => {
                    warn!(
                        "⚠️ 链 {}: 区块 {} 的事件处理失败，已跳过: {}",
                        self.chain_id,
                        event.block_number(),
                        e
                    );
                    summary.failed += 1;
                }
            }
        }

        summary.records = batch.record_count();
        if let Err(e) = repository.persist(self.chain_id, &batch, last_block).await {
            error!("❌ 链 {}: 持久化失败，重新加载工作集: {}", self.chain_id, e);
            self.hydrate(repository).await?;
            return Err(e);
        }

        self.store.retain_latest_candles(RETAINED_CANDLES_PER_SERIES);
        self.store.retain_latest_days();

        if summary.processed > 0 {
            info!(
                "📊 链 {}: 处理到区块 {} - 成功: {}, 跳过: {}, 失败: {}, 写入记录: {}",
                self.chain_id, last_block, summary.processed, summary.skipped, summary.failed, summary.records
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PricingConfig, StablecoinPool};
    use crate::engine::chain::testing::StaticChain;
    use crate::engine::EntityStore;
    use crate::types::{CandleResolution, LiquidityTransferred, PoolCreated, ReserveChange, ReservesChanged};
    use ethers::types::{H256, U256};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryRepository {
        state: Mutex<MemoryStore>,
        cursor: Mutex<Option<u64>>,
        persist_calls: Mutex<usize>,
        fail_persist: AtomicBool,
    }

    #[async_trait]
    impl StateRepository for MemoryRepository {
        async fn load_snapshot(&self, _chain_id: i64) -> Result<MemoryStore> {
            Ok(self.state.lock().unwrap().clone())
        }

        async fn load_cursor(&self, _chain_id: i64) -> Result<Option<u64>> {
            Ok(*self.cursor.lock().unwrap())
        }

        async fn persist(&self, _chain_id: i64, changes: &ChangeSet, last_block: u64) -> Result<()> {
            *self.persist_calls.lock().unwrap() += 1;
            if self.fail_persist.load(Ordering::SeqCst) {
                return Err(anyhow::anyhow!("connection reset"));
            }
            self.state.lock().unwrap().apply(changes.clone());
            *self.cursor.lock().unwrap() = Some(last_block);
            Ok(())
        }
    }

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn indexer() -> Indexer<StaticChain> {
        let mut config = PricingConfig::ethereum();
        config.wrapped_native = address_id(&addr(1));
        config.whitelist = vec![address_id(&addr(1)), address_id(&addr(2))];
        config.stablecoin_pools = vec![StablecoinPool {
            address: address_id(&addr(50)),
            native_is_token0: false,
        }];
        config.seed_pools = vec![];
        config.token_definitions = vec![];
        config.skip_blocks = vec![];

        let chain = StaticChain::default()
            .with_token(addr(1), "WETH", 18)
            .with_token(addr(2), "USDC", 6)
            .with_pair(addr(2), addr(1), addr(50));
        Indexer::new(1, Engine::new(config, chain))
    }

    fn created(pool: u64) -> ChainEvent {
        ChainEvent::PoolCreated(PoolCreated {
            pool: addr(pool),
            token0: addr(2),
            token1: addr(1),
            block_number: 10,
            timestamp: 1_000,
            log_index: 0,
        })
    }

    fn synced(pool: u64, timestamp: i64, log_index: i64) -> ChainEvent {
        ChainEvent::ReservesChanged(ReservesChanged {
            pool: addr(pool),
            reserve0: U256::from(2_000_000u64) * U256::exp10(6),
            reserve1: U256::from(1_000u64) * U256::exp10(18),
            change: ReserveChange::Sync,
            lp_minted: U256::zero(),
            lp_burned: U256::zero(),
            liquidity_providers: vec![],
            block_number: 11,
            timestamp,
            transaction_hash: H256::zero(),
            log_index,
        })
    }

    #[test]
    fn test_batch_is_persisted_once_with_cursor() {
        tokio_test::block_on(async {
            let repo = MemoryRepository::default();
            let mut indexer = indexer();

            let events = vec![created(50), synced(50, 1_000, 1), synced(50, 1_010, 2)];
            let summary = indexer.process_events(&repo, &events, 20).await.unwrap();

            assert_eq!(summary.processed, 3);
            assert_eq!(*repo.persist_calls.lock().unwrap(), 1);
            assert_eq!(repo.load_cursor(1).await.unwrap(), Some(20));

            let persisted = repo.load_snapshot(1).await.unwrap();
            let bundle = persisted.load_bundle().unwrap();
            assert_eq!(bundle.eth_price, Decimal::from(2000));
            assert!(persisted.load_pool(&address_id(&addr(50))).is_some());
        });
    }

    #[test]
    fn test_unknown_pool_is_skipped_and_cursor_advances() {
        tokio_test::block_on(async {
            let repo = MemoryRepository::default();
            let mut indexer = indexer();

            let summary = indexer.process_events(&repo, &[synced(99, 1_000, 1)], 30).await.unwrap();
            assert_eq!(summary.skipped, 1);
            assert_eq!(summary.processed, 0);
            assert_eq!(repo.load_cursor(1).await.unwrap(), Some(30));
        });
    }

    #[test]
    fn test_persist_failure_rehydrates_and_keeps_cursor() {
        tokio_test::block_on(async {
            let repo = MemoryRepository::default();
            let mut indexer = indexer();
            indexer.process_events(&repo, &[created(50)], 10).await.unwrap();

            repo.fail_persist.store(true, Ordering::SeqCst);
            let result = indexer.process_events(&repo, &[synced(50, 1_000, 1)], 11).await;
            assert!(result.is_err());

            // 工作集回到最后一次成功持久化的状态
            let pool = indexer.store().load_pool(&address_id(&addr(50))).unwrap();
            assert_eq!(pool.reserve0, Decimal::ZERO);
            assert_eq!(repo.load_cursor(1).await.unwrap(), Some(10));

            repo.fail_persist.store(false, Ordering::SeqCst);
            indexer.process_events(&repo, &[synced(50, 1_000, 1)], 11).await.unwrap();
            let pool = indexer.store().load_pool(&address_id(&addr(50))).unwrap();
            assert_eq!(pool.reserve0, Decimal::from(2_000_000));
        });
    }

    #[test]
    fn test_lp_transfer_creates_position_for_indexed_pool_only() {
        tokio_test::block_on(async {
            let repo = MemoryRepository::default();
            let mut indexer = indexer();
            let holder = addr(700);
            let transfer = |pool: u64| {
                ChainEvent::LiquidityTransferred(LiquidityTransferred {
                    pool: addr(pool),
                    lp_minted: U256::zero(),
                    lp_burned: U256::zero(),
                    liquidity_providers: vec![addr(701), holder],
                    block_number: 11,
                    timestamp: 1_000,
                    transaction_hash: H256::zero(),
                    log_index: 2,
                })
            };

            let events = vec![created(50), transfer(50), transfer(99)];
            let summary = indexer.process_events(&repo, &events, 12).await.unwrap();
            assert_eq!(summary.processed, 2);
            assert_eq!(summary.skipped, 1);

            let persisted = repo.load_snapshot(1).await.unwrap();
            let pool = persisted.load_pool(&address_id(&addr(50))).unwrap();
            assert_eq!(pool.liquidity_provider_count, 2);
            assert!(persisted
                .load_liquidity_position(&address_id(&addr(50)), &address_id(&holder))
                .is_some());
        });
    }

    #[test]
    fn test_working_set_keeps_latest_candles() {
        tokio_test::block_on(async {
            let repo = MemoryRepository::default();
            let mut indexer = indexer();

            let minute = CandleResolution::OneMinute.seconds();
            let events = vec![
                created(50),
                synced(50, 1_000 * minute, 1),
                synced(50, 1_001 * minute, 2),
                synced(50, 1_002 * minute, 3),
            ];
            indexer.process_events(&repo, &events, 12).await.unwrap();

            let pool_id = address_id(&addr(50));
            let store = indexer.store();
            assert!(store.load_candle(&pool_id, CandleResolution::OneMinute, 1_000).is_none());
            assert!(store.load_candle(&pool_id, CandleResolution::OneMinute, 1_002).is_some());
            assert_eq!(store.candle_count(), 2 + 4);
            assert_eq!(indexer.known_pools(), vec![addr(50)]);
        });
    }
}

use super::base_listener::BaseEventListener;
use super::contracts::{PairCreatedFilter, PAIR_CREATED_SIGNATURE, PAIR_EVENT_SIGNATURES};
use super::log_batcher::{decode_pair_log, group_pair_logs, order_events, PairLog};
use crate::types::{ChainEvent, PoolCreated};
use anyhow::Result;
use ethers::{
    contract::EthLogDecode,
    core::abi::RawLog,
    providers::{Http, Middleware, Provider},
    types::{Address, BlockNumber, Filter, Log},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 单次 eth_getLogs 请求携带的交易对地址上限
pub const PAIR_ADDRESS_CHUNK: usize = 100;

pub struct ChainEventListener {
    base: BaseEventListener,
    factory_address: Address,
}

impl ChainEventListener {
    pub fn new(
        provider: Arc<Provider<Http>>,
        chain_id: u64,
        factory_address: Address,
        poll_interval: u64,
        start_block: u64,
        block_batch_size: u64,
    ) -> Self {
        Self {
            base: BaseEventListener::new(provider, chain_id, poll_interval, start_block, block_batch_size),
            factory_address,
        }
    }

    pub fn base(&self) -> &BaseEventListener {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut BaseEventListener {
        &mut self.base
    }

    /// 读取区块范围内的工厂和交易对日志，按链上顺序返回
    ///
    /// `known_pools` 之外，本范围内新创建的交易对也会一并查询。
    pub async fn fetch_events(
        &mut self,
        from_block: u64,
        to_block: u64,
        known_pools: &[Address],
    ) -> Result<Vec<ChainEvent>> {
        let created = self.fetch_pool_created(from_block, to_block).await?;

        let mut pools: Vec<Address> = known_pools.to_vec();
        pools.extend(created.iter().map(|event| event.pool));
        pools.sort();
        pools.dedup();

        let pair_logs = self.fetch_pair_logs(&pools, from_block, to_block).await?;
        let pair_events = group_pair_logs(pair_logs);

        if !created.is_empty() || !pair_events.is_empty() {
            info!(
                "🏭 链 {}: 区块 {}-{} 发现 {} 个新交易对, {} 个交易对事件",
                self.base.chain_id,
                from_block,
                to_block,
                created.len(),
                pair_events.len()
            );
        }

        let mut events: Vec<ChainEvent> = created
            .into_iter()
            .map(ChainEvent::PoolCreated)
            .chain(pair_events)
            .collect();
        order_events(&mut events);
        Ok(events)
    }

    async fn fetch_pool_created(&mut self, from_block: u64, to_block: u64) -> Result<Vec<PoolCreated>> {
        let filter = Filter::new()
            .address(self.factory_address)
            .from_block(BlockNumber::Number(from_block.into()))
            .to_block(BlockNumber::Number(to_block.into()))
            .event(PAIR_CREATED_SIGNATURE);

        let logs = self.base.provider.get_logs(&filter).await?;
        debug!(
            "🔍 链 {} (工厂): 区块 {}-{} 获取到 {} 个工厂事件",
            self.base.chain_id,
            from_block,
            to_block,
            logs.len()
        );

        let mut created = Vec::with_capacity(logs.len());
        for log in logs {
            if let Some(event) = self.decode_pool_created(&log).await? {
                created.push(event);
            }
        }
        Ok(created)
    }

    async fn decode_pool_created(&mut self, log: &Log) -> Result<Option<PoolCreated>> {
        let (Some(block_number), Some(log_index)) = (log.block_number, log.log_index) else {
            warn!("⚠️ 链 {} (工厂): 跳过缺少区块位置信息的日志", self.base.chain_id);
            return Ok(None);
        };

        let event = match PairCreatedFilter::decode_log(&RawLog {
            topics: log.topics.clone(),
            data: log.data.0.to_vec(),
        }) {
            Ok(event) => event,
            Err(e) => {
                warn!("⚠️ 链 {} (工厂): PairCreated 解析失败: {}", self.base.chain_id, e);
                return Ok(None);
            }
        };

        let timestamp = self.base.block_timestamp(block_number.as_u64()).await?;
        Ok(Some(PoolCreated {
            pool: event.pair,
            token0: event.token_0,
            token1: event.token_1,
            block_number: block_number.as_u64() as i64,
            timestamp,
            log_index: log_index.as_u64() as i64,
        }))
    }

    async fn fetch_pair_logs(&mut self, pools: &[Address], from_block: u64, to_block: u64) -> Result<Vec<PairLog>> {
        let mut decoded = Vec::new();

        for chunk in pools.chunks(PAIR_ADDRESS_CHUNK) {
            let filter = Filter::new()
                .address(chunk.to_vec())
                .from_block(BlockNumber::Number(from_block.into()))
                .to_block(BlockNumber::Number(to_block.into()))
                .events(PAIR_EVENT_SIGNATURES);

            let logs = self.base.provider.get_logs(&filter).await?;
            for log in logs {
                let Some(block_number) = log.block_number else {
                    continue;
                };
                let timestamp = self.base.block_timestamp(block_number.as_u64()).await?;
                if let Some(pair_log) = decode_pair_log(&log, timestamp) {
                    decoded.push(pair_log);
                }
            }
        }

        debug!(
            "💱 链 {} (交换): {} 个交易对在区块 {}-{} 解码出 {} 条日志",
            self.base.chain_id,
            pools.len(),
            from_block,
            to_block,
            decoded.len()
        );
        Ok(decoded)
    }
}
